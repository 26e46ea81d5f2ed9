use crate::date::{CalendarDate, PeriodKey};
use crate::error::CoreError;
use crate::models::{ConcreteRecord, NewRecordData};
use crate::natural_key::NaturalKey;
use crate::repository::{hex_prefix_pattern, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

#[async_trait]
impl super::RecordRepository for SqliteRepository {
    async fn add_record(&self, data: NewRecordData) -> Result<ConcreteRecord, CoreError> {
        if data.description.trim().is_empty() {
            return Err(CoreError::InvalidInput("Description cannot be empty".to_string()));
        }

        let key = NaturalKey::new(
            &data.description,
            data.counterparty.as_deref(),
            data.category.as_deref(),
            data.payment_method.as_deref(),
        );
        let now = Utc::now();
        let record = ConcreteRecord {
            id: Uuid::now_v7(),
            template_id: data.template_id,
            kind: data.kind,
            date: data.date,
            period_key: data.date.period_key(),
            description: data.description.trim().to_string(),
            counterparty: data.counterparty,
            category: data.category,
            payment_method: data.payment_method,
            amount_cents: data.amount_cents,
            natural_key: key.canonical(),
            recurring: data.recurring,
            settled: data.settled,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO records (id, template_id, kind, date, period_key, description, counterparty, category, payment_method, amount_cents, natural_key, recurring, settled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#
        )
        .bind(record.id)
        .bind(record.template_id)
        .bind(record.kind)
        .bind(record.date)
        .bind(record.period_key.to_string())
        .bind(&record.description)
        .bind(&record.counterparty)
        .bind(&record.category)
        .bind(&record.payment_method)
        .bind(record.amount_cents)
        .bind(&record.natural_key)
        .bind(record.recurring)
        .bind(record.settled)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CoreError::DuplicateRecord(key.to_string(), record.period_key.to_string())
            }
            other => CoreError::Database(other),
        })?;

        Ok(record)
    }

    async fn find_record_by_id(&self, id: Uuid) -> Result<Option<ConcreteRecord>, CoreError> {
        let record = sqlx::query_as("SELECT * FROM records WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(record)
    }

    async fn find_records_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<ConcreteRecord>, CoreError> {
        let records = sqlx::query_as("SELECT * FROM records WHERE hex(id) LIKE $1")
            .bind(hex_prefix_pattern(short_id))
            .fetch_all(self.pool())
            .await?;
        Ok(records)
    }

    async fn find_records_in_window(&self, start: CalendarDate, end: CalendarDate) -> Result<Vec<ConcreteRecord>, CoreError> {
        let records = sqlx::query_as(
            r#"SELECT * FROM records
            WHERE date BETWEEN $1 AND $2
            ORDER BY date, created_at"#
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        Ok(records)
    }

    async fn find_records_for_period(&self, period: PeriodKey) -> Result<Vec<ConcreteRecord>, CoreError> {
        let records = sqlx::query_as("SELECT * FROM records WHERE period_key = $1 ORDER BY date, created_at")
            .bind(period.to_string())
            .fetch_all(self.pool())
            .await?;
        Ok(records)
    }

    async fn settle_record(&self, id: Uuid) -> Result<ConcreteRecord, CoreError> {
        let result = sqlx::query("UPDATE records SET settled = 1, updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Record with id {} not found", id)));
        }
        self.require_record(id).await
    }
}

impl SqliteRepository {
    pub(crate) async fn require_record(&self, id: Uuid) -> Result<ConcreteRecord, CoreError> {
        use super::RecordRepository;
        self.find_record_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Record with id {} not found", id)))
    }
}

/// Moves a record to a new date, keeping its period key in step.
pub(crate) async fn write_record_date<'e, E>(executor: E, id: Uuid, date: CalendarDate) -> Result<(), CoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE records SET date = $1, period_key = $2, updated_at = $3 WHERE id = $4")
        .bind(date)
        .bind(date.period_key().to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound(format!("Record with id {} not found", id)));
    }
    Ok(())
}
