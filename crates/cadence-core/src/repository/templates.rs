use crate::error::CoreError;
use crate::models::{NewTemplateData, RecurrenceTemplate, UpdateTemplateData};
use crate::repository::{hex_prefix_pattern, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

#[async_trait]
impl super::TemplateRepository for SqliteRepository {
    #[instrument(skip(self, data), fields(description = %data.description))]
    async fn add_template(&self, data: NewTemplateData) -> Result<RecurrenceTemplate, CoreError> {
        validate_new_template(&data)?;

        let template = RecurrenceTemplate {
            id: Uuid::now_v7(),
            kind: data.kind,
            description: data.description.trim().to_string(),
            counterparty: data.counterparty,
            category: data.category,
            payment_method: data.payment_method,
            amount_cents: data.amount_cents,
            anchor_date: Some(data.anchor_date),
            interval_unit: data.interval_unit,
            interval_count: data.interval_count,
            day_of_month: data.day_of_month,
            max_occurrences: data.max_occurrences,
            completed_occurrences: 0,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO recurrence_templates (id, kind, description, counterparty, category, payment_method, amount_cents, anchor_date, interval_unit, interval_count, day_of_month, max_occurrences, completed_occurrences, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"#
        )
        .bind(template.id)
        .bind(template.kind)
        .bind(&template.description)
        .bind(&template.counterparty)
        .bind(&template.category)
        .bind(&template.payment_method)
        .bind(template.amount_cents)
        .bind(template.anchor_date)
        .bind(template.interval_unit)
        .bind(template.interval_count)
        .bind(template.day_of_month)
        .bind(template.max_occurrences)
        .bind(template.completed_occurrences)
        .bind(template.active)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(self.pool())
        .await?;

        info!(template_id = %template.id, "template created");
        Ok(template)
    }

    async fn find_template_by_id(&self, id: Uuid) -> Result<Option<RecurrenceTemplate>, CoreError> {
        let template = sqlx::query_as("SELECT * FROM recurrence_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(template)
    }

    async fn find_templates_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<RecurrenceTemplate>, CoreError> {
        let templates = sqlx::query_as("SELECT * FROM recurrence_templates WHERE hex(id) LIKE $1")
            .bind(hex_prefix_pattern(short_id))
            .fetch_all(self.pool())
            .await?;
        Ok(templates)
    }

    async fn find_templates(&self, include_inactive: bool) -> Result<Vec<RecurrenceTemplate>, CoreError> {
        let templates = sqlx::query_as(
            "SELECT * FROM recurrence_templates WHERE active = 1 OR $1 ORDER BY created_at"
        )
        .bind(include_inactive)
        .fetch_all(self.pool())
        .await?;
        Ok(templates)
    }

    async fn find_active_templates(&self) -> Result<Vec<RecurrenceTemplate>, CoreError> {
        self.find_templates(false).await
    }

    async fn update_template(&self, id: Uuid, data: UpdateTemplateData) -> Result<RecurrenceTemplate, CoreError> {
        let mut template = self.require_template(id).await?;

        if let Some(description) = data.description {
            if description.trim().is_empty() {
                return Err(CoreError::InvalidInput("Description cannot be empty".to_string()));
            }
            template.description = description.trim().to_string();
        }
        if let Some(counterparty) = data.counterparty {
            template.counterparty = counterparty;
        }
        if let Some(category) = data.category {
            template.category = category;
        }
        if let Some(payment_method) = data.payment_method {
            template.payment_method = payment_method;
        }
        if let Some(amount_cents) = data.amount_cents {
            template.amount_cents = amount_cents;
        }
        if let Some(anchor_date) = data.anchor_date {
            template.anchor_date = Some(anchor_date);
        }
        if let Some(day_of_month) = data.day_of_month {
            validate_day_of_month(day_of_month)?;
            template.day_of_month = day_of_month;
        }
        if let Some(max_occurrences) = data.max_occurrences {
            template.max_occurrences = max_occurrences;
        }
        if let Some(active) = data.active {
            template.active = active;
        }
        template.updated_at = Utc::now();

        write_template(self.pool(), &template).await?;
        Ok(template)
    }

    async fn deactivate_template(&self, id: Uuid) -> Result<RecurrenceTemplate, CoreError> {
        let template = self
            .update_template(id, UpdateTemplateData { active: Some(false), ..Default::default() })
            .await?;
        info!(template_id = %id, "template deactivated");
        Ok(template)
    }

    /// Counts one occurrence against a bounded template's quota, deactivating
    /// it once the quota is used up.
    async fn consume_occurrence(&self, id: Uuid) -> Result<RecurrenceTemplate, CoreError> {
        let mut template = self.require_template(id).await?;
        if !template.active {
            return Err(CoreError::InvalidInput(format!("Template {} is not active", id)));
        }

        template.completed_occurrences = template.completed_occurrences.saturating_add(1);
        if template.is_exhausted() {
            template.active = false;
            info!(template_id = %id, "template reached its occurrence limit");
        }
        template.updated_at = Utc::now();

        write_template(self.pool(), &template).await?;
        Ok(template)
    }
}

impl SqliteRepository {
    pub(crate) async fn require_template(&self, id: Uuid) -> Result<RecurrenceTemplate, CoreError> {
        use super::TemplateRepository;
        self.find_template_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Template with id {} not found", id)))
    }
}

/// Writes every mutable column of `template` back to its row.
pub(crate) async fn write_template<'e, E>(executor: E, template: &RecurrenceTemplate) -> Result<(), CoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"UPDATE recurrence_templates SET
            description = $1, counterparty = $2, category = $3, payment_method = $4, amount_cents = $5,
            anchor_date = $6, day_of_month = $7, max_occurrences = $8, completed_occurrences = $9,
            active = $10, updated_at = $11
        WHERE id = $12"#
    )
    .bind(&template.description)
    .bind(&template.counterparty)
    .bind(&template.category)
    .bind(&template.payment_method)
    .bind(template.amount_cents)
    .bind(template.anchor_date)
    .bind(template.day_of_month)
    .bind(template.max_occurrences)
    .bind(template.completed_occurrences)
    .bind(template.active)
    .bind(template.updated_at)
    .bind(template.id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound(format!("Template with id {} not found", template.id)));
    }
    Ok(())
}

fn validate_new_template(data: &NewTemplateData) -> Result<(), CoreError> {
    if data.description.trim().is_empty() {
        return Err(CoreError::InvalidInput("Description cannot be empty".to_string()));
    }
    if data.interval_count == 0 {
        return Err(CoreError::InvalidInput("Interval must be at least 1".to_string()));
    }
    if data.max_occurrences == Some(0) {
        return Err(CoreError::InvalidInput("Occurrence limit must be at least 1".to_string()));
    }
    validate_day_of_month(data.day_of_month)
}

fn validate_day_of_month(day: Option<u32>) -> Result<(), CoreError> {
    match day {
        Some(d) if !(1..=31).contains(&d) => Err(CoreError::InvalidInput(format!(
            "Day of month must be between 1 and 31, got {}",
            d
        ))),
        _ => Ok(()),
    }
}
