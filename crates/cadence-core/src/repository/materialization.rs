use crate::date::PeriodKey;
use crate::error::CoreError;
use crate::models::{ConcreteRecord, RecurrenceTemplate};
use crate::natural_key::NaturalKey;
use crate::recurrence::MaterializationOutcome;
use crate::repository::{RecordRepository, SqliteRepository, TemplateRepository};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[async_trait]
impl super::MaterializationRepository for SqliteRepository {
    /// Creates at most one record per template for `period`.
    ///
    /// Existing records for the period are read before anything is inserted.
    /// Inserts go out in batches; a failing batch aborts the run with an error
    /// and leaves earlier batches committed. Rows dropped by the storage-level
    /// uniqueness rule (another writer got there first) are reported as skipped.
    #[instrument(skip(self, templates), fields(%period, templates = templates.len()))]
    async fn materialize(&self, templates: &[RecurrenceTemplate], period: PeriodKey) -> Result<MaterializationOutcome, CoreError> {
        let existing = self.find_records_for_period(period).await?;
        let manager = self.materialization_manager();
        let plan = manager.plan(templates, period, &existing);

        let mut created = Vec::with_capacity(plan.to_create.len());
        let mut skipped = plan.skipped;
        let batch_size = manager.config().max_batch_size.max(1);

        for batch in plan.to_create.chunks(batch_size) {
            let inserted = match insert_batch(self, batch).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(error = %e, created = created.len(), "materialization batch failed");
                    return Err(e);
                }
            };
            for record in batch {
                if inserted.contains(&record.id) {
                    created.push(record.clone());
                } else {
                    warn!(key = %NaturalKey::from_record(record), "record was inserted concurrently, skipping");
                    skipped.push(NaturalKey::from_record(record));
                }
            }
        }

        info!(created = created.len(), skipped = skipped.len(), "materialization finished");
        Ok(MaterializationOutcome { period, created, skipped })
    }

    async fn materialize_active(&self, period: PeriodKey) -> Result<MaterializationOutcome, CoreError> {
        let templates = self.find_active_templates().await?;
        self.materialize(&templates, period).await
    }
}

/// Inserts one batch and returns the ids the store accepted.
async fn insert_batch(repo: &SqliteRepository, batch: &[ConcreteRecord]) -> Result<HashSet<Uuid>, CoreError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT INTO records (id, template_id, kind, date, period_key, description, counterparty, category, payment_method, amount_cents, natural_key, recurring, settled, created_at, updated_at) ",
    );
    qb.push_values(batch, |mut row, record| {
        row.push_bind(record.id)
            .push_bind(record.template_id)
            .push_bind(record.kind)
            .push_bind(record.date)
            .push_bind(record.period_key.to_string())
            .push_bind(record.description.clone())
            .push_bind(record.counterparty.clone())
            .push_bind(record.category.clone())
            .push_bind(record.payment_method.clone())
            .push_bind(record.amount_cents)
            .push_bind(record.natural_key.clone())
            .push_bind(record.recurring)
            .push_bind(record.settled)
            .push_bind(record.created_at)
            .push_bind(record.updated_at);
    });
    qb.push(" ON CONFLICT DO NOTHING RETURNING id");

    let ids: Vec<Uuid> = qb.build_query_scalar().fetch_all(repo.pool()).await?;
    Ok(ids.into_iter().collect())
}
