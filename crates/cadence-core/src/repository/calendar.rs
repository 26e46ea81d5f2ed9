use crate::calendar::{reanchor, CalendarAggregator, DayBucket};
use crate::date::{CalendarDate, PeriodKey};
use crate::error::CoreError;
use crate::models::{InstanceRef, MoveResult, VirtualInstance};
use crate::natural_key::NaturalKey;
use crate::repository::records::write_record_date;
use crate::repository::templates::write_template;
use crate::repository::{RecordRepository, SqliteRepository, TemplateRepository};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

#[async_trait]
impl super::CalendarRepository for SqliteRepository {
    #[instrument(skip(self, materialized_periods), fields(%start, %end))]
    async fn calendar_window(
        &self,
        start: CalendarDate,
        end: CalendarDate,
        materialized_periods: &[PeriodKey],
    ) -> Result<Vec<DayBucket>, CoreError> {
        if start > end {
            return Err(CoreError::InvalidInput(format!(
                "Window start {} is after window end {}",
                start, end
            )));
        }

        let records = self.find_records_in_window(start, end).await?;
        let templates = self.find_active_templates().await?;
        debug!(records = records.len(), templates = templates.len(), "building calendar window");

        let aggregator = CalendarAggregator::new(self.materialization_manager().projector());
        Ok(aggregator.for_window(start, end, &records, &templates, materialized_periods))
    }

    async fn preview_template(
        &self,
        id: uuid::Uuid,
        start: CalendarDate,
        end: CalendarDate,
    ) -> Result<Vec<VirtualInstance>, CoreError> {
        let template = self.require_template(id).await?;
        Ok(self.materialization_manager().projector().project(&template, start, end))
    }

    /// Moves a concrete record in place, or re-anchors the series behind a
    /// projected instance.
    #[instrument(skip(self), fields(instance = %instance, %new_date))]
    async fn move_instance(&self, instance: InstanceRef, new_date: CalendarDate) -> Result<MoveResult, CoreError> {
        match instance {
            InstanceRef::Concrete { id } => {
                let record = self.require_record(id).await?;
                write_record_date(self.pool(), id, new_date)
                    .await
                    .map_err(|e| match e {
                        CoreError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                            CoreError::DuplicateRecord(
                                NaturalKey::from_record(&record).to_string(),
                                new_date.period_key().to_string(),
                            )
                        }
                        other => other,
                    })?;
                info!(record_id = %id, from = %record.date, to = %new_date, "record moved");
                Ok(MoveResult::Record(self.require_record(id).await?))
            }
            InstanceRef::Virtual { template_id, sequence_index } => {
                let template = self.require_template(template_id).await?;
                let (mut updated, shifted_by_days) = reanchor(&template, sequence_index, new_date)
                    .ok_or_else(|| {
                        CoreError::InvalidInput(format!(
                            "Template {} has no occurrence {} to move",
                            template_id, sequence_index
                        ))
                    })?;
                updated.updated_at = Utc::now();
                write_template(self.pool(), &updated).await?;
                info!(%template_id, shifted_by_days, "series re-anchored");
                Ok(MoveResult::Reanchored { template: updated, shifted_by_days })
            }
        }
    }
}
