use crate::calendar::DayBucket;
use crate::date::{CalendarDate, PeriodKey};
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    ConcreteRecord, InstanceRef, MoveResult, NewRecordData, NewTemplateData, RecurrenceTemplate,
    UpdateTemplateData, VirtualInstance,
};
use crate::recurrence::{MaterializationManager, MaterializationOutcome};
use async_trait::async_trait;
use uuid::Uuid;

// Re-export domain modules
pub mod calendar;
pub mod materialization;
pub mod records;
pub mod templates;

/// Domain-specific trait for template operations
#[async_trait]
pub trait TemplateRepository {
    async fn add_template(&self, data: NewTemplateData) -> Result<RecurrenceTemplate, CoreError>;
    async fn find_template_by_id(&self, id: Uuid) -> Result<Option<RecurrenceTemplate>, CoreError>;
    async fn find_templates_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<RecurrenceTemplate>, CoreError>;
    async fn find_templates(&self, include_inactive: bool) -> Result<Vec<RecurrenceTemplate>, CoreError>;
    async fn find_active_templates(&self) -> Result<Vec<RecurrenceTemplate>, CoreError>;
    async fn update_template(&self, id: Uuid, data: UpdateTemplateData) -> Result<RecurrenceTemplate, CoreError>;
    async fn deactivate_template(&self, id: Uuid) -> Result<RecurrenceTemplate, CoreError>;
    async fn consume_occurrence(&self, id: Uuid) -> Result<RecurrenceTemplate, CoreError>;
}

/// Domain-specific trait for concrete record operations
#[async_trait]
pub trait RecordRepository {
    async fn add_record(&self, data: NewRecordData) -> Result<ConcreteRecord, CoreError>;
    async fn find_record_by_id(&self, id: Uuid) -> Result<Option<ConcreteRecord>, CoreError>;
    async fn find_records_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<ConcreteRecord>, CoreError>;
    async fn find_records_in_window(&self, start: CalendarDate, end: CalendarDate) -> Result<Vec<ConcreteRecord>, CoreError>;
    async fn find_records_for_period(&self, period: PeriodKey) -> Result<Vec<ConcreteRecord>, CoreError>;
    async fn settle_record(&self, id: Uuid) -> Result<ConcreteRecord, CoreError>;
}

/// Domain-specific trait for materialization operations
#[async_trait]
pub trait MaterializationRepository {
    async fn materialize(&self, templates: &[RecurrenceTemplate], period: PeriodKey) -> Result<MaterializationOutcome, CoreError>;
    async fn materialize_active(&self, period: PeriodKey) -> Result<MaterializationOutcome, CoreError>;
}

/// Domain-specific trait for calendar reads and interactions
#[async_trait]
pub trait CalendarRepository {
    async fn calendar_window(&self, start: CalendarDate, end: CalendarDate, materialized_periods: &[PeriodKey]) -> Result<Vec<DayBucket>, CoreError>;
    async fn preview_template(&self, id: Uuid, start: CalendarDate, end: CalendarDate) -> Result<Vec<VirtualInstance>, CoreError>;
    async fn move_instance(&self, instance: InstanceRef, new_date: CalendarDate) -> Result<MoveResult, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    TemplateRepository +
    RecordRepository +
    MaterializationRepository +
    CalendarRepository
{
    // This trait automatically composes all domain-specific repositories
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    materialization_manager: MaterializationManager,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, materialization_manager: MaterializationManager) -> Self {
        Self { pool, materialization_manager }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a reference to the materialization manager for internal use
    pub(crate) fn materialization_manager(&self) -> &MaterializationManager {
        &self.materialization_manager
    }
}

impl Repository for SqliteRepository {}

/// Turns a user-typed id prefix into a `LIKE` pattern over `hex(id)`.
pub(crate) fn hex_prefix_pattern(short_id: &str) -> String {
    let mut pattern: String = short_id
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    pattern.push('%');
    pattern
}
