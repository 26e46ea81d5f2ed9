//! # Cadence Core Library
//!
//! The recurrence engine behind a personal task and money tracker: recurring
//! templates are projected into virtual instances for calendar views and
//! materialized, one period at a time, into concrete records.
//!
//! ## Features
//!
//! - **Virtual Projection**: Templates expand into read-only instances over any
//!   date window, capped by their occurrence limit or a rolling horizon
//! - **Idempotent Materialization**: Re-running a period never duplicates a
//!   record; a natural key (description, counterparty, category, payment
//!   method) catches hand-entered twins
//! - **Date Clamping**: A day-31 template lands on the last day of short months
//! - **Calendar Aggregation**: Concrete records and projections merged into
//!   day buckets
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`date`]: Calendar dates, period keys and clamping
//! - [`models`]: Templates, records, instances and transfer objects
//! - [`natural_key`]: Duplicate detection across templates and records
//! - [`recurrence`]: Projection and materialization engines
//! - [`calendar`]: Day buckets and series re-anchoring
//! - [`repository`]: Data access layer with Repository pattern
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     date::PeriodKey,
//!     db,
//!     models::{IntervalUnit, NewTemplateData, TemplateKind},
//!     recurrence::MaterializationManager,
//!     repository::{MaterializationRepository, SqliteRepository, TemplateRepository},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let repo = SqliteRepository::new(pool, MaterializationManager::with_defaults());
//!
//!     repo.add_template(NewTemplateData {
//!         kind: TemplateKind::Transaction,
//!         description: "Rent".to_string(),
//!         amount_cents: Some(-120_000),
//!         interval_unit: IntervalUnit::Month,
//!         day_of_month: Some(31),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//!     let outcome = repo.materialize_active(PeriodKey::current()).await?;
//!     println!("created {} records", outcome.created.len());
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod date;
pub mod db;
pub mod error;
pub mod models;
pub mod natural_key;
pub mod recurrence;
pub mod repository;
