use clap::{Parser, Subcommand, ValueEnum};
use cadence_core::models::{IntervalUnit, TemplateKind};

/// Recurring tasks and bills, projected and materialized month by month
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a recurring template
    Add(AddCommand),
    /// List templates
    Templates(TemplatesCommand),
    /// Show upcoming projected occurrences of a template
    Preview(PreviewCommand),
    /// Create this period's records from active templates
    Materialize(MaterializeCommand),
    /// Show concrete records and projections day by day
    Calendar(CalendarCommand),
    /// Log a one-off record
    Record(RecordCommand),
    /// Mark a record as settled
    Settle(SettleCommand),
    /// Move a record, or shift a whole series via one of its projections
    Move(MoveCommand),
    /// Deactivate a template
    Stop(StopCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum KindArg {
    Task,
    Transaction,
}

impl From<KindArg> for TemplateKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Task => TemplateKind::Task,
            KindArg::Transaction => TemplateKind::Transaction,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum EveryArg {
    Day,
    Week,
    Month,
}

impl From<EveryArg> for IntervalUnit {
    fn from(every: EveryArg) -> Self {
        match every {
            EveryArg::Day => IntervalUnit::Day,
            EveryArg::Week => IntervalUnit::Week,
            EveryArg::Month => IntervalUnit::Month,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// What recurs
    pub description: String,
    /// First occurrence (defaults to today)
    #[arg(long)]
    pub anchor: Option<String>,
    #[arg(long, value_enum, default_value = "week")]
    pub every: EveryArg,
    /// Repeat every N units
    #[arg(long, default_value_t = 1)]
    pub interval: u32,
    /// Stop after N occurrences
    #[arg(long)]
    pub count: Option<u32>,
    /// Day of month used when materializing (1-31, clamped to short months)
    #[arg(long)]
    pub day_of_month: Option<u32>,
    #[arg(long, value_enum, default_value = "task")]
    pub kind: KindArg,
    #[arg(long)]
    pub counterparty: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub payment_method: Option<String>,
    /// Amount such as 12.50; negative for outgoing
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct TemplatesCommand {
    /// Include deactivated templates
    #[arg(long)]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// The ID of the template
    pub id: String,
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct MaterializeCommand {
    /// Period as YYYY-MM (defaults to the current month)
    #[arg(long)]
    pub period: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CalendarCommand {
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
    /// Periods already materialized (repeatable); projections are hidden there
    #[arg(long = "period")]
    pub periods: Vec<String>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecordCommand {
    pub description: String,
    /// Defaults to today
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long, value_enum, default_value = "transaction")]
    pub kind: KindArg,
    #[arg(long)]
    pub counterparty: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub payment_method: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Option<String>,
    /// Record is already settled
    #[arg(long)]
    pub settled: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SettleCommand {
    /// The ID of the record to settle
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveCommand {
    /// A record ID, or `<template-id>_instance_<n>` for a projection
    pub instance: String,
    /// The new date
    pub date: String,
}

#[derive(Parser, Debug, Clone)]
pub struct StopCommand {
    /// The ID of the template to deactivate
    pub id: String,
    /// Skip confirmation
    #[clap(short, long)]
    pub force: bool,
}
