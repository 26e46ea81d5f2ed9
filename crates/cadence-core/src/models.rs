use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::date::{CalendarDate, PeriodKey};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Task,
    Transaction,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid template kind: {0}")]
pub struct ParseTemplateKindError(String);

impl FromStr for TemplateKind {
    type Err = ParseTemplateKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" => Ok(TemplateKind::Task),
            "transaction" | "bill" => Ok(TemplateKind::Transaction),
            _ => Err(ParseTemplateKindError(s.to_string())),
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Task => write!(f, "task"),
            TemplateKind::Transaction => write!(f, "transaction"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Day,
    Week,
    Month,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid interval unit: {0}")]
pub struct ParseIntervalUnitError(String);

impl FromStr for IntervalUnit {
    type Err = ParseIntervalUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(IntervalUnit::Day),
            "week" | "weekly" => Ok(IntervalUnit::Week),
            "month" | "monthly" => Ok(IntervalUnit::Month),
            _ => Err(ParseIntervalUnitError(s.to_string())),
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalUnit::Day => write!(f, "day"),
            IntervalUnit::Week => write!(f, "week"),
            IntervalUnit::Month => write!(f, "month"),
        }
    }
}

/// A recurring definition: a task repeated weekly or a bill repeated monthly.
///
/// Templates are deactivated, never deleted, once their recurrence ends.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RecurrenceTemplate {
    pub id: Uuid,
    pub kind: TemplateKind,
    pub description: String,
    pub counterparty: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub amount_cents: Option<i64>,
    /// The seed occurrence. It is a concrete record itself and is never projected.
    pub anchor_date: Option<CalendarDate>,
    pub interval_unit: IntervalUnit,
    pub interval_count: u32,
    /// Nominal day used when materializing into a monthly period.
    pub day_of_month: Option<u32>,
    /// `None` means unbounded
    pub max_occurrences: Option<u32>,
    pub completed_occurrences: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for RecurrenceTemplate {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: TemplateKind::Task,
            description: String::new(),
            counterparty: None,
            category: None,
            payment_method: None,
            amount_cents: None,
            anchor_date: None,
            interval_unit: IntervalUnit::Week,
            interval_count: 1,
            day_of_month: None,
            max_occurrences: None,
            completed_occurrences: 0,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl RecurrenceTemplate {
    /// Occurrences still allowed, or `None` when unbounded.
    pub fn remaining_quota(&self) -> Option<u32> {
        self.max_occurrences
            .map(|max| max.saturating_sub(self.completed_occurrences))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_quota() == Some(0)
    }

    /// The day-of-month used for period materialization, if this template has one.
    ///
    /// Month-unit templates fall back to the anchor's day. Out-of-range values
    /// make the template a non-participant.
    pub fn day_of_period(&self) -> Option<u32> {
        let day = match (self.day_of_month, self.interval_unit) {
            (Some(day), _) => day,
            (None, IntervalUnit::Month) => self.anchor_date?.day(),
            (None, _) => return None,
        };
        (1..=31).contains(&day).then_some(day)
    }
}

/// A persisted occurrence. Materialized rows carry the template id they came from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ConcreteRecord {
    pub id: Uuid,
    pub template_id: Option<Uuid>,
    pub kind: TemplateKind,
    pub date: CalendarDate,
    #[sqlx(try_from = "String")]
    pub period_key: PeriodKey,
    pub description: String,
    pub counterparty: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub amount_cents: Option<i64>,
    /// Canonical natural key, see [`crate::natural_key::NaturalKey::canonical`]
    pub natural_key: String,
    pub recurring: bool,
    pub settled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a calendar entry is addressed by interactions such as moving it.
///
/// Virtual instances resolve back to their template instead of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InstanceRef {
    Virtual { template_id: Uuid, sequence_index: u32 },
    Concrete { id: Uuid },
}

const LEGACY_INSTANCE_SEPARATOR: &str = "_instance_";

impl InstanceRef {
    pub fn is_virtual(&self) -> bool {
        matches!(self, InstanceRef::Virtual { .. })
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceRef::Virtual {
                template_id,
                sequence_index,
            } => write!(f, "{}{}{}", template_id, LEGACY_INSTANCE_SEPARATOR, sequence_index),
            InstanceRef::Concrete { id } => write!(f, "{}", id),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid instance reference: {0}")]
pub struct ParseInstanceRefError(String);

impl FromStr for InstanceRef {
    type Err = ParseInstanceRefError;

    /// Accepts a plain record id or the `<template-id>_instance_<n>` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseInstanceRefError(s.to_string());
        match s.split_once(LEGACY_INSTANCE_SEPARATOR) {
            Some((template_id, index)) => Ok(InstanceRef::Virtual {
                template_id: template_id.parse().map_err(|_| err())?,
                sequence_index: index.parse().map_err(|_| err())?,
            }),
            None => Ok(InstanceRef::Concrete {
                id: s.parse().map_err(|_| err())?,
            }),
        }
    }
}

/// A projected occurrence. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualInstance {
    pub source_template_id: Uuid,
    pub sequence_index: u32,
    pub due_date: CalendarDate,
    pub kind: TemplateKind,
    pub description: String,
    pub counterparty: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub amount_cents: Option<i64>,
}

impl VirtualInstance {
    pub fn instance_ref(&self) -> InstanceRef {
        InstanceRef::Virtual {
            template_id: self.source_template_id,
            sequence_index: self.sequence_index,
        }
    }

    pub fn is_projected(&self) -> bool {
        true
    }
}

// ============================================================================
// Data Transfer Objects
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewTemplateData {
    pub kind: TemplateKind,
    pub description: String,
    pub counterparty: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub amount_cents: Option<i64>,
    pub anchor_date: CalendarDate,
    pub interval_unit: IntervalUnit,
    pub interval_count: u32,
    pub day_of_month: Option<u32>,
    pub max_occurrences: Option<u32>,
}

impl Default for NewTemplateData {
    fn default() -> Self {
        Self {
            kind: TemplateKind::Task,
            description: String::new(),
            counterparty: None,
            category: None,
            payment_method: None,
            amount_cents: None,
            anchor_date: CalendarDate::today(),
            interval_unit: IntervalUnit::Week,
            interval_count: 1,
            day_of_month: None,
            max_occurrences: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTemplateData {
    pub description: Option<String>,
    pub counterparty: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub payment_method: Option<Option<String>>,
    pub amount_cents: Option<Option<i64>>,
    pub anchor_date: Option<CalendarDate>,
    pub day_of_month: Option<Option<u32>>,
    pub max_occurrences: Option<Option<u32>>,
    pub active: Option<bool>,
}

/// An ad-hoc concrete record entered by the user.
#[derive(Debug, Clone)]
pub struct NewRecordData {
    pub kind: TemplateKind,
    pub date: CalendarDate,
    pub description: String,
    pub counterparty: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub amount_cents: Option<i64>,
    pub template_id: Option<Uuid>,
    pub recurring: bool,
    pub settled: bool,
}

impl Default for NewRecordData {
    fn default() -> Self {
        Self {
            kind: TemplateKind::Transaction,
            date: CalendarDate::today(),
            description: String::new(),
            counterparty: None,
            category: None,
            payment_method: None,
            amount_cents: None,
            template_id: None,
            recurring: false,
            settled: false,
        }
    }
}

/// Result of a move interaction.
#[derive(Debug)]
pub enum MoveResult {
    Record(ConcreteRecord),
    Reanchored {
        template: RecurrenceTemplate,
        shifted_by_days: i64,
    },
}
