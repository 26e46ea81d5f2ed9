//! Calendar view model: concrete records and projected instances grouped by day.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::trace;
use uuid::Uuid;

use crate::date::{CalendarDate, PeriodKey};
use crate::models::{ConcreteRecord, InstanceRef, IntervalUnit, RecurrenceTemplate, VirtualInstance};
use crate::natural_key::NaturalKey;
use crate::recurrence::{occurrence_date, InstanceProjector};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CalendarEntry {
    Concrete(ConcreteRecord),
    Virtual(VirtualInstance),
}

impl CalendarEntry {
    pub fn date(&self) -> CalendarDate {
        match self {
            CalendarEntry::Concrete(record) => record.date,
            CalendarEntry::Virtual(instance) => instance.due_date,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CalendarEntry::Concrete(record) => &record.description,
            CalendarEntry::Virtual(instance) => &instance.description,
        }
    }

    pub fn amount_cents(&self) -> Option<i64> {
        match self {
            CalendarEntry::Concrete(record) => record.amount_cents,
            CalendarEntry::Virtual(instance) => instance.amount_cents,
        }
    }

    pub fn template_id(&self) -> Option<Uuid> {
        match self {
            CalendarEntry::Concrete(record) => record.template_id,
            CalendarEntry::Virtual(instance) => Some(instance.source_template_id),
        }
    }

    pub fn instance_ref(&self) -> InstanceRef {
        match self {
            CalendarEntry::Concrete(record) => InstanceRef::Concrete { id: record.id },
            CalendarEntry::Virtual(instance) => instance.instance_ref(),
        }
    }

    pub fn is_projected(&self) -> bool {
        matches!(self, CalendarEntry::Virtual(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: CalendarDate,
    pub entries: Vec<CalendarEntry>,
}

impl DayBucket {
    fn new(date: CalendarDate) -> Self {
        Self {
            date,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn concrete(&self) -> impl Iterator<Item = &ConcreteRecord> {
        self.entries.iter().filter_map(|e| match e {
            CalendarEntry::Concrete(record) => Some(record),
            CalendarEntry::Virtual(_) => None,
        })
    }

    pub fn projected(&self) -> impl Iterator<Item = &VirtualInstance> {
        self.entries.iter().filter_map(|e| match e {
            CalendarEntry::Virtual(instance) => Some(instance),
            CalendarEntry::Concrete(_) => None,
        })
    }
}

/// Builds day buckets for a query window.
#[derive(Debug, Clone, Default)]
pub struct CalendarAggregator {
    projector: InstanceProjector,
}

impl CalendarAggregator {
    pub fn new(projector: InstanceProjector) -> Self {
        Self { projector }
    }

    /// One bucket per day of `[window_start, window_end]`.
    ///
    /// Concrete records come first in each bucket. Templates that materialize
    /// per period only contribute projections to months not listed in
    /// `materialized_periods`; weekly and daily templates always project. A
    /// projection landing on a day that already holds a concrete record of the
    /// same template (by id or natural key) is dropped.
    pub fn for_window(
        &self,
        window_start: CalendarDate,
        window_end: CalendarDate,
        concrete: &[ConcreteRecord],
        templates: &[RecurrenceTemplate],
        materialized_periods: &[PeriodKey],
    ) -> Vec<DayBucket> {
        if window_start > window_end {
            return Vec::new();
        }

        let mut buckets: BTreeMap<CalendarDate, DayBucket> =
            CalendarDate::range_inclusive(window_start, window_end)
                .map(|d| (d, DayBucket::new(d)))
                .collect();

        let mut concrete_by_template: HashSet<(CalendarDate, Uuid)> = HashSet::new();
        let mut concrete_by_key: HashSet<(CalendarDate, NaturalKey)> = HashSet::new();
        for record in concrete {
            let Some(bucket) = buckets.get_mut(&record.date) else {
                continue;
            };
            if let Some(template_id) = record.template_id {
                concrete_by_template.insert((record.date, template_id));
            }
            concrete_by_key.insert((record.date, NaturalKey::from_record(record)));
            bucket.entries.push(CalendarEntry::Concrete(record.clone()));
        }

        for template in templates {
            let per_period = template.day_of_period().is_some();
            let key = NaturalKey::from_template(template);

            for instance in self.projector.project(template, window_start, window_end) {
                let day = instance.due_date;
                if per_period && materialized_periods.contains(&day.period_key()) {
                    continue;
                }
                if concrete_by_template.contains(&(day, template.id))
                    || concrete_by_key.contains(&(day, key.clone()))
                {
                    trace!(template_id = %template.id, %day, "projection shadowed by concrete record");
                    continue;
                }
                if let Some(bucket) = buckets.get_mut(&day) {
                    bucket.entries.push(CalendarEntry::Virtual(instance));
                }
            }
        }

        buckets.into_values().collect()
    }
}

/// Re-anchors the whole series so that occurrence `sequence_index` lands on
/// `new_date`.
///
/// Day and week templates move by the day delta. Month templates take the drop
/// date's day as their new `day_of_month`, with the anchor placed the same
/// number of months before it, so month-end clamping keeps working afterwards.
///
/// Returns the updated template and the shift in days, or `None` when the
/// template cannot be projected (no anchor, zero interval) or the occurrence
/// lies past the remaining quota.
pub fn reanchor(
    template: &RecurrenceTemplate,
    sequence_index: u32,
    new_date: CalendarDate,
) -> Option<(RecurrenceTemplate, i64)> {
    let anchor = template.anchor_date?;
    if template.interval_count == 0 {
        return None;
    }
    if template.remaining_quota().is_some_and(|remaining| sequence_index >= remaining) {
        return None;
    }
    let k = sequence_index.checked_add(1)?;
    let due = occurrence_date(template, anchor, k)?;
    let shift = due.days_until(new_date);

    let mut updated = template.clone();
    match template.interval_unit {
        IntervalUnit::Month => {
            let months_back = template.interval_count.checked_mul(k)?;
            let anchor_period = new_date.period_key().first_day().sub_months(months_back)?.period_key();
            updated.anchor_date = Some(anchor_period.clamp_day(new_date.day()));
            updated.day_of_month = Some(new_date.day());
        }
        IntervalUnit::Day | IntervalUnit::Week => {
            let new_anchor = anchor.add_days(shift)?;
            updated.anchor_date = Some(new_anchor);
            if updated.day_of_month.is_some() {
                updated.day_of_month = Some(new_anchor.day());
            }
        }
    }
    Some((updated, shift))
}
