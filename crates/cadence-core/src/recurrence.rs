use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::date::{CalendarDate, PeriodKey};
use crate::models::{ConcreteRecord, IntervalUnit, RecurrenceTemplate, VirtualInstance};
use crate::natural_key::{KeyIndex, NaturalKey};

/// Unbounded templates stop projecting this many months past the window end.
pub const DEFAULT_HORIZON_MONTHS: u32 = 6;

/// Date of the `k`-th occurrence after the anchor (`k = 0` is the anchor).
///
/// Computed from the anchor rather than by stepping, so month-unit templates
/// anchored on the 31st come back to the 31st after a short month.
pub fn occurrence_date(template: &RecurrenceTemplate, anchor: CalendarDate, k: u32) -> Option<CalendarDate> {
    let steps = template.interval_count.checked_mul(k)?;
    match template.interval_unit {
        IntervalUnit::Day => anchor.add_days(steps as i64),
        IntervalUnit::Week => anchor.add_days(steps as i64 * 7),
        IntervalUnit::Month => {
            let base = anchor.add_months(steps)?;
            Some(match template.day_of_period() {
                Some(day) => base.period_key().clamp_day(day),
                None => base,
            })
        }
    }
}

/// InstanceProjector: turns a template into display-only occurrences.
///
/// Projection is pure; identical inputs always produce identical output, and
/// malformed templates produce nothing instead of an error.
#[derive(Debug, Clone)]
pub struct InstanceProjector {
    horizon_months: u32,
}

impl Default for InstanceProjector {
    fn default() -> Self {
        Self {
            horizon_months: DEFAULT_HORIZON_MONTHS,
        }
    }
}

impl InstanceProjector {
    pub fn new(horizon_months: u32) -> Self {
        Self { horizon_months }
    }

    pub fn horizon_months(&self) -> u32 {
        self.horizon_months
    }

    /// Projects `template` into virtual instances due within
    /// `[window_start, window_end]`, both inclusive.
    ///
    /// # Behavior
    /// - Projection starts one interval after the anchor; the anchor is never emitted
    /// - Bounded templates emit at most `max_occurrences - completed_occurrences`
    ///   instances and never past `anchor + max_occurrences` intervals
    /// - Unbounded templates stop at `window_end + horizon` months
    /// - Inactive, exhausted or anchorless templates yield an empty list
    pub fn project(
        &self,
        template: &RecurrenceTemplate,
        window_start: CalendarDate,
        window_end: CalendarDate,
    ) -> Vec<VirtualInstance> {
        if !template.active {
            return Vec::new();
        }
        let Some(anchor) = template.anchor_date else {
            debug!(template_id = %template.id, "template has no anchor date, nothing to project");
            return Vec::new();
        };
        if template.interval_count == 0 {
            debug!(template_id = %template.id, "template has a zero interval, nothing to project");
            return Vec::new();
        }
        if window_start > window_end {
            return Vec::new();
        }

        let remaining = match template.remaining_quota() {
            Some(0) => return Vec::new(),
            Some(n) => n,
            None => u32::MAX,
        };

        let cap = self.projection_cap(template, anchor, window_end);

        let mut instances = Vec::new();
        let mut count: u32 = 0;
        while count < remaining {
            let Some(cursor) = occurrence_date(template, anchor, count + 1) else {
                break;
            };
            if cursor > cap {
                break;
            }
            if cursor >= window_start && cursor <= window_end && cursor != anchor {
                instances.push(VirtualInstance {
                    source_template_id: template.id,
                    sequence_index: count,
                    due_date: cursor,
                    kind: template.kind,
                    description: template.description.clone(),
                    counterparty: template.counterparty.clone(),
                    category: template.category.clone(),
                    payment_method: template.payment_method.clone(),
                    amount_cents: template.amount_cents,
                });
            }
            count += 1;
        }

        trace!(template_id = %template.id, emitted = instances.len(), iterations = count, "projected template");
        instances
    }

    /// Last date expansion may reach: the final quota occurrence for bounded
    /// templates, `window_end + horizon` months otherwise.
    pub(crate) fn projection_cap(
        &self,
        template: &RecurrenceTemplate,
        anchor: CalendarDate,
        window_end: CalendarDate,
    ) -> CalendarDate {
        match template.max_occurrences {
            Some(max) => occurrence_date(template, anchor, max),
            None => window_end.add_months(self.horizon_months),
        }
        .unwrap_or(CalendarDate::from_naive(NaiveDate::MAX))
    }

    /// Projects every template and returns the merged instances in date order.
    pub fn project_all<'a>(
        &self,
        templates: impl IntoIterator<Item = &'a RecurrenceTemplate>,
        window_start: CalendarDate,
        window_end: CalendarDate,
    ) -> Vec<VirtualInstance> {
        let mut instances: Vec<VirtualInstance> = templates
            .into_iter()
            .flat_map(|t| self.project(t, window_start, window_end))
            .collect();
        instances.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.source_template_id.cmp(&b.source_template_id))
        });
        instances
    }
}

/// Projects with the default horizon.
pub fn project(
    template: &RecurrenceTemplate,
    window_start: CalendarDate,
    window_end: CalendarDate,
) -> Vec<VirtualInstance> {
    InstanceProjector::default().project(template, window_start, window_end)
}

// ============================================================================
// MaterializationManager
// ============================================================================

/// Configuration for materialization behavior
#[derive(Debug, Clone)]
pub struct MaterializationConfig {
    /// Rows per insert statement
    pub max_batch_size: usize,
    /// Projection horizon for unbounded templates, in months
    pub horizon_months: u32,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            horizon_months: DEFAULT_HORIZON_MONTHS,
        }
    }
}

/// What a materialization run decided before touching the store.
#[derive(Debug, Clone, Default)]
pub struct MaterializationPlan {
    pub to_create: Vec<ConcreteRecord>,
    pub skipped: Vec<NaturalKey>,
}

/// Result reported to the caller after a materialization run.
#[derive(Debug, Clone, Serialize)]
pub struct MaterializationOutcome {
    pub period: PeriodKey,
    pub created: Vec<ConcreteRecord>,
    pub skipped: Vec<NaturalKey>,
}

/// MaterializationManager: decides which templates become concrete records
/// for a period.
///
/// Responsibilities:
/// 1. Compute each template's clamped target date in the period
/// 2. Filter out templates that do not participate (inactive, exhausted, malformed)
/// 3. Skip templates whose natural key already has a record in the period
/// 4. Build fresh, unsettled records for the rest
#[derive(Debug, Clone)]
pub struct MaterializationManager {
    config: MaterializationConfig,
}

impl MaterializationManager {
    pub fn new(config: MaterializationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MaterializationConfig::default())
    }

    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: MaterializationConfig) {
        self.config = config;
    }

    pub fn projector(&self) -> InstanceProjector {
        InstanceProjector::new(self.config.horizon_months)
    }

    /// The template's nominal day-of-month, clamped to the last day of `period`.
    pub fn target_date(template: &RecurrenceTemplate, period: PeriodKey) -> Option<CalendarDate> {
        template.day_of_period().map(|day| period.clamp_day(day))
    }

    /// Whether the template should produce a record in `period` at all.
    pub fn participates(template: &RecurrenceTemplate, period: PeriodKey) -> bool {
        if !template.active || template.is_exhausted() || template.interval_count == 0 {
            return false;
        }
        let Some(anchor) = template.anchor_date else {
            return false;
        };
        if template.day_of_period().is_none() || anchor > period.last_day() {
            return false;
        }
        if template.interval_unit != IntervalUnit::Month {
            return true;
        }

        // Occurrence number of this period, the anchor's month being 0.
        let months = period.months_since(anchor.period_key());
        let every = template.interval_count as i64;
        if months % every != 0 {
            return false;
        }
        match template.max_occurrences {
            Some(max) => months / every <= max as i64,
            None => true,
        }
    }

    /// Plans the records to insert for `period`.
    ///
    /// `existing` should hold the records already stored for the period; rows
    /// from other periods are ignored. Two templates sharing a natural key
    /// produce a single record.
    pub fn plan(
        &self,
        templates: &[RecurrenceTemplate],
        period: PeriodKey,
        existing: &[ConcreteRecord],
    ) -> MaterializationPlan {
        let mut index = KeyIndex::from_records(existing.iter().filter(|r| r.period_key == period));
        let mut plan = MaterializationPlan::default();
        let window = period.window();

        for template in templates {
            if !Self::participates(template, period) {
                continue;
            }
            let Some(date) = Self::target_date(template, period).filter(|d| window.contains(*d)) else {
                continue;
            };

            let key = NaturalKey::from_template(template);
            if index.contains_template(template) {
                debug!(template_id = %template.id, %period, key = %key, "record already exists for period");
                plan.skipped.push(key);
                continue;
            }

            index.insert_template(template);
            plan.to_create.push(Self::build_record(template, date, period, &key));
        }

        plan
    }

    fn build_record(
        template: &RecurrenceTemplate,
        date: CalendarDate,
        period: PeriodKey,
        key: &NaturalKey,
    ) -> ConcreteRecord {
        let now = Utc::now();
        ConcreteRecord {
            id: Uuid::now_v7(),
            template_id: Some(template.id),
            kind: template.kind,
            date,
            period_key: period,
            description: template.description.clone(),
            counterparty: template.counterparty.clone(),
            category: template.category.clone(),
            payment_method: template.payment_method.clone(),
            amount_cents: template.amount_cents,
            natural_key: key.canonical(),
            recurring: true,
            settled: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateKind;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(s: &str) -> CalendarDate {
        s.parse().unwrap()
    }

    fn weekly_template(anchor: &str, max: Option<u32>) -> RecurrenceTemplate {
        RecurrenceTemplate {
            description: "Water the plants".to_string(),
            anchor_date: Some(date(anchor)),
            interval_unit: IntervalUnit::Week,
            interval_count: 1,
            max_occurrences: max,
            ..Default::default()
        }
    }

    fn bill_template(description: &str, anchor: &str, day: u32) -> RecurrenceTemplate {
        RecurrenceTemplate {
            kind: TemplateKind::Transaction,
            description: description.to_string(),
            counterparty: Some("Landlord".to_string()),
            category: Some("Housing".to_string()),
            payment_method: Some("transfer".to_string()),
            amount_cents: Some(120_000),
            anchor_date: Some(date(anchor)),
            interval_unit: IntervalUnit::Month,
            interval_count: 1,
            day_of_month: Some(day),
            ..Default::default()
        }
    }

    mod projector_tests {
        use super::*;

        #[test]
        fn test_bounded_quota_is_exact() {
            let template = weekly_template("2025-01-01", Some(4));
            let instances = project(&template, date("2024-01-01"), date("2030-12-31"));

            let dates: Vec<String> = instances.iter().map(|i| i.due_date.to_string()).collect();
            assert_eq!(dates, vec!["2025-01-08", "2025-01-15", "2025-01-22", "2025-01-29"]);
            let indexes: Vec<u32> = instances.iter().map(|i| i.sequence_index).collect();
            assert_eq!(indexes, vec![0, 1, 2, 3]);
            assert!(instances.iter().all(|i| i.is_projected()));
        }

        #[test]
        fn test_window_after_all_occurrences_is_empty() {
            let template = weekly_template("2025-01-01", Some(4));
            assert!(project(&template, date("2025-02-01"), date("2025-02-28")).is_empty());
        }

        #[test]
        fn test_window_before_anchor_is_empty() {
            let template = weekly_template("2025-01-01", None);
            assert!(project(&template, date("2024-11-01"), date("2024-12-31")).is_empty());
        }

        #[test]
        fn test_anchor_is_never_projected() {
            let template = weekly_template("2025-01-01", None);
            let instances = project(&template, date("2025-01-01"), date("2025-01-08"));
            assert_eq!(instances.len(), 1);
            assert_eq!(instances[0].due_date, date("2025-01-08"));
        }

        #[test]
        fn test_exhausted_template_is_empty() {
            let mut template = weekly_template("2025-01-01", Some(4));
            template.completed_occurrences = 4;
            assert!(project(&template, date("2025-01-01"), date("2025-12-31")).is_empty());
        }

        #[test]
        fn test_partially_consumed_quota() {
            let mut template = weekly_template("2025-01-01", Some(4));
            template.completed_occurrences = 1;
            let instances = project(&template, date("2025-01-01"), date("2025-12-31"));
            assert_eq!(instances.len(), 3);
            assert_eq!(instances.last().map(|i| i.due_date), Some(date("2025-01-22")));
        }

        #[test]
        fn test_inactive_or_malformed_is_empty() {
            let mut inactive = weekly_template("2025-01-01", None);
            inactive.active = false;
            assert!(project(&inactive, date("2025-01-01"), date("2025-12-31")).is_empty());

            let mut anchorless = weekly_template("2025-01-01", None);
            anchorless.anchor_date = None;
            assert!(project(&anchorless, date("2025-01-01"), date("2025-12-31")).is_empty());

            let mut zero_interval = weekly_template("2025-01-01", None);
            zero_interval.interval_count = 0;
            assert!(project(&zero_interval, date("2025-01-01"), date("2025-12-31")).is_empty());
        }

        #[test]
        fn test_inverted_window_is_empty() {
            let template = weekly_template("2025-01-01", None);
            assert!(project(&template, date("2025-03-01"), date("2025-02-01")).is_empty());
        }

        #[test]
        fn test_unbounded_far_future_window_terminates() {
            let template = RecurrenceTemplate {
                interval_unit: IntervalUnit::Day,
                ..weekly_template("2025-01-01", None)
            };
            let instances = project(&template, date("2025-01-01"), date("2045-12-31"));
            assert_eq!(instances.first().map(|i| i.due_date), Some(date("2025-01-02")));
            assert_eq!(instances.last().map(|i| i.due_date), Some(date("2045-12-31")));
        }

        #[test]
        fn test_monthly_day_31_does_not_drift() {
            let template = bill_template("Rent", "2025-01-31", 31);
            let instances = project(&template, date("2025-02-01"), date("2025-05-31"));
            let dates: Vec<String> = instances.iter().map(|i| i.due_date.to_string()).collect();
            assert_eq!(dates, vec!["2025-02-28", "2025-03-31", "2025-04-30", "2025-05-31"]);
        }

        #[test]
        fn test_projection_copies_display_fields() {
            let template = bill_template("Rent", "2025-01-15", 15);
            let instances = project(&template, date("2025-02-01"), date("2025-02-28"));
            assert_eq!(instances.len(), 1);
            let instance = &instances[0];
            assert_eq!(instance.source_template_id, template.id);
            assert_eq!(instance.description, "Rent");
            assert_eq!(instance.amount_cents, Some(120_000));
            assert_eq!(
                instance.instance_ref().to_string(),
                format!("{}_instance_0", template.id)
            );
        }

        #[test]
        fn test_custom_horizon_bounds_iterations() {
            let projector = InstanceProjector::new(0);
            let template = weekly_template("2025-01-01", None);
            let instances = projector.project(&template, date("2025-01-01"), date("2025-01-31"));
            assert_eq!(instances.len(), 4);
            assert_eq!(
                projector.projection_cap(&template, date("2025-01-01"), date("2025-01-31")),
                date("2025-01-31")
            );
        }

        #[rstest]
        #[case(IntervalUnit::Day, "2025-01-31", "2025-07-31")]
        #[case(IntervalUnit::Week, "2045-12-31", "2046-06-30")]
        #[case(IntervalUnit::Month, "2025-08-31", "2026-02-28")]
        fn test_unbounded_cap_is_window_end_plus_horizon(
            #[case] unit: IntervalUnit,
            #[case] window_end: &str,
            #[case] expected: &str,
        ) {
            let template = RecurrenceTemplate {
                interval_unit: unit,
                ..weekly_template("2025-01-01", None)
            };
            let cap = InstanceProjector::default().projection_cap(&template, date("2025-01-01"), date(window_end));
            assert_eq!(cap, date(expected));
        }

        #[test]
        fn test_configured_horizon_moves_cap() {
            let template = RecurrenceTemplate {
                interval_unit: IntervalUnit::Day,
                ..weekly_template("2025-01-01", None)
            };
            let cap = InstanceProjector::new(12).projection_cap(&template, date("2025-01-01"), date("2025-01-31"));
            assert_eq!(cap, date("2026-01-31"));
        }

        #[test]
        fn test_bounded_cap_is_last_quota_occurrence() {
            let template = RecurrenceTemplate {
                interval_unit: IntervalUnit::Day,
                ..weekly_template("2025-01-01", Some(10))
            };
            let cap = InstanceProjector::default().projection_cap(&template, date("2025-01-01"), date("2030-01-01"));
            assert_eq!(cap, date("2025-01-11"));
        }

        #[test]
        fn test_project_all_orders_by_date() {
            let weekly = weekly_template("2025-01-01", None);
            let monthly = bill_template("Rent", "2024-12-10", 10);
            let instances = InstanceProjector::default().project_all(
                [&weekly, &monthly],
                date("2025-01-01"),
                date("2025-01-31"),
            );
            let dates: Vec<CalendarDate> = instances.iter().map(|i| i.due_date).collect();
            let mut sorted = dates.clone();
            sorted.sort();
            assert_eq!(dates, sorted);
            assert_eq!(instances.len(), 5);
        }

        proptest! {
            #[test]
            fn prop_projection_is_deterministic_and_in_window(
                offset in 0i64..3000,
                span in 0i64..400,
                every in 1u32..5,
                max in proptest::option::of(0u32..60),
            ) {
                let mut template = weekly_template("2020-01-01", max);
                template.interval_count = every;
                let start = date("2020-01-01").add_days(offset).unwrap();
                let end = start.add_days(span).unwrap();

                let first = project(&template, start, end);
                let second = project(&template, start, end);
                prop_assert_eq!(&first, &second);
                for pair in first.windows(2) {
                    prop_assert!(pair[0].due_date < pair[1].due_date);
                }
                for instance in &first {
                    prop_assert!(instance.due_date >= start && instance.due_date <= end);
                    prop_assert!(Some(instance.due_date) != template.anchor_date);
                }
                if let Some(max) = max {
                    prop_assert!(first.len() <= max as usize);
                }
            }
        }
    }

    mod materialization_manager_tests {
        use super::*;

        fn period(s: &str) -> PeriodKey {
            s.parse().unwrap()
        }

        #[rstest]
        #[case(31, "2025-02", "2025-02-28")]
        #[case(31, "2024-02", "2024-02-29")]
        #[case(30, "2025-02", "2025-02-28")]
        #[case(31, "2025-04", "2025-04-30")]
        #[case(31, "2025-09", "2025-09-30")]
        #[case(31, "2025-03", "2025-03-31")]
        #[case(1, "2025-02", "2025-02-01")]
        fn test_target_date_clamps(#[case] day: u32, #[case] period_str: &str, #[case] expected: &str) {
            let template = bill_template("Rent", "2024-01-31", day);
            assert_eq!(
                MaterializationManager::target_date(&template, period(period_str)),
                Some(date(expected))
            );
        }

        #[test]
        fn test_plan_creates_unsettled_recurring_records() {
            let manager = MaterializationManager::with_defaults();
            let template = bill_template("Rent", "2025-01-31", 31);
            let plan = manager.plan(&[template.clone()], period("2025-02"), &[]);

            assert_eq!(plan.to_create.len(), 1);
            assert!(plan.skipped.is_empty());
            let record = &plan.to_create[0];
            assert_eq!(record.date, date("2025-02-28"));
            assert_eq!(record.period_key, period("2025-02"));
            assert_eq!(record.template_id, Some(template.id));
            assert!(record.recurring);
            assert!(!record.settled);
            assert_eq!(record.natural_key, NaturalKey::from_template(&template).canonical());
        }

        #[test]
        fn test_plan_skips_existing_natural_key() {
            let manager = MaterializationManager::with_defaults();
            let template = bill_template("Rent", "2025-01-05", 5);
            let mut existing = manager.plan(&[template.clone()], period("2025-03"), &[]).to_create;
            // A hand-entered record carries no template id but the same tuple.
            existing[0].template_id = None;
            existing[0].settled = true;

            let plan = manager.plan(&[template.clone()], period("2025-03"), &existing);
            assert!(plan.to_create.is_empty());
            assert_eq!(plan.skipped, vec![NaturalKey::from_template(&template)]);
        }

        #[test]
        fn test_plan_ignores_records_from_other_periods() {
            let manager = MaterializationManager::with_defaults();
            let template = bill_template("Rent", "2025-01-05", 5);
            let mut february = manager.plan(&[template.clone()], period("2025-02"), &[]).to_create;
            february[0].settled = true;

            let plan = manager.plan(&[template], period("2025-03"), &february);
            assert_eq!(plan.to_create.len(), 1);
            assert!(!plan.to_create[0].settled);
        }

        #[test]
        fn test_plan_deduplicates_templates_with_same_key() {
            let manager = MaterializationManager::with_defaults();
            let first = bill_template("Rent", "2025-01-05", 5);
            let twin = RecurrenceTemplate {
                id: Uuid::now_v7(),
                ..first.clone()
            };
            let plan = manager.plan(&[first, twin], period("2025-03"), &[]);
            assert_eq!(plan.to_create.len(), 1);
            assert_eq!(plan.skipped.len(), 1);
        }

        #[test]
        fn test_non_participants_are_silent() {
            let manager = MaterializationManager::with_defaults();
            let mut inactive = bill_template("Gym", "2025-01-05", 5);
            inactive.active = false;
            let weekly = weekly_template("2025-01-01", None);
            let mut malformed = bill_template("Phone", "2025-01-05", 5);
            malformed.day_of_month = Some(0);
            let future = bill_template("Insurance", "2025-06-01", 1);
            let mut exhausted = bill_template("Loan", "2025-01-05", 5);
            exhausted.max_occurrences = Some(2);
            exhausted.completed_occurrences = 2;

            let plan = manager.plan(
                &[inactive, weekly, malformed, future, exhausted],
                period("2025-03"),
                &[],
            );
            assert!(plan.to_create.is_empty());
            assert!(plan.skipped.is_empty());
        }

        #[test]
        fn test_multi_month_interval_aligns_with_anchor() {
            let mut quarterly = bill_template("Water", "2025-01-15", 15);
            quarterly.interval_count = 3;
            assert!(MaterializationManager::participates(&quarterly, period("2025-01")));
            assert!(!MaterializationManager::participates(&quarterly, period("2025-02")));
            assert!(MaterializationManager::participates(&quarterly, period("2025-04")));
        }

        #[test]
        fn test_bounded_monthly_stops_after_last_occurrence() {
            let mut loan = bill_template("Loan", "2025-01-10", 10);
            loan.max_occurrences = Some(3);
            assert!(MaterializationManager::participates(&loan, period("2025-01")));
            assert!(MaterializationManager::participates(&loan, period("2025-04")));
            assert!(!MaterializationManager::participates(&loan, period("2025-05")));
        }

        #[test]
        fn test_plan_does_not_touch_templates() {
            let manager = MaterializationManager::with_defaults();
            let templates = vec![bill_template("Rent", "2025-01-05", 5)];
            let before = templates.clone();
            let _ = manager.plan(&templates, period("2025-03"), &[]);
            assert_eq!(templates, before);
        }

        #[test]
        fn test_with_defaults() {
            let manager = MaterializationManager::with_defaults();
            assert_eq!(manager.config().max_batch_size, 100);
            assert_eq!(manager.config().horizon_months, 6);
            assert_eq!(manager.projector().horizon_months(), 6);
        }

        #[test]
        fn test_update_config() {
            let mut manager = MaterializationManager::with_defaults();
            manager.update_config(MaterializationConfig {
                max_batch_size: 10,
                horizon_months: 12,
            });
            assert_eq!(manager.config().max_batch_size, 10);
            assert_eq!(manager.projector().horizon_months(), 12);
        }
    }
}
