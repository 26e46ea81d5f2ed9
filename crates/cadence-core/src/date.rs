//! Day-granularity calendar values.
//!
//! Everything in the engine compares dates at day granularity. [`CalendarDate`]
//! wraps a [`chrono::NaiveDate`] so no time or timezone component can leak
//! into comparisons, and [`PeriodKey`] names the month a concrete record
//! belongs to for deduplication.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A calendar day with no time-of-day and no timezone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Builds a date, returning `None` for impossible combinations such as February 30th.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Today's date in UTC.
    pub fn today() -> Self {
        Self(chrono::Utc::now().date_naive())
    }

    pub fn add_days(&self, days: i64) -> Option<Self> {
        self.0
            .checked_add_signed(chrono::Duration::days(days))
            .map(Self)
    }

    /// Adds whole months, clamping the day to the end of the target month
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn add_months(&self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(Self)
    }

    pub fn sub_months(&self, months: u32) -> Option<Self> {
        self.0.checked_sub_months(Months::new(months)).map(Self)
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(&self, other: CalendarDate) -> i64 {
        other.0.signed_duration_since(self.0).num_days()
    }

    /// Number of days in this date's month.
    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year(), self.month())
    }

    /// The month this date belongs to.
    pub fn period_key(&self) -> PeriodKey {
        PeriodKey {
            year: self.year(),
            month: self.month(),
        }
    }

    /// Iterates every day from `start` to `end`, both inclusive.
    pub fn range_inclusive(start: CalendarDate, end: CalendarDate) -> impl Iterator<Item = CalendarDate> {
        start
            .0
            .iter_days()
            .take_while(move |d| *d <= end.0)
            .map(CalendarDate)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for CalendarDate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| CoreError::InvalidDate(s.to_string()))
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Number of days in the given month, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// A year-month identifying the period a concrete record was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidDate(format!("{year}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn current() -> Self {
        CalendarDate::today().period_key()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> CalendarDate {
        CalendarDate(NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN))
    }

    pub fn last_day(&self) -> CalendarDate {
        self.clamp_day(31)
    }

    /// The given day of this month, clamped to the month's last valid day.
    pub fn clamp_day(&self, day: u32) -> CalendarDate {
        let day = day.clamp(1, days_in_month(self.year, self.month));
        CalendarDate(NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or(NaiveDate::MIN))
    }

    pub fn window(&self) -> MaterializationWindow {
        MaterializationWindow {
            period_start: self.first_day(),
            period_end: self.last_day(),
        }
    }

    /// Whole months from `earlier` to `self` (negative when `earlier` is later).
    pub fn months_since(&self, earlier: PeriodKey) -> i64 {
        (self.year as i64 - earlier.year as i64) * 12 + (self.month as i64 - earlier.month as i64)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidDate(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(key: PeriodKey) -> Self {
        key.to_string()
    }
}

/// Calendar boundaries of one materialization period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializationWindow {
    pub period_start: CalendarDate,
    pub period_end: CalendarDate,
}

impl MaterializationWindow {
    pub fn contains(&self, date: CalendarDate) -> bool {
        self.period_start <= date && date <= self.period_end
    }
}
