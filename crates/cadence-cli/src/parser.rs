use anyhow::{anyhow, Result};
use cadence_core::date::{CalendarDate, PeriodKey};
use chrono::Utc;
use chrono_english::{parse_date_string, Dialect};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses `2025-03-01` or anything chrono-english understands ("tomorrow",
/// "next friday", "3 days").
pub fn parse_date(date_str: &str) -> Result<CalendarDate> {
    if let Ok(date) = date_str.trim().parse::<CalendarDate>() {
        return Ok(date);
    }
    parse_date_string(date_str, Utc::now(), Dialect::Uk)
        .map(|dt| CalendarDate::from_naive(dt.date_naive()))
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", date_str, e))
}

pub fn parse_period(period_str: &str) -> Result<PeriodKey> {
    period_str
        .trim()
        .parse::<PeriodKey>()
        .map_err(|e| anyhow!("Failed to parse period '{}': {} (expected YYYY-MM)", period_str, e))
}

/// Parses a decimal amount into cents. Negative amounts are outgoing.
pub fn parse_amount(amount_str: &str) -> Result<i64> {
    let amount = Decimal::from_str(amount_str.trim())
        .map_err(|e| anyhow!("Failed to parse amount '{}': {}", amount_str, e))?;
    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .filter(|c| c.fract().is_zero())
        .ok_or_else(|| anyhow!("Amount '{}' has more than two decimal places", amount_str))?;
    cents
        .to_i64()
        .ok_or_else(|| anyhow!("Amount '{}' is out of range", amount_str))
}

pub fn format_amount(cents: i64) -> String {
    Decimal::new(cents, 2).to_string()
}
