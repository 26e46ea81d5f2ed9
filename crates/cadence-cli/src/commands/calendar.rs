use anyhow::Result;
use cadence_core::date::PeriodKey;
use cadence_core::repository::Repository;

use crate::cli::CalendarCommand;
use crate::commands::preview::resolve_window;
use crate::config::Config;
use crate::parser::parse_period;
use crate::views::table::display_calendar;

pub async fn show_calendar(repo: &impl Repository, command: CalendarCommand, config: &Config) -> Result<()> {
    let (from, to) = resolve_window(command.from.as_deref(), command.to.as_deref(), config)?;
    let periods: Vec<PeriodKey> = command
        .periods
        .iter()
        .map(|p| parse_period(p))
        .collect::<Result<_>>()?;

    let buckets = repo.calendar_window(from, to, &periods).await?;
    if command.json {
        println!("{}", serde_json::to_string_pretty(&buckets)?);
    } else {
        display_calendar(&buckets);
    }
    Ok(())
}
