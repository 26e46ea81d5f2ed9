use anyhow::Result;
use cadence_core::date::PeriodKey;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::MaterializeCommand;
use crate::parser::parse_period;
use crate::views::table::display_records;

pub async fn materialize(repo: &impl Repository, command: MaterializeCommand) -> Result<()> {
    let period = command
        .period
        .as_deref()
        .map(parse_period)
        .transpose()?
        .unwrap_or_else(PeriodKey::current);

    let outcome = repo.materialize_active(period).await?;

    println!(
        "{} {}: {} created, {} already present",
        "✓".green().bold(),
        outcome.period.to_string().cyan(),
        outcome.created.len(),
        outcome.skipped.len()
    );
    if !outcome.created.is_empty() {
        display_records(&outcome.created);
    }
    for key in &outcome.skipped {
        println!("  {} skipped {}", "•".bright_black(), key.to_string().bright_black());
    }
    Ok(())
}
