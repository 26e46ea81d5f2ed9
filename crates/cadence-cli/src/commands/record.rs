use anyhow::Result;
use cadence_core::date::CalendarDate;
use cadence_core::models::NewRecordData;
use cadence_core::repository::Repository;
use owo_colors::{OwoColorize, Style};

use crate::cli::RecordCommand;
use crate::parser::{parse_amount, parse_date};

pub async fn add_record(repo: &impl Repository, command: RecordCommand) -> Result<()> {
    let date = command
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(CalendarDate::today);
    let amount_cents = command.amount.as_deref().map(parse_amount).transpose()?;

    let record = repo
        .add_record(NewRecordData {
            kind: command.kind.into(),
            date,
            description: command.description,
            counterparty: command.counterparty,
            category: command.category,
            payment_method: command.payment_method,
            amount_cents,
            template_id: None,
            recurring: false,
            settled: command.settled,
        })
        .await?;

    println!(
        "{} Recorded: {} on {}",
        "✓".style(Style::new().green().bold()),
        record.description.bright_white().bold(),
        record.date.to_string().cyan()
    );
    println!("  {} Record ID: {}", "→".blue(), record.id.to_string().yellow());
    Ok(())
}
