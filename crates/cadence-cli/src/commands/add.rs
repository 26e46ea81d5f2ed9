use anyhow::Result;
use cadence_core::date::CalendarDate;
use cadence_core::models::{IntervalUnit, NewTemplateData};
use cadence_core::repository::Repository;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::parser::{format_amount, parse_amount, parse_date};

pub async fn add_template(repo: &impl Repository, command: AddCommand) -> Result<()> {
    let anchor_date = command
        .anchor
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(CalendarDate::today);
    let amount_cents = command.amount.as_deref().map(parse_amount).transpose()?;
    let interval_unit: IntervalUnit = command.every.into();

    // Monthly templates materialize on the anchor's day unless told otherwise.
    let day_of_month = match (command.day_of_month, interval_unit) {
        (Some(day), _) => Some(day),
        (None, IntervalUnit::Month) => Some(anchor_date.day()),
        (None, _) => None,
    };

    let template = repo
        .add_template(NewTemplateData {
            kind: command.kind.into(),
            description: command.description,
            counterparty: command.counterparty,
            category: command.category,
            payment_method: command.payment_method,
            amount_cents,
            anchor_date,
            interval_unit,
            interval_count: command.interval,
            day_of_month,
            max_occurrences: command.count,
        })
        .await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    println!(
        "{} Created template: {}",
        "✓".style(success_style),
        template.description.bright_white().bold()
    );
    println!("  {} Template ID: {}", "→".style(info_style), template.id.to_string().yellow());
    println!("  {} Anchored on {}", "→".style(info_style), anchor_date.to_string().cyan());
    if let Some(cents) = template.amount_cents {
        println!("  {} Amount: {}", "→".style(info_style), format_amount(cents));
    }
    if let Some(max) = template.max_occurrences {
        println!("  {} Ends after {} occurrences", "→".style(info_style), max);
    }
    println!(
        "   {} Preview upcoming: cadence preview {}",
        "•".bright_black(),
        &template.id.to_string()[..8]
    );

    Ok(())
}
