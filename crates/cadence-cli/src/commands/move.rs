use anyhow::Result;
use cadence_core::models::MoveResult;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::MoveCommand;
use crate::parser::parse_date;
use crate::util::resolve_instance_ref;

pub async fn move_instance(repo: &impl Repository, command: MoveCommand) -> Result<()> {
    let instance = resolve_instance_ref(repo, &command.instance).await?;
    let new_date = parse_date(&command.date)?;

    match repo.move_instance(instance, new_date).await? {
        MoveResult::Record(record) => {
            println!("{} Moved '{}' to {}", "✓".green().bold(), record.description, record.date.to_string().cyan());
        }
        MoveResult::Reanchored { template, shifted_by_days } => {
            println!(
                "{} Shifted series '{}' by {} day(s)",
                "✓".green().bold(),
                template.description,
                shifted_by_days
            );
            if let Some(anchor) = template.anchor_date {
                println!("  {} New anchor: {}", "→".blue(), anchor.to_string().cyan());
            }
        }
    }
    Ok(())
}
