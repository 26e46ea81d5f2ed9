use anyhow::Result;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::SettleCommand;
use crate::util::resolve_record_id;

pub async fn settle_record(repo: &impl Repository, command: SettleCommand) -> Result<()> {
    let record_id = resolve_record_id(repo, &command.id).await?;
    let record = repo.settle_record(record_id).await?;
    println!("{} Settled: {} ({})", "✓".green().bold(), record.description, record.date);
    Ok(())
}
