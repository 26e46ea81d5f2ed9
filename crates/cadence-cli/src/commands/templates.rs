use anyhow::Result;
use cadence_core::repository::Repository;

use crate::cli::TemplatesCommand;
use crate::views::table::display_templates;

pub async fn list_templates(repo: &impl Repository, command: TemplatesCommand) -> Result<()> {
    let templates = repo.find_templates(command.all).await?;
    display_templates(&templates);
    Ok(())
}
