use anyhow::Result;
use cadence_core::repository::Repository;
use dialoguer::Confirm;

use crate::cli::StopCommand;
use crate::util::resolve_template_id;

pub async fn stop_template(repo: &impl Repository, command: StopCommand) -> Result<()> {
    let template_id = resolve_template_id(repo, &command.id).await?;
    let template = repo
        .find_template_by_id(template_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Template with ID '{}' not found.", template_id))?;

    if !template.active {
        println!("Template '{}' is already stopped.", template.description);
        return Ok(());
    }

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!("Stop recurring template '{}'?", template.description))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Stop cancelled.");
            return Ok(());
        }
    }

    let template = repo.deactivate_template(template_id).await?;
    println!("Stopped template: {}", template.description);
    Ok(())
}
