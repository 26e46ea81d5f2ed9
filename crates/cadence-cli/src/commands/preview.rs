use anyhow::{anyhow, Result};
use cadence_core::date::CalendarDate;
use cadence_core::repository::Repository;

use crate::cli::PreviewCommand;
use crate::config::Config;
use crate::parser::parse_date;
use crate::util::resolve_template_id;
use crate::views::table::display_instances;

pub async fn preview_template(repo: &impl Repository, command: PreviewCommand, config: &Config) -> Result<()> {
    let template_id = resolve_template_id(repo, &command.id).await?;
    let (from, to) = resolve_window(command.from.as_deref(), command.to.as_deref(), config)?;

    let instances = repo.preview_template(template_id, from, to).await?;
    if command.json {
        println!("{}", serde_json::to_string_pretty(&instances)?);
    } else {
        display_instances(&instances);
    }
    Ok(())
}

/// `--from` defaults to today, `--to` to `from` plus the configured window.
pub fn resolve_window(from: Option<&str>, to: Option<&str>, config: &Config) -> Result<(CalendarDate, CalendarDate)> {
    let from = from.map(parse_date).transpose()?.unwrap_or_else(CalendarDate::today);
    let to = match to {
        Some(to) => parse_date(to)?,
        None => from
            .add_days(config.recurrence.default_window_days as i64)
            .ok_or_else(|| anyhow!("Window end is out of range"))?,
    };
    if from > to {
        return Err(anyhow!("--from {} is after --to {}", from, to));
    }
    Ok((from, to))
}
