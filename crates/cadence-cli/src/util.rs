use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::InstanceRef;
use cadence_core::repository::Repository;
use uuid::Uuid;

const MIN_SHORT_ID_LEN: usize = 2;

fn check_short_id(short_id: &str) -> Result<()> {
    if short_id.len() < MIN_SHORT_ID_LEN {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    Ok(())
}

pub async fn resolve_template_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    if let Ok(id) = short_id.parse::<Uuid>() {
        return Ok(id);
    }
    check_short_id(short_id)?;
    let templates = repo.find_templates_by_short_id_prefix(short_id).await?;
    match templates.len() {
        1 => Ok(templates[0].id),
        0 => Err(anyhow!(CoreError::NotFound(format!(
            "No template found with ID prefix '{}'",
            short_id
        )))),
        _ => {
            let template_info: Vec<(String, String)> = templates
                .into_iter()
                .map(|t| (t.id.to_string(), t.description))
                .collect();
            Err(anyhow!(CoreError::AmbiguousId(template_info)))
        }
    }
}

pub async fn resolve_record_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    if let Ok(id) = short_id.parse::<Uuid>() {
        return Ok(id);
    }
    check_short_id(short_id)?;
    let records = repo.find_records_by_short_id_prefix(short_id).await?;
    match records.len() {
        1 => Ok(records[0].id),
        0 => Err(anyhow!(CoreError::NotFound(format!(
            "No record found with ID prefix '{}'",
            short_id
        )))),
        _ => {
            let record_info: Vec<(String, String)> = records
                .into_iter()
                .map(|r| (r.id.to_string(), format!("{} on {}", r.description, r.date)))
                .collect();
            Err(anyhow!(CoreError::AmbiguousId(record_info)))
        }
    }
}

/// Resolves `<template>_instance_<n>` (template part may be a short prefix)
/// or a record id prefix.
pub async fn resolve_instance_ref(repo: &impl Repository, raw: &str) -> Result<InstanceRef> {
    if let Ok(instance) = raw.parse::<InstanceRef>() {
        return Ok(instance);
    }
    if let Some((template, index)) = raw.split_once("_instance_") {
        let sequence_index = index
            .parse()
            .map_err(|_| anyhow!(CoreError::InvalidInput(format!("Invalid instance number in '{}'", raw))))?;
        let template_id = resolve_template_id(repo, template).await?;
        return Ok(InstanceRef::Virtual { template_id, sequence_index });
    }
    let id = resolve_record_id(repo, raw).await?;
    Ok(InstanceRef::Concrete { id })
}
