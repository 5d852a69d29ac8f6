//! Version ledger repository. Append-only: entries are never rewritten, and
//! only removed in bulk with their form.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{FormsError, Result};
use crate::model::{FormVersionDocument, VersionSummary};
use crate::ports::{FormTx, InsertOutcome};

pub async fn create_version(tx: &mut dyn FormTx, version: &FormVersionDocument) -> Result<()> {
    match tx.insert_version(version).await? {
        InsertOutcome::Inserted => Ok(()),
        InsertOutcome::DuplicateKey => Err(FormsError::Conflict(format!(
            "version {} of form '{}' already exists",
            version.version_number, version.form_id
        ))),
    }
}

/// Highest version number of a form, 0 when it has none.
pub async fn get_latest_version_number(tx: &mut dyn FormTx, form_id: Uuid) -> Result<u32> {
    Ok(tx.latest_version_number(form_id).await?.unwrap_or(0))
}

pub async fn get_version(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    version_number: u32,
) -> Result<FormVersionDocument> {
    tx.get_version(form_id, version_number)
        .await?
        .ok_or_else(|| {
            FormsError::not_found("version", format!("{form_id}/{version_number}"))
        })
}

/// Newest first.
pub async fn list_versions(tx: &mut dyn FormTx, form_id: Uuid) -> Result<Vec<FormVersionDocument>> {
    tx.list_versions(form_id).await
}

/// Summaries for each requested form, oldest first. Every id gets an entry,
/// empty when the form has no versions.
pub async fn get_version_summaries_batch(
    tx: &mut dyn FormTx,
    form_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<VersionSummary>>> {
    let mut batch: HashMap<Uuid, Vec<VersionSummary>> =
        form_ids.iter().map(|id| (*id, Vec::new())).collect();
    for (form_id, summary) in tx.list_version_summaries(form_ids).await? {
        batch.entry(form_id).or_default().push(summary);
    }
    Ok(batch)
}

pub async fn remove_versions_for_form(tx: &mut dyn FormTx, form_id: Uuid) -> Result<u64> {
    tx.remove_versions(form_id).await
}
