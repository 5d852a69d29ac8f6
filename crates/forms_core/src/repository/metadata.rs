//! Form-metadata repository.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ensure_single;
use crate::error::{FormsError, Result};
use crate::listing::{self, ListOptions, QueryResult};
use crate::model::{Author, FormMetadataDocument, MetadataTransition};
use crate::ports::{FormTx, InsertOutcome};

pub async fn get(tx: &mut dyn FormTx, form_id: Uuid) -> Result<FormMetadataDocument> {
    tx.get_metadata(form_id)
        .await?
        .ok_or_else(|| FormsError::not_found("form", form_id))
}

/// Read and lock the form's metadata row for the rest of the transaction.
pub async fn get_for_update(tx: &mut dyn FormTx, form_id: Uuid) -> Result<FormMetadataDocument> {
    tx.get_metadata_for_update(form_id)
        .await?
        .ok_or_else(|| FormsError::not_found("form", form_id))
}

pub async fn get_by_slug(tx: &mut dyn FormTx, slug: &str) -> Result<FormMetadataDocument> {
    tx.get_metadata_by_slug(slug)
        .await?
        .ok_or_else(|| FormsError::not_found("form", slug))
}

/// Insert a new form. A slug clash is a `Conflict`.
pub async fn create(tx: &mut dyn FormTx, doc: &FormMetadataDocument) -> Result<()> {
    match tx.insert_metadata(doc).await {
        Ok(InsertOutcome::Inserted) => Ok(()),
        Ok(InsertOutcome::DuplicateKey) => Err(FormsError::Conflict(format!(
            "form with slug '{}' already exists",
            doc.slug
        ))),
        Err(e) => {
            tracing::error!(operation = "create", form_id = %doc.id, error = %e, "metadata insert failed");
            Err(e)
        }
    }
}

/// Apply a transition to one form and return the post-image.
pub async fn update(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    transition: MetadataTransition,
    author: &Author,
    at: DateTime<Utc>,
) -> Result<FormMetadataDocument> {
    let mut doc = get_for_update(tx, form_id).await?;
    transition.apply(&mut doc, author, at);
    let affected = tx.replace_metadata(&doc).await?;
    ensure_single(affected, "form", form_id)?;
    get(tx, form_id).await
}

/// Hand out the next version number for a form.
pub async fn get_and_increment_version_number(tx: &mut dyn FormTx, form_id: Uuid) -> Result<u32> {
    tx.increment_version_number(form_id)
        .await?
        .ok_or_else(|| FormsError::not_found("form", form_id))
}

pub async fn remove(tx: &mut dyn FormTx, form_id: Uuid) -> Result<()> {
    let affected = tx.remove_metadata(form_id).await?;
    ensure_single(affected, "form", form_id)
}

/// Filtered, ranked, paginated listing with facets.
pub async fn list(tx: &mut dyn FormTx, options: &ListOptions) -> Result<QueryResult> {
    let docs = tx.list_metadata().await?;
    Ok(listing::query(docs, options))
}
