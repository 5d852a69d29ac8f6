//! FormService — orchestration of repository steps into business operations.
//!
//! Every public operation opens one transaction, runs its repository steps,
//! appends to the version ledger, publishes the audit event and commits. On
//! any error the transaction is rolled back and the error is returned as is.
//! The V2 migration is the exception: each step commits on its own.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{FormsError, Result};
use crate::events::{self, AuditEventType, AuditMessage};
use crate::listing::{ListOptions, QueryResult};
use crate::model::{
    Author, ChangeType, FormDefinition, FormMetadataDocument, FormMetadataInput,
    FormMetadataPatch, FormSecret, FormStatus, FormVersionDocument, MetadataTransition,
    SectionResponse, VersionMetadata, VersionSummary,
};
use crate::mutation;
use crate::ports::{EventPublisher, FormStore, FormTx};
use crate::repository::definition::{self as definitions, DraftChange};
use crate::repository::{metadata, versions};
use crate::slug::slugify;

/// What to publish after a draft edit.
#[derive(Debug, Clone, Copy)]
enum ChangeEvent {
    /// Generic update naming the request type.
    DraftChanged,
    Lifecycle(AuditEventType),
    Silent,
}

pub struct FormService {
    store: Arc<dyn FormStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl FormService {
    pub fn new(store: Arc<dyn FormStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    // ── Plumbing ──────────────────────────────────────────────

    async fn begin(&self) -> Result<Box<dyn FormTx>> {
        self.store.begin().await
    }

    /// Commit on success; roll back, log and pass the error through otherwise.
    async fn finish<T>(
        &self,
        tx: Box<dyn FormTx>,
        result: Result<T>,
        operation: &str,
        form_id: Option<Uuid>,
    ) -> Result<T> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                tracing::error!(operation, form_id = ?form_id, error = %e, "operation failed, rolling back");
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(operation, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn publish(&self, message: AuditMessage) -> Result<()> {
        let message_id = self.publisher.publish(&message).await?;
        tracing::debug!(
            event = ?message.event_type,
            form_id = %message.entity_id,
            %message_id,
            "audit event published"
        );
        Ok(())
    }

    /// Write the next ledger entry for `meta` and record it on the metadata.
    #[allow(clippy::too_many_arguments)]
    async fn append_version(
        &self,
        tx: &mut dyn FormTx,
        meta: &FormMetadataDocument,
        definition: &FormDefinition,
        status: FormStatus,
        change_type: ChangeType,
        change_description: Option<String>,
        author: &Author,
    ) -> Result<FormMetadataDocument> {
        let version_number = metadata::get_and_increment_version_number(tx, meta.id).await?;
        let now = Utc::now();
        let version = FormVersionDocument {
            form_id: meta.id,
            version_number,
            form_definition: definition.clone(),
            metadata: VersionMetadata::from(meta),
            status,
            created_at: now,
            created_by: author.clone(),
            change_type,
            change_description,
        };
        versions::create_version(tx, &version).await?;
        metadata::update(
            tx,
            meta.id,
            MetadataTransition::VersionAppended(version.summary()),
            author,
            now,
        )
        .await
    }

    // ── Form metadata ─────────────────────────────────────────

    pub async fn create_form(
        &self,
        input: FormMetadataInput,
        author: &Author,
    ) -> Result<FormMetadataDocument> {
        if slugify(&input.title).is_empty() {
            return Err(FormsError::InvalidInput(
                "form title must contain at least one letter or digit".into(),
            ));
        }
        let meta = FormMetadataDocument::new(input, author, Utc::now());
        let form_id = meta.id;
        let mut tx = self.begin().await?;
        let result = self.create_form_in_tx(tx.as_mut(), meta, author).await;
        self.finish(tx, result, "create_form", Some(form_id)).await
    }

    async fn create_form_in_tx(
        &self,
        tx: &mut dyn FormTx,
        meta: FormMetadataDocument,
        author: &Author,
    ) -> Result<FormMetadataDocument> {
        metadata::create(tx, &meta).await?;
        let definition = FormDefinition::empty(&meta.title);
        definitions::create_draft(tx, meta.id, &definition).await?;
        let meta = self
            .append_version(
                tx,
                &meta,
                &definition,
                FormStatus::Draft,
                ChangeType::FormCreated,
                None,
                author,
            )
            .await?;
        self.publish(events::form_created(&meta, author)).await?;
        tracing::info!(form_id = %meta.id, slug = %meta.slug, "form created");
        Ok(meta)
    }

    pub async fn get_form(&self, form_id: Uuid) -> Result<FormMetadataDocument> {
        let mut tx = self.begin().await?;
        let result = metadata::get(tx.as_mut(), form_id).await;
        self.finish(tx, result, "get_form", Some(form_id)).await
    }

    pub async fn get_form_by_slug(&self, slug: &str) -> Result<FormMetadataDocument> {
        let mut tx = self.begin().await?;
        let result = metadata::get_by_slug(tx.as_mut(), slug).await;
        self.finish(tx, result, "get_form_by_slug", None).await
    }

    pub async fn list_forms(&self, options: &ListOptions) -> Result<QueryResult> {
        let mut tx = self.begin().await?;
        let result = self.list_forms_in_tx(tx.as_mut(), options).await;
        self.finish(tx, result, "list_forms", None).await
    }

    async fn list_forms_in_tx(
        &self,
        tx: &mut dyn FormTx,
        options: &ListOptions,
    ) -> Result<QueryResult> {
        let mut result = metadata::list(tx, options).await?;
        let ids: Vec<Uuid> = result.data.iter().map(|d| d.id).collect();
        let mut summaries = versions::get_version_summaries_batch(tx, &ids).await?;
        for doc in &mut result.data {
            if let Some(versions) = summaries.remove(&doc.id) {
                doc.versions = versions;
            }
        }
        Ok(result)
    }

    /// Patch metadata fields. A title change also renames the draft
    /// definition, moves the slug and is refused once the form is live.
    pub async fn update_form_metadata(
        &self,
        form_id: Uuid,
        patch: FormMetadataPatch,
        author: &Author,
    ) -> Result<FormMetadataDocument> {
        let mut tx = self.begin().await?;
        let result = self
            .update_form_metadata_in_tx(tx.as_mut(), form_id, patch, author)
            .await;
        self.finish(tx, result, "update_form_metadata", Some(form_id))
            .await
    }

    async fn update_form_metadata_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        patch: FormMetadataPatch,
        author: &Author,
    ) -> Result<FormMetadataDocument> {
        let before = metadata::get_for_update(tx, form_id).await?;
        let title_changed = patch
            .title
            .as_deref()
            .is_some_and(|title| title != before.title);

        if title_changed {
            if before.is_live() {
                return Err(FormsError::Conflict(format!(
                    "form '{form_id}' is live, its title cannot be updated"
                )));
            }
            let title = patch.title.as_deref().unwrap_or_default();
            let slug = slugify(title);
            if slug.is_empty() {
                return Err(FormsError::InvalidInput(
                    "form title must contain at least one letter or digit".into(),
                ));
            }
            if let Some(existing) = tx.get_metadata_by_slug(&slug).await? {
                if existing.id != form_id {
                    return Err(FormsError::Conflict(format!(
                        "form with slug '{slug}' already exists"
                    )));
                }
            }
        }

        let patch = if title_changed {
            patch
        } else {
            patch.without_title()
        };
        let mut after = metadata::update(
            tx,
            form_id,
            MetadataTransition::Patch(patch),
            author,
            Utc::now(),
        )
        .await?;

        if title_changed {
            let definition = definitions::update_name(tx, form_id, &after.title).await?;
            after = self
                .append_version(
                    tx,
                    &after,
                    &definition,
                    FormStatus::Draft,
                    ChangeType::TitleUpdated,
                    Some(format!("title changed from '{}'", before.title)),
                    author,
                )
                .await?;
            self.publish(events::form_title_updated(&before, &after, author))
                .await?;
        }
        if let Some(message) = events::form_updated(&before, &after, author) {
            self.publish(message).await?;
        }
        Ok(after)
    }

    /// Delete a form that has never gone live, with its definition, ledger
    /// and secrets.
    pub async fn delete_form(&self, form_id: Uuid, author: &Author) -> Result<()> {
        let mut tx = self.begin().await?;
        let result = self.delete_form_in_tx(tx.as_mut(), form_id, author).await;
        self.finish(tx, result, "delete_form", Some(form_id)).await
    }

    async fn delete_form_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        author: &Author,
    ) -> Result<()> {
        let meta = metadata::get_for_update(tx, form_id).await?;
        if meta.is_live() {
            return Err(FormsError::Conflict(format!(
                "form '{form_id}' is already live and cannot be deleted"
            )));
        }
        metadata::remove(tx, form_id).await?;
        definitions::remove(tx, form_id).await?;
        let removed = versions::remove_versions_for_form(tx, form_id).await?;
        tx.remove_secrets(form_id).await?;
        self.publish(events::lifecycle(AuditEventType::FormDeleted, &meta, author))
            .await?;
        tracing::info!(%form_id, versions_removed = removed, "form deleted");
        Ok(())
    }

    // ── Definitions ───────────────────────────────────────────

    pub async fn get_definition(&self, form_id: Uuid, state: FormStatus) -> Result<FormDefinition> {
        let mut tx = self.begin().await?;
        let result = definitions::get(tx.as_mut(), form_id, state).await;
        self.finish(tx, result, "get_definition", Some(form_id)).await
    }

    pub async fn get_sections(&self, form_id: Uuid) -> Result<Vec<SectionResponse>> {
        let definition = self.get_definition(form_id, FormStatus::Draft).await?;
        Ok(mutation::build_sections_response(&definition))
    }

    /// Apply one structural edit to the draft.
    pub async fn change_draft(
        &self,
        form_id: Uuid,
        change: DraftChange,
        author: &Author,
    ) -> Result<FormDefinition> {
        let operation = change.request_type();
        let mut tx = self.begin().await?;
        let result = self
            .change_draft_in_tx(
                tx.as_mut(),
                form_id,
                change,
                author,
                ChangeType::DraftUpdated,
                ChangeEvent::DraftChanged,
            )
            .await;
        self.finish(tx, result, operation, Some(form_id)).await
    }

    async fn change_draft_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        change: DraftChange,
        author: &Author,
        change_type: ChangeType,
        event: ChangeEvent,
    ) -> Result<FormDefinition> {
        metadata::get_for_update(tx, form_id).await?;
        let request_type = change.request_type();
        let definition =
            definitions::apply_change(tx, form_id, FormStatus::Draft, change).await?;
        let meta = metadata::update(
            tx,
            form_id,
            MetadataTransition::DraftTouched,
            author,
            Utc::now(),
        )
        .await?;
        let meta = self
            .append_version(
                tx,
                &meta,
                &definition,
                FormStatus::Draft,
                change_type,
                Some(request_type.to_string()),
                author,
            )
            .await?;
        match event {
            ChangeEvent::DraftChanged => {
                self.publish(events::draft_changed(&meta, author, request_type))
                    .await?
            }
            ChangeEvent::Lifecycle(event_type) => {
                self.publish(events::lifecycle(event_type, &meta, author))
                    .await?
            }
            ChangeEvent::Silent => {}
        }
        Ok(definition)
    }

    pub async fn reposition_summary_page(
        &self,
        form_id: Uuid,
        author: &Author,
    ) -> Result<FormDefinition> {
        self.change_draft(form_id, DraftChange::RepositionSummaryPage, author)
            .await
    }

    /// Upload a whole draft definition.
    pub async fn replace_draft_definition(
        &self,
        form_id: Uuid,
        definition: FormDefinition,
        author: &Author,
    ) -> Result<FormDefinition> {
        let mut tx = self.begin().await?;
        let result = self
            .replace_draft_in_tx(tx.as_mut(), form_id, definition, author)
            .await;
        self.finish(tx, result, "replace_draft_definition", Some(form_id))
            .await
    }

    async fn replace_draft_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        definition: FormDefinition,
        author: &Author,
    ) -> Result<FormDefinition> {
        let meta = metadata::get_for_update(tx, form_id).await?;
        let definition = definitions::replace_draft(tx, form_id, definition).await?;
        let transition = if meta.has_draft() {
            MetadataTransition::DraftTouched
        } else {
            MetadataTransition::Demote
        };
        let meta = metadata::update(tx, form_id, transition, author, Utc::now()).await?;
        let meta = self
            .append_version(
                tx,
                &meta,
                &definition,
                FormStatus::Draft,
                ChangeType::DefinitionReplaced,
                None,
                author,
            )
            .await?;
        self.publish(events::lifecycle(
            AuditEventType::FormJsonUploaded,
            &meta,
            author,
        ))
        .await?;
        Ok(definition)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Publish the draft. The checklist runs on plain reads before the write
    /// transaction opens; the draft is validated again under the row lock.
    pub async fn create_live_from_draft(
        &self,
        form_id: Uuid,
        author: &Author,
    ) -> Result<FormDefinition> {
        let meta = self.get_form(form_id).await?;
        let draft = self.get_definition(form_id, FormStatus::Draft).await?;
        check_ready_to_publish(&meta, &draft)?;

        let mut tx = self.begin().await?;
        let result = self
            .create_live_from_draft_in_tx(tx.as_mut(), form_id, author)
            .await;
        self.finish(tx, result, "create_live_from_draft", Some(form_id))
            .await
    }

    async fn create_live_from_draft_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        author: &Author,
    ) -> Result<FormDefinition> {
        metadata::get_for_update(tx, form_id).await?;
        let live = definitions::create_live_from_draft(tx, form_id).await?;
        let meta = metadata::update(
            tx,
            form_id,
            MetadataTransition::Promote,
            author,
            Utc::now(),
        )
        .await?;
        let meta = self
            .append_version(
                tx,
                &meta,
                &live,
                FormStatus::Live,
                ChangeType::LiveCreatedFromDraft,
                None,
                author,
            )
            .await?;
        self.publish(events::lifecycle(
            AuditEventType::FormLiveCreatedFromDraft,
            &meta,
            author,
        ))
        .await?;
        tracing::info!(%form_id, "form published to live");
        Ok(live)
    }

    pub async fn create_draft_from_live(
        &self,
        form_id: Uuid,
        author: &Author,
    ) -> Result<FormDefinition> {
        let mut tx = self.begin().await?;
        let result = self
            .create_draft_from_live_in_tx(tx.as_mut(), form_id, author)
            .await;
        self.finish(tx, result, "create_draft_from_live", Some(form_id))
            .await
    }

    async fn create_draft_from_live_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        author: &Author,
    ) -> Result<FormDefinition> {
        metadata::get_for_update(tx, form_id).await?;
        let draft = definitions::create_draft_from_live(tx, form_id).await?;
        let meta = metadata::update(
            tx,
            form_id,
            MetadataTransition::Demote,
            author,
            Utc::now(),
        )
        .await?;
        let meta = self
            .append_version(
                tx,
                &meta,
                &draft,
                FormStatus::Draft,
                ChangeType::DraftCreatedFromLive,
                None,
                author,
            )
            .await?;
        self.publish(events::lifecycle(
            AuditEventType::FormDraftCreatedFromLive,
            &meta,
            author,
        ))
        .await?;
        Ok(draft)
    }

    /// Discard the draft of a live form.
    pub async fn delete_draft(&self, form_id: Uuid, author: &Author) -> Result<()> {
        let mut tx = self.begin().await?;
        let result = self.delete_draft_in_tx(tx.as_mut(), form_id, author).await;
        self.finish(tx, result, "delete_draft", Some(form_id)).await
    }

    async fn delete_draft_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        author: &Author,
    ) -> Result<()> {
        let meta = metadata::get_for_update(tx, form_id).await?;
        if !meta.is_live() {
            return Err(FormsError::InvalidInput(format!(
                "form '{form_id}' has never been live, delete the form instead of its draft"
            )));
        }
        definitions::delete_draft(tx, form_id).await?;
        let meta = metadata::update(
            tx,
            form_id,
            MetadataTransition::RemoveDraft,
            author,
            Utc::now(),
        )
        .await?;
        self.publish(events::lifecycle(
            AuditEventType::FormDraftDeleted,
            &meta,
            author,
        ))
        .await
    }

    /// Upgrade a V1 draft to V2. Each step commits separately, so a failure
    /// leaves earlier steps in place. A V2 draft is returned unchanged.
    pub async fn migrate_to_v2(&self, form_id: Uuid, author: &Author) -> Result<FormDefinition> {
        let current = self.get_definition(form_id, FormStatus::Draft).await?;
        if current.is_v2() {
            return Ok(current);
        }

        let mut steps = Vec::with_capacity(4);
        if mutation::summary_page_misplaced(&current) {
            steps.push(DraftChange::RepositionSummaryPage);
        }
        steps.push(DraftChange::AssignPageIds);
        steps.push(DraftChange::AssignComponentIds);

        for step in steps {
            self.migration_step(form_id, step, author, ChangeEvent::Silent)
                .await?;
        }
        let migrated = self
            .migration_step(
                form_id,
                DraftChange::SetEngineV2,
                author,
                ChangeEvent::Lifecycle(AuditEventType::FormMigrated),
            )
            .await?;
        tracing::info!(%form_id, "draft migrated to v2");
        Ok(migrated)
    }

    async fn migration_step(
        &self,
        form_id: Uuid,
        step: DraftChange,
        author: &Author,
        event: ChangeEvent,
    ) -> Result<FormDefinition> {
        let operation = step.request_type();
        let mut tx = self.begin().await?;
        let result = self
            .change_draft_in_tx(tx.as_mut(), form_id, step, author, ChangeType::Migrated, event)
            .await;
        self.finish(tx, result, operation, Some(form_id)).await
    }

    // ── Versions ──────────────────────────────────────────────

    pub async fn list_versions(&self, form_id: Uuid) -> Result<Vec<FormVersionDocument>> {
        let mut tx = self.begin().await?;
        let result = async {
            metadata::get(tx.as_mut(), form_id).await?;
            versions::list_versions(tx.as_mut(), form_id).await
        }
        .await;
        self.finish(tx, result, "list_versions", Some(form_id)).await
    }

    pub async fn get_version(
        &self,
        form_id: Uuid,
        version_number: u32,
    ) -> Result<FormVersionDocument> {
        let mut tx = self.begin().await?;
        let result = versions::get_version(tx.as_mut(), form_id, version_number).await;
        self.finish(tx, result, "get_version", Some(form_id)).await
    }

    pub async fn get_latest_version_number(&self, form_id: Uuid) -> Result<u32> {
        let mut tx = self.begin().await?;
        let result = versions::get_latest_version_number(tx.as_mut(), form_id).await;
        self.finish(tx, result, "get_latest_version_number", Some(form_id))
            .await
    }

    pub async fn version_summaries(
        &self,
        form_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<VersionSummary>>> {
        let mut tx = self.begin().await?;
        let result = versions::get_version_summaries_batch(tx.as_mut(), form_ids).await;
        self.finish(tx, result, "version_summaries", None).await
    }

    // ── Secrets ───────────────────────────────────────────────

    pub async fn save_secret(
        &self,
        form_id: Uuid,
        name: &str,
        value: String,
        author: &Author,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(FormsError::InvalidInput("secret name must not be empty".into()));
        }
        let mut tx = self.begin().await?;
        let result = self
            .save_secret_in_tx(tx.as_mut(), form_id, name, value, author)
            .await;
        self.finish(tx, result, "save_secret", Some(form_id)).await
    }

    async fn save_secret_in_tx(
        &self,
        tx: &mut dyn FormTx,
        form_id: Uuid,
        name: &str,
        value: String,
        author: &Author,
    ) -> Result<()> {
        let meta = metadata::get(tx, form_id).await?;
        let secret = FormSecret {
            form_id,
            name: name.to_string(),
            value,
            updated_at: Utc::now(),
            updated_by: author.clone(),
        };
        tx.upsert_secret(&secret).await?;
        self.publish(events::secret_saved(&meta, author, name)).await
    }

    pub async fn get_secret(&self, form_id: Uuid, name: &str) -> Result<FormSecret> {
        let mut tx = self.begin().await?;
        let result = async {
            metadata::get(tx.as_mut(), form_id).await?;
            tx.get_secret(form_id, name)
                .await?
                .ok_or_else(|| FormsError::not_found("secret", name))
        }
        .await;
        self.finish(tx, result, "get_secret", Some(form_id)).await
    }

    /// Whether a secret is set, without revealing it.
    pub async fn secret_exists(&self, form_id: Uuid, name: &str) -> Result<bool> {
        let mut tx = self.begin().await?;
        let result = async {
            metadata::get(tx.as_mut(), form_id).await?;
            Ok(tx.get_secret(form_id, name).await?.is_some())
        }
        .await;
        self.finish(tx, result, "secret_exists", Some(form_id)).await
    }
}

/// Everything a draft needs before it can go live.
pub fn check_ready_to_publish(meta: &FormMetadataDocument, draft: &FormDefinition) -> Result<()> {
    let missing = |what: &str| Err(FormsError::InvalidInput(format!("missing {what}")));
    if meta.contact.is_none() {
        return missing("contact details");
    }
    if meta
        .submission_guidance
        .as_deref()
        .is_none_or(|g| g.trim().is_empty())
    {
        return missing("submission guidance");
    }
    if !meta.has_privacy_notice() {
        return missing("privacy notice");
    }
    if meta.terms_and_conditions_agreed != Some(true) {
        return Err(FormsError::InvalidInput(
            "terms and conditions have not been agreed".into(),
        ));
    }
    if meta
        .notification_email
        .as_deref()
        .is_none_or(|e| e.trim().is_empty())
    {
        return missing("output email");
    }
    if !draft.is_v2() && draft.start_page.is_none() {
        return missing("start page");
    }
    Ok(())
}
