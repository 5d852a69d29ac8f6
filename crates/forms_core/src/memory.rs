//! In-memory adapters for the store and publisher ports.
//!
//! Used by the test suites and by the server when no database URL is
//! configured. Transactions are serialised behind one async mutex: `begin`
//! takes an owned guard and a working copy of the state, `commit` writes the
//! copy back. A transaction must not be opened while the same task holds
//! another one.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{FormsError, Result};
use crate::events::AuditMessage;
use crate::model::{
    FormDefinition, FormMetadataDocument, FormSecret, FormStatus, FormVersionDocument,
    VersionSummary,
};
use crate::ports::{EventPublisher, FormStore, FormTx, InsertOutcome};

#[derive(Debug, Clone, Default)]
struct DefinitionRow {
    draft: Option<FormDefinition>,
    live: Option<FormDefinition>,
}

impl DefinitionRow {
    fn slot(&mut self, state: FormStatus) -> &mut Option<FormDefinition> {
        match state {
            FormStatus::Draft => &mut self.draft,
            FormStatus::Live => &mut self.live,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    definitions: BTreeMap<Uuid, DefinitionRow>,
    metadata: BTreeMap<Uuid, FormMetadataDocument>,
    versions: BTreeMap<(Uuid, u32), FormVersionDocument>,
    secrets: HashMap<(Uuid, String), FormSecret>,
}

// ── InMemoryFormStore ─────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryFormStore {
    state: Arc<Mutex<MemoryState>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write primitives invoked so far, committed or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FormStore for InMemoryFormStore {
    async fn begin(&self) -> Result<Box<dyn FormTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryTx {
            guard,
            working,
            writes: self.writes.clone(),
        }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    writes: Arc<AtomicUsize>,
}

impl InMemoryTx {
    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FormTx for InMemoryTx {
    async fn get_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
    ) -> Result<Option<FormDefinition>> {
        Ok(self
            .working
            .definitions
            .get_mut(&form_id)
            .and_then(|row| row.slot(state).clone()))
    }

    // Transactions already run one at a time, so a plain read holds the lock.
    async fn get_definition_for_update(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
    ) -> Result<Option<FormDefinition>> {
        self.get_definition(form_id, state).await
    }

    async fn upsert_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
        definition: &FormDefinition,
    ) -> Result<()> {
        self.record_write();
        let row = self.working.definitions.entry(form_id).or_default();
        *row.slot(state) = Some(definition.clone());
        Ok(())
    }

    async fn update_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
        definition: &FormDefinition,
    ) -> Result<u64> {
        self.record_write();
        match self.working.definitions.get_mut(&form_id) {
            Some(row) => {
                *row.slot(state) = Some(definition.clone());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn remove_definition_state(&mut self, form_id: Uuid, state: FormStatus) -> Result<u64> {
        self.record_write();
        match self.working.definitions.get_mut(&form_id) {
            Some(row) => {
                *row.slot(state) = None;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn remove_definition(&mut self, form_id: Uuid) -> Result<u64> {
        self.record_write();
        Ok(self.working.definitions.remove(&form_id).map_or(0, |_| 1))
    }

    async fn get_metadata(&mut self, form_id: Uuid) -> Result<Option<FormMetadataDocument>> {
        Ok(self.working.metadata.get(&form_id).cloned())
    }

    async fn get_metadata_for_update(
        &mut self,
        form_id: Uuid,
    ) -> Result<Option<FormMetadataDocument>> {
        self.get_metadata(form_id).await
    }

    async fn get_metadata_by_slug(&mut self, slug: &str) -> Result<Option<FormMetadataDocument>> {
        Ok(self
            .working
            .metadata
            .values()
            .find(|doc| doc.slug == slug)
            .cloned())
    }

    async fn list_metadata(&mut self) -> Result<Vec<FormMetadataDocument>> {
        Ok(self.working.metadata.values().cloned().collect())
    }

    async fn insert_metadata(&mut self, doc: &FormMetadataDocument) -> Result<InsertOutcome> {
        self.record_write();
        let clash = self.working.metadata.contains_key(&doc.id)
            || self.working.metadata.values().any(|d| d.slug == doc.slug);
        if clash {
            return Ok(InsertOutcome::DuplicateKey);
        }
        self.working.metadata.insert(doc.id, doc.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn replace_metadata(&mut self, doc: &FormMetadataDocument) -> Result<u64> {
        self.record_write();
        let slug_taken = self
            .working
            .metadata
            .values()
            .any(|d| d.id != doc.id && d.slug == doc.slug);
        if slug_taken {
            return Err(FormsError::Conflict(format!(
                "form with slug '{}' already exists",
                doc.slug
            )));
        }
        match self.working.metadata.get_mut(&doc.id) {
            Some(existing) => {
                *existing = doc.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn increment_version_number(&mut self, form_id: Uuid) -> Result<Option<u32>> {
        self.record_write();
        Ok(self.working.metadata.get_mut(&form_id).map(|doc| {
            doc.last_version_number += 1;
            doc.last_version_number
        }))
    }

    async fn remove_metadata(&mut self, form_id: Uuid) -> Result<u64> {
        self.record_write();
        Ok(self.working.metadata.remove(&form_id).map_or(0, |_| 1))
    }

    async fn insert_version(&mut self, version: &FormVersionDocument) -> Result<InsertOutcome> {
        self.record_write();
        let key = (version.form_id, version.version_number);
        if self.working.versions.contains_key(&key) {
            return Ok(InsertOutcome::DuplicateKey);
        }
        self.working.versions.insert(key, version.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn get_version(
        &mut self,
        form_id: Uuid,
        version_number: u32,
    ) -> Result<Option<FormVersionDocument>> {
        Ok(self.working.versions.get(&(form_id, version_number)).cloned())
    }

    async fn list_versions(&mut self, form_id: Uuid) -> Result<Vec<FormVersionDocument>> {
        Ok(self
            .working
            .versions
            .range((form_id, 0)..=(form_id, u32::MAX))
            .rev()
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn list_version_summaries(
        &mut self,
        form_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, VersionSummary)>> {
        Ok(self
            .working
            .versions
            .values()
            .filter(|v| form_ids.contains(&v.form_id))
            .map(|v| (v.form_id, v.summary()))
            .collect())
    }

    async fn latest_version_number(&mut self, form_id: Uuid) -> Result<Option<u32>> {
        Ok(self
            .working
            .versions
            .range((form_id, 0)..=(form_id, u32::MAX))
            .next_back()
            .map(|((_, n), _)| *n))
    }

    async fn remove_versions(&mut self, form_id: Uuid) -> Result<u64> {
        self.record_write();
        let before = self.working.versions.len();
        self.working.versions.retain(|(id, _), _| *id != form_id);
        Ok((before - self.working.versions.len()) as u64)
    }

    async fn get_secret(&mut self, form_id: Uuid, name: &str) -> Result<Option<FormSecret>> {
        Ok(self
            .working
            .secrets
            .get(&(form_id, name.to_string()))
            .cloned())
    }

    async fn upsert_secret(&mut self, secret: &FormSecret) -> Result<()> {
        self.record_write();
        self.working
            .secrets
            .insert((secret.form_id, secret.name.clone()), secret.clone());
        Ok(())
    }

    async fn remove_secrets(&mut self, form_id: Uuid) -> Result<u64> {
        self.record_write();
        let before = self.working.secrets.len();
        self.working.secrets.retain(|(id, _), _| *id != form_id);
        Ok((before - self.working.secrets.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

// ── RecordingPublisher ────────────────────────────────────────

/// Publisher that keeps every message in memory. Can be switched to fail so
/// tests can observe a publish failure aborting the surrounding write.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<AuditMessage>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn messages(&self) -> Vec<AuditMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, message: &AuditMessage) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FormsError::Internal(anyhow!(
                "publish of {:?} rejected",
                message.event_type
            )));
        }
        self.messages.lock().await.push(message.clone());
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, FormMetadataInput};
    use chrono::Utc;

    fn doc(title: &str) -> FormMetadataDocument {
        FormMetadataDocument::new(
            FormMetadataInput {
                title: title.into(),
                organisation: "Defra".into(),
                team_name: "Forms".into(),
                team_email: "forms@example.gov.uk".into(),
                contact: None,
                submission_guidance: None,
                privacy_notice_type: None,
                privacy_notice_text: None,
                privacy_notice_url: None,
                notification_email: None,
                terms_and_conditions_agreed: None,
            },
            &Author::new("u1", "Ada"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = InMemoryFormStore::new();
        let d = doc("A");
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_metadata(&d).await.unwrap();
            tx.rollback().await.unwrap();
        }
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_metadata(&d).await.unwrap();
            drop(tx);
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_metadata(d.id).await.unwrap().is_none());
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = InMemoryFormStore::new();
        let d = doc("A");
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.insert_metadata(&d).await.unwrap(), InsertOutcome::Inserted);
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.get_metadata_by_slug("a").await.unwrap().map(|m| m.id),
            Some(d.id)
        );
        assert_eq!(
            tx.insert_metadata(&doc("A")).await.unwrap(),
            InsertOutcome::DuplicateKey
        );
    }

    #[tokio::test]
    async fn increment_is_sequential() {
        let store = InMemoryFormStore::new();
        let d = doc("A");
        let mut tx = store.begin().await.unwrap();
        tx.insert_metadata(&d).await.unwrap();
        assert_eq!(tx.increment_version_number(d.id).await.unwrap(), Some(1));
        assert_eq!(tx.increment_version_number(d.id).await.unwrap(), Some(2));
        assert_eq!(
            tx.increment_version_number(Uuid::new_v4()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn publisher_records_and_fails_on_demand() {
        use crate::events::{AuditEventType, AuditMessage};
        let publisher = RecordingPublisher::new();
        let author = Author::new("u1", "Ada");
        let message = AuditMessage::new(AuditEventType::FormCreated, Uuid::nil(), &author, None);
        publisher.publish(&message).await.unwrap();
        publisher.set_failing(true);
        assert!(publisher.publish(&message).await.is_err());
        assert_eq!(publisher.messages().await.len(), 1);
    }
}
