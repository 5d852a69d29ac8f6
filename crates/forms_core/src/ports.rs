//! Port traits — the storage and publishing seams.
//!
//! `forms_core` never talks to a database directly. A `FormStore` hands out
//! transactions; every read and write of a logical operation goes through one
//! `FormTx`, which the service commits or rolls back. Adapters live in
//! `forms_postgres` (Postgres JSONB) and [`crate::memory`] (tests, local runs).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::events::AuditMessage;
use crate::model::{
    FormDefinition, FormMetadataDocument, FormSecret, FormStatus, FormVersionDocument,
    VersionSummary,
};

/// Outcome of an insert against a unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateKey,
}

#[async_trait]
pub trait FormStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn FormTx>>;
}

/// One open transaction. Nothing written through it is visible to other
/// transactions until [`FormTx::commit`]; dropping it uncommitted discards the
/// writes.
///
/// Update primitives report affected-row counts so callers can tell "no such
/// document" apart from "more than one matched".
#[async_trait]
pub trait FormTx: Send {
    // ── Definitions ───────────────────────────────────────────

    async fn get_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
    ) -> Result<Option<FormDefinition>>;

    /// Like [`FormTx::get_definition`], but holds the row lock until the
    /// transaction ends so concurrent writers queue behind this one.
    async fn get_definition_for_update(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
    ) -> Result<Option<FormDefinition>>;

    /// Create or overwrite one state of a form's definition row.
    async fn upsert_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
        definition: &FormDefinition,
    ) -> Result<()>;

    /// Overwrite an existing state; returns rows affected.
    async fn update_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
        definition: &FormDefinition,
    ) -> Result<u64>;

    /// Clear one state, leaving the row and the other state.
    async fn remove_definition_state(&mut self, form_id: Uuid, state: FormStatus) -> Result<u64>;

    async fn remove_definition(&mut self, form_id: Uuid) -> Result<u64>;

    // ── Metadata ──────────────────────────────────────────────

    async fn get_metadata(&mut self, form_id: Uuid) -> Result<Option<FormMetadataDocument>>;

    /// Read and lock one metadata row until the transaction ends.
    async fn get_metadata_for_update(
        &mut self,
        form_id: Uuid,
    ) -> Result<Option<FormMetadataDocument>>;

    async fn get_metadata_by_slug(&mut self, slug: &str) -> Result<Option<FormMetadataDocument>>;

    async fn list_metadata(&mut self) -> Result<Vec<FormMetadataDocument>>;

    async fn insert_metadata(&mut self, doc: &FormMetadataDocument) -> Result<InsertOutcome>;

    /// Overwrite an existing document; returns rows affected. A slug clash with
    /// another form surfaces as `Conflict`.
    async fn replace_metadata(&mut self, doc: &FormMetadataDocument) -> Result<u64>;

    /// Atomically bump `lastVersionNumber` and return the new value, or `None`
    /// when the form does not exist.
    async fn increment_version_number(&mut self, form_id: Uuid) -> Result<Option<u32>>;

    async fn remove_metadata(&mut self, form_id: Uuid) -> Result<u64>;

    // ── Versions ──────────────────────────────────────────────

    async fn insert_version(&mut self, version: &FormVersionDocument) -> Result<InsertOutcome>;

    async fn get_version(
        &mut self,
        form_id: Uuid,
        version_number: u32,
    ) -> Result<Option<FormVersionDocument>>;

    /// Newest first.
    async fn list_versions(&mut self, form_id: Uuid) -> Result<Vec<FormVersionDocument>>;

    /// Number and creation time of every version of the given forms, oldest
    /// first within each form. Snapshots are not loaded.
    async fn list_version_summaries(
        &mut self,
        form_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, VersionSummary)>>;

    async fn latest_version_number(&mut self, form_id: Uuid) -> Result<Option<u32>>;

    async fn remove_versions(&mut self, form_id: Uuid) -> Result<u64>;

    // ── Secrets ───────────────────────────────────────────────

    async fn get_secret(&mut self, form_id: Uuid, name: &str) -> Result<Option<FormSecret>>;

    async fn upsert_secret(&mut self, secret: &FormSecret) -> Result<()>;

    async fn remove_secrets(&mut self, form_id: Uuid) -> Result<u64>;

    // ── Lifecycle ─────────────────────────────────────────────

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Outbound audit channel. Returns the transport's message id.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, message: &AuditMessage) -> Result<String>;
}
