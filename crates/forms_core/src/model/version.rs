//! Version ledger entries and per-form secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::definition::{FormDefinition, FormStatus};
use super::metadata::{Author, FormMetadataDocument, VersionSummary};

/// Why a ledger entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    FormCreated,
    DraftUpdated,
    DefinitionReplaced,
    LiveCreatedFromDraft,
    DraftCreatedFromLive,
    Migrated,
    TitleUpdated,
}

/// Denormalised subset of the metadata at the time the entry was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    pub title: String,
    pub slug: String,
    pub organisation: String,
    pub team_name: String,
    pub team_email: String,
}

impl From<&FormMetadataDocument> for VersionMetadata {
    fn from(doc: &FormMetadataDocument) -> Self {
        Self {
            title: doc.title.clone(),
            slug: doc.slug.clone(),
            organisation: doc.organisation.clone(),
            team_name: doc.team_name.clone(),
            team_email: doc.team_email.clone(),
        }
    }
}

/// One immutable snapshot in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormVersionDocument {
    pub form_id: Uuid,
    pub version_number: u32,
    pub form_definition: FormDefinition,
    pub metadata: VersionMetadata,
    pub status: FormStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Author,
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_description: Option<String>,
}

impl FormVersionDocument {
    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            version_number: self.version_number,
            created_at: self.created_at,
        }
    }
}

/// A named per-form secret. The value never leaves the service except to the
/// form runner; the designer API only learns whether it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSecret {
    pub form_id: Uuid,
    pub name: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Author,
}
