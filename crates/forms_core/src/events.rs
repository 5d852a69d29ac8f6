//! Audit events — schema-versioned messages published after each change.
//!
//! Mappers here are pure: they take before/after documents and build the
//! message. Publishing happens in the service, inside the transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::model::{Author, FormMetadataDocument};

pub const AUDIT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventCategory {
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    FormCreated,
    FormUpdated,
    FormTitleUpdated,
    FormLiveCreatedFromDraft,
    FormDraftCreatedFromLive,
    FormDraftDeleted,
    FormMigrated,
    FormJsonUploaded,
    FormDeleted,
    FormSecretSaved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMessage {
    pub schema_version: u32,
    pub category: AuditEventCategory,
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    pub entity_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub message_created_at: DateTime<Utc>,
}

impl AuditMessage {
    pub fn new(
        event_type: AuditEventType,
        entity_id: Uuid,
        author: &Author,
        data: Option<Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            schema_version: AUDIT_SCHEMA_VERSION,
            category: AuditEventCategory::Form,
            event_type,
            entity_id,
            created_at: now,
            created_by: author.clone(),
            data,
            message_created_at: now,
        }
    }
}

/// One changed metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub previous: Value,
    pub new: Value,
}

/// Payload carried in `AuditMessage::data` for form events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormEventData {
    pub form_id: Uuid,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

impl FormEventData {
    fn of(meta: &FormMetadataDocument) -> Self {
        Self {
            form_id: meta.id,
            slug: meta.slug.clone(),
            title: meta.title.clone(),
            request_type: None,
            secret_name: None,
            changes: vec![],
        }
    }
}

fn message(event_type: AuditEventType, data: FormEventData, author: &Author) -> AuditMessage {
    let entity_id = data.form_id;
    // FormEventData holds only strings, uuids and json values.
    let data = serde_json::to_value(data).ok();
    AuditMessage::new(event_type, entity_id, author, data)
}

/// Fields whose edits are reported by the generic update event. `title` has its
/// own event and is excluded.
const TRACKED_FIELDS: &[&str] = &[
    "organisation",
    "teamName",
    "teamEmail",
    "contact",
    "submissionGuidance",
    "privacyNoticeType",
    "privacyNoticeText",
    "privacyNoticeUrl",
    "notificationEmail",
    "termsAndConditionsAgreed",
];

/// Field-level diff of two metadata documents.
pub fn diff_metadata(before: &FormMetadataDocument, after: &FormMetadataDocument) -> Vec<FieldChange> {
    let (Ok(before), Ok(after)) = (serde_json::to_value(before), serde_json::to_value(after)) else {
        return vec![];
    };
    TRACKED_FIELDS
        .iter()
        .filter_map(|field| {
            let previous = before.get(*field).cloned().unwrap_or(Value::Null);
            let new = after.get(*field).cloned().unwrap_or(Value::Null);
            (previous != new).then(|| FieldChange {
                field: (*field).to_string(),
                previous,
                new,
            })
        })
        .collect()
}

// ── Mappers ───────────────────────────────────────────────────

pub fn form_created(meta: &FormMetadataDocument, author: &Author) -> AuditMessage {
    message(AuditEventType::FormCreated, FormEventData::of(meta), author)
}

/// Generic update event, or `None` when nothing tracked changed.
pub fn form_updated(
    before: &FormMetadataDocument,
    after: &FormMetadataDocument,
    author: &Author,
) -> Option<AuditMessage> {
    let changes = diff_metadata(before, after);
    if changes.is_empty() {
        return None;
    }
    let data = FormEventData {
        changes,
        ..FormEventData::of(after)
    };
    Some(message(AuditEventType::FormUpdated, data, author))
}

pub fn form_title_updated(
    before: &FormMetadataDocument,
    after: &FormMetadataDocument,
    author: &Author,
) -> AuditMessage {
    let data = FormEventData {
        changes: vec![FieldChange {
            field: "title".into(),
            previous: Value::String(before.title.clone()),
            new: Value::String(after.title.clone()),
        }],
        ..FormEventData::of(after)
    };
    message(AuditEventType::FormTitleUpdated, data, author)
}

/// A structural edit of the draft definition.
pub fn draft_changed(
    meta: &FormMetadataDocument,
    author: &Author,
    request_type: &str,
) -> AuditMessage {
    let data = FormEventData {
        request_type: Some(request_type.to_string()),
        ..FormEventData::of(meta)
    };
    message(AuditEventType::FormUpdated, data, author)
}

/// Events that carry only the form identity: publish, regenerate draft,
/// delete draft, migrate, upload, delete.
pub fn lifecycle(
    event_type: AuditEventType,
    meta: &FormMetadataDocument,
    author: &Author,
) -> AuditMessage {
    message(event_type, FormEventData::of(meta), author)
}

pub fn secret_saved(meta: &FormMetadataDocument, author: &Author, name: &str) -> AuditMessage {
    let data = FormEventData {
        secret_name: Some(name.to_string()),
        ..FormEventData::of(meta)
    };
    message(AuditEventType::FormSecretSaved, data, author)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FormMetadataInput, FormMetadataPatch, MetadataTransition};
    use serde_json::json;

    fn meta() -> FormMetadataDocument {
        FormMetadataDocument::new(
            FormMetadataInput {
                title: "My Form".into(),
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
            &author(),
            Utc::now(),
        )
    }

    fn author() -> Author {
        Author::new("u1", "Ada")
    }

    #[test]
    fn message_envelope_shape() {
        let msg = form_created(&meta(), &author());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["schemaVersion"], json!(1));
        assert_eq!(value["category"], json!("FORM"));
        assert_eq!(value["type"], json!("FORM_CREATED"));
        assert_eq!(value["data"]["slug"], json!("my-form"));
        assert!(value["data"].get("changes").is_none());
        assert!(value.get("messageCreatedAt").is_some());
    }

    #[test]
    fn generic_update_only_when_something_changed() {
        let before = meta();
        assert!(form_updated(&before, &before.clone(), &author()).is_none());

        let mut after = before.clone();
        MetadataTransition::Patch(FormMetadataPatch {
            team_name: Some("Platform".into()),
            ..Default::default()
        })
        .apply(&mut after, &author(), Utc::now());
        let msg = form_updated(&before, &after, &author()).unwrap();
        assert_eq!(msg.event_type, AuditEventType::FormUpdated);
        let data: FormEventData = serde_json::from_value(msg.data.unwrap()).unwrap();
        assert_eq!(
            data.changes,
            vec![FieldChange {
                field: "teamName".into(),
                previous: json!("Forms"),
                new: json!("Platform"),
            }]
        );
    }

    #[test]
    fn audit_fields_alone_are_not_a_change() {
        let before = meta();
        let mut after = before.clone();
        MetadataTransition::DraftTouched.apply(&mut after, &Author::new("u2", "Bob"), Utc::now());
        assert!(diff_metadata(&before, &after).is_empty());
    }

    #[test]
    fn title_event_carries_before_and_after() {
        let before = meta();
        let mut after = before.clone();
        MetadataTransition::Patch(FormMetadataPatch {
            title: Some("Renamed".into()),
            ..Default::default()
        })
        .apply(&mut after, &author(), Utc::now());
        let msg = form_title_updated(&before, &after, &author());
        let data = msg.data.unwrap();
        assert_eq!(data["changes"][0]["previous"], json!("My Form"));
        assert_eq!(data["changes"][0]["new"], json!("Renamed"));
        assert_eq!(data["slug"], json!("renamed"));
    }

    #[test]
    fn draft_change_names_request_type() {
        let msg = draft_changed(&meta(), &author(), "CREATE_PAGE");
        assert_eq!(msg.data.unwrap()["requestType"], json!("CREATE_PAGE"));
    }
}
