//! Form metadata — the administrative record kept alongside a definition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slug::slugify;

/// The caller a change is attributed to. Derived from token claims at the
/// server boundary and attached to every mutation; never stored standalone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub display_name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Audit fields of one state (draft or live).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadataState {
    pub created_at: DateTime<Utc>,
    pub created_by: Author,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Author,
}

impl FormMetadataState {
    pub fn new(author: &Author, at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            created_by: author.clone(),
            updated_at: at,
            updated_by: author.clone(),
        }
    }

    fn touch(&mut self, author: &Author, at: DateTime<Utc>) {
        self.updated_at = at;
        self.updated_by = author.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactEmail {
    pub address: String,
    pub response_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactOnline {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadataContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<ContactEmail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<ContactOnline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyNoticeType {
    Link,
    Text,
}

/// Denormalised pointer to a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version_number: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadataDocument {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub organisation: String,
    pub team_name: String,
    pub team_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<FormMetadataContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_guidance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_notice_type: Option<PrivacyNoticeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_notice_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_notice_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions_agreed: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub created_by: Author,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<FormMetadataState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<FormMetadataState>,
    #[serde(default)]
    pub last_version_number: u32,
    #[serde(default)]
    pub versions: Vec<VersionSummary>,
}

impl FormMetadataDocument {
    /// A fresh draft-only form record.
    pub fn new(input: FormMetadataInput, author: &Author, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&input.title),
            title: input.title,
            organisation: input.organisation,
            team_name: input.team_name,
            team_email: input.team_email,
            contact: input.contact,
            submission_guidance: input.submission_guidance,
            privacy_notice_type: input.privacy_notice_type,
            privacy_notice_text: input.privacy_notice_text,
            privacy_notice_url: input.privacy_notice_url,
            notification_email: input.notification_email,
            terms_and_conditions_agreed: input.terms_and_conditions_agreed,
            created_at: at,
            created_by: author.clone(),
            updated_at: at,
            updated_by: author.clone(),
            draft: Some(FormMetadataState::new(author, at)),
            live: None,
            last_version_number: 0,
            versions: vec![],
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn has_draft(&self) -> bool {
        self.draft.is_some()
    }

    /// A privacy notice is usable when free text is given for the text type,
    /// or a URL is given otherwise.
    pub fn has_privacy_notice(&self) -> bool {
        match self.privacy_notice_type {
            Some(PrivacyNoticeType::Text) => self
                .privacy_notice_text
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty()),
            _ => self
                .privacy_notice_url
                .as_deref()
                .is_some_and(|u| !u.trim().is_empty()),
        }
    }
}

/// Fields accepted when creating a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadataInput {
    pub title: String,
    pub organisation: String,
    pub team_name: String,
    pub team_email: String,
    #[serde(default)]
    pub contact: Option<FormMetadataContact>,
    #[serde(default)]
    pub submission_guidance: Option<String>,
    #[serde(default)]
    pub privacy_notice_type: Option<PrivacyNoticeType>,
    #[serde(default)]
    pub privacy_notice_text: Option<String>,
    #[serde(default)]
    pub privacy_notice_url: Option<String>,
    #[serde(default)]
    pub notification_email: Option<String>,
    #[serde(default)]
    pub terms_and_conditions_agreed: Option<bool>,
}

/// Partial metadata update; only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<FormMetadataContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_guidance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_notice_type: Option<PrivacyNoticeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_notice_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_notice_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions_agreed: Option<bool>,
}

impl FormMetadataPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The same patch without the title, for the generic field-update path.
    pub fn without_title(&self) -> Self {
        Self {
            title: None,
            ..self.clone()
        }
    }
}

/// The writes a metadata document can undergo. Each variant maps to one
/// well-defined change of the document, applied by the repository in a single
/// exactly-one-row write.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataTransition {
    /// Draft published: live audit fields start now, draft is cleared.
    Promote,
    /// Draft regenerated from live.
    Demote,
    /// Field edits. A title change also moves the slug.
    Patch(FormMetadataPatch),
    /// The draft definition changed.
    DraftTouched,
    /// The draft was discarded; live is left alone.
    RemoveDraft,
    /// A ledger entry was appended.
    VersionAppended(VersionSummary),
}

impl MetadataTransition {
    pub fn apply(&self, doc: &mut FormMetadataDocument, author: &Author, at: DateTime<Utc>) {
        match self {
            Self::Promote => {
                doc.live = Some(FormMetadataState::new(author, at));
                doc.draft = None;
            }
            Self::Demote => {
                doc.draft = Some(FormMetadataState::new(author, at));
            }
            Self::Patch(patch) => {
                apply_patch(doc, patch);
                if let Some(draft) = doc.draft.as_mut() {
                    draft.touch(author, at);
                }
            }
            Self::DraftTouched => {
                if let Some(draft) = doc.draft.as_mut() {
                    draft.touch(author, at);
                }
            }
            Self::RemoveDraft => {
                doc.draft = None;
            }
            Self::VersionAppended(summary) => {
                doc.last_version_number = doc.last_version_number.max(summary.version_number);
                doc.versions.push(summary.clone());
                // The ledger is not an edit; audit fields stay as they are.
                return;
            }
        }
        doc.updated_at = at;
        doc.updated_by = author.clone();
    }
}

fn apply_patch(doc: &mut FormMetadataDocument, patch: &FormMetadataPatch) {
    if let Some(title) = &patch.title {
        doc.title = title.clone();
        doc.slug = slugify(title);
    }
    if let Some(v) = &patch.organisation {
        doc.organisation = v.clone();
    }
    if let Some(v) = &patch.team_name {
        doc.team_name = v.clone();
    }
    if let Some(v) = &patch.team_email {
        doc.team_email = v.clone();
    }
    if let Some(v) = &patch.contact {
        doc.contact = Some(v.clone());
    }
    if let Some(v) = &patch.submission_guidance {
        doc.submission_guidance = Some(v.clone());
    }
    if let Some(v) = patch.privacy_notice_type {
        doc.privacy_notice_type = Some(v);
    }
    if let Some(v) = &patch.privacy_notice_text {
        doc.privacy_notice_text = Some(v.clone());
    }
    if let Some(v) = &patch.privacy_notice_url {
        doc.privacy_notice_url = Some(v.clone());
    }
    if let Some(v) = &patch.notification_email {
        doc.notification_email = Some(v.clone());
    }
    if let Some(v) = patch.terms_and_conditions_agreed {
        doc.terms_and_conditions_agreed = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(title: &str) -> FormMetadataInput {
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
        }
    }

    fn author(name: &str) -> Author {
        Author::new(name.to_lowercase(), name)
    }

    #[test]
    fn new_document_is_draft_only() {
        let now = Utc::now();
        let doc = FormMetadataDocument::new(input("My Form"), &author("Ada"), now);
        assert_eq!(doc.slug, "my-form");
        assert!(doc.has_draft());
        assert!(!doc.is_live());
        assert_eq!(doc.last_version_number, 0);
    }

    #[test]
    fn promote_sets_live_and_clears_draft() {
        let t0 = Utc::now();
        let mut doc = FormMetadataDocument::new(input("A"), &author("Ada"), t0);
        let t1 = t0 + Duration::minutes(5);
        MetadataTransition::Promote.apply(&mut doc, &author("Bob"), t1);
        assert!(doc.draft.is_none());
        let live = doc.live.as_ref().unwrap();
        assert_eq!(live.created_at, t1);
        assert_eq!(live.created_by.display_name, "Bob");
        assert_eq!(doc.updated_at, t1);
    }

    #[test]
    fn demote_recreates_draft_without_touching_live() {
        let t0 = Utc::now();
        let mut doc = FormMetadataDocument::new(input("A"), &author("Ada"), t0);
        MetadataTransition::Promote.apply(&mut doc, &author("Ada"), t0);
        let live_before = doc.live.clone();
        MetadataTransition::Demote.apply(&mut doc, &author("Bob"), t0 + Duration::hours(1));
        assert!(doc.draft.is_some());
        assert_eq!(doc.live, live_before);
    }

    #[test]
    fn patch_updates_only_supplied_fields_and_moves_slug() {
        let t0 = Utc::now();
        let mut doc = FormMetadataDocument::new(input("Old title"), &author("Ada"), t0);
        let patch = FormMetadataPatch {
            title: Some("New Title".into()),
            notification_email: Some("out@example.gov.uk".into()),
            ..Default::default()
        };
        let t1 = t0 + Duration::seconds(30);
        MetadataTransition::Patch(patch).apply(&mut doc, &author("Bob"), t1);
        assert_eq!(doc.title, "New Title");
        assert_eq!(doc.slug, "new-title");
        assert_eq!(doc.organisation, "Defra");
        assert_eq!(doc.notification_email.as_deref(), Some("out@example.gov.uk"));
        assert_eq!(doc.draft.as_ref().unwrap().updated_at, t1);
        assert_eq!(doc.draft.as_ref().unwrap().created_at, t0);
    }

    #[test]
    fn remove_draft_keeps_live() {
        let t0 = Utc::now();
        let mut doc = FormMetadataDocument::new(input("A"), &author("Ada"), t0);
        MetadataTransition::Promote.apply(&mut doc, &author("Ada"), t0);
        MetadataTransition::Demote.apply(&mut doc, &author("Ada"), t0);
        MetadataTransition::RemoveDraft.apply(&mut doc, &author("Ada"), t0);
        assert!(doc.draft.is_none());
        assert!(doc.live.is_some());
    }

    #[test]
    fn version_appended_leaves_audit_fields() {
        let t0 = Utc::now();
        let mut doc = FormMetadataDocument::new(input("A"), &author("Ada"), t0);
        let summary = VersionSummary {
            version_number: 1,
            created_at: t0 + Duration::minutes(1),
        };
        MetadataTransition::VersionAppended(summary.clone()).apply(
            &mut doc,
            &author("Bob"),
            t0 + Duration::minutes(1),
        );
        assert_eq!(doc.last_version_number, 1);
        assert_eq!(doc.versions, vec![summary]);
        assert_eq!(doc.updated_at, t0);
        assert_eq!(doc.updated_by.display_name, "Ada");
    }

    #[test]
    fn privacy_notice_rules() {
        let mut doc = FormMetadataDocument::new(input("A"), &author("Ada"), Utc::now());
        assert!(!doc.has_privacy_notice());
        doc.privacy_notice_url = Some("https://example.gov.uk/privacy".into());
        assert!(doc.has_privacy_notice());
        doc.privacy_notice_type = Some(PrivacyNoticeType::Text);
        assert!(!doc.has_privacy_notice());
        doc.privacy_notice_text = Some("We keep your data for 7 years".into());
        assert!(doc.has_privacy_notice());
    }

    #[test]
    fn patch_without_title() {
        let patch = FormMetadataPatch {
            title: Some("T".into()),
            team_name: Some("Team".into()),
            ..Default::default()
        };
        let rest = patch.without_title();
        assert!(rest.title.is_none());
        assert_eq!(rest.team_name.as_deref(), Some("Team"));
        assert!(FormMetadataPatch::default().is_empty());
    }
}
