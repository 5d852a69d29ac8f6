//! Service-level flows against the in-memory store.
//!
//! Run with: cargo test -p forms_core --test service_flows

use std::sync::Arc;

use forms_core::events::AuditEventType;
use forms_core::memory::{InMemoryFormStore, RecordingPublisher};
use forms_core::model::*;
use forms_core::repository::definition::DraftChange;
use forms_core::{FormService, FormsError};
use serde_json::{json, Map};
use uuid::Uuid;

// ── Fixtures ───────────────────────────────────────────────────

struct Harness {
    service: FormService,
    store: InMemoryFormStore,
    publisher: Arc<RecordingPublisher>,
}

fn harness() -> Harness {
    let store = InMemoryFormStore::new();
    let publisher = Arc::new(RecordingPublisher::new());
    let service = FormService::new(Arc::new(store.clone()), publisher.clone());
    Harness {
        service,
        store,
        publisher,
    }
}

fn author() -> Author {
    Author::new("user-1", "Ada Lovelace")
}

fn input(title: &str) -> FormMetadataInput {
    FormMetadataInput {
        title: title.into(),
        organisation: "Defra".into(),
        team_name: "Forms team".into(),
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

/// Everything the publish checklist wants except the output email.
fn nearly_publishable() -> FormMetadataPatch {
    FormMetadataPatch {
        contact: Some(FormMetadataContact {
            phone: Some("0300 123 4567".into()),
            email: None,
            online: None,
        }),
        submission_guidance: Some("We'll reply within 5 days".into()),
        privacy_notice_url: Some("https://example.gov.uk/privacy".into()),
        terms_and_conditions_agreed: Some(true),
        ..Default::default()
    }
}

fn page(path: &str) -> Page {
    Page {
        id: None,
        path: path.into(),
        title: path.trim_start_matches('/').into(),
        controller: None,
        components: Some(vec![]),
        next: None,
        section: None,
        condition: None,
        repeat: None,
    }
}

fn text_field(name: &str) -> ComponentDef {
    ComponentDef {
        id: None,
        component_type: ComponentType::TextField,
        name: name.into(),
        title: name.into(),
        hint: None,
        content: None,
        list: None,
        options: Map::new(),
        schema: Map::new(),
    }
}

// ── End-to-end scenario ────────────────────────────────────────

#[tokio::test]
async fn create_publish_and_guard_live_form() {
    let h = harness();
    let a = author();

    let form = h.service.create_form(input("My Form"), &a).await.unwrap();
    assert_eq!(form.slug, "my-form");
    assert_eq!(form.last_version_number, 1);
    assert_eq!(
        h.service.get_form_by_slug("my-form").await.unwrap().id,
        form.id
    );

    let err = h.service.create_form(input("My Form"), &a).await.unwrap_err();
    assert!(matches!(err, FormsError::Conflict(_)));
    assert!(err.to_string().contains("already exists"));

    h.service
        .update_form_metadata(form.id, nearly_publishable(), &a)
        .await
        .unwrap();
    let writes_before_publish = h.store.write_count();
    let err = h
        .service
        .create_live_from_draft(form.id, &a)
        .await
        .unwrap_err();
    assert!(matches!(err, FormsError::InvalidInput(_)));
    assert!(err.to_string().contains("missing output email"));
    assert_eq!(h.store.write_count(), writes_before_publish);

    h.service
        .update_form_metadata(
            form.id,
            FormMetadataPatch {
                notification_email: Some("submissions@example.gov.uk".into()),
                ..Default::default()
            },
            &a,
        )
        .await
        .unwrap();
    h.service.create_live_from_draft(form.id, &a).await.unwrap();

    let live = h.service.get_form(form.id).await.unwrap();
    assert!(live.is_live());
    assert!(!live.has_draft());
    assert!(h
        .service
        .get_definition(form.id, FormStatus::Live)
        .await
        .is_ok());
    assert!(matches!(
        h.service.get_definition(form.id, FormStatus::Draft).await,
        Err(FormsError::NotFound(_))
    ));

    let err = h
        .service
        .update_form_metadata(
            form.id,
            FormMetadataPatch {
                title: Some("Renamed".into()),
                ..Default::default()
            },
            &a,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FormsError::Conflict(_)));
    assert!(err.to_string().contains("is live"));

    let err = h.service.delete_form(form.id, &a).await.unwrap_err();
    assert!(matches!(err, FormsError::Conflict(_)));
    assert!(err.to_string().contains("is already live"));

    let types: Vec<AuditEventType> = h
        .publisher
        .messages()
        .await
        .iter()
        .map(|m| m.event_type)
        .collect();
    assert_eq!(types.first(), Some(&AuditEventType::FormCreated));
    assert_eq!(types.last(), Some(&AuditEventType::FormLiveCreatedFromDraft));
}

// ── Version ledger ─────────────────────────────────────────────

#[tokio::test]
async fn version_numbers_are_gapless_per_form() {
    let h = harness();
    let a = author();
    let one = h.service.create_form(input("Form one"), &a).await.unwrap();
    let two = h.service.create_form(input("Form two"), &a).await.unwrap();

    for i in 0..3 {
        for form in [&one, &two] {
            h.service
                .change_draft(
                    form.id,
                    DraftChange::CreatePage {
                        page: page(&format!("/page-{i}")),
                        position: None,
                    },
                    &a,
                )
                .await
                .unwrap();
        }
    }

    for form in [&one, &two] {
        assert_eq!(
            h.service.get_latest_version_number(form.id).await.unwrap(),
            4
        );
        let mut numbers: Vec<u32> = h
            .service
            .list_versions(form.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        numbers.reverse();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    let v1 = h.service.get_version(one.id, 1).await.unwrap();
    assert_eq!(v1.change_type, ChangeType::FormCreated);
    let v4 = h.service.get_version(one.id, 4).await.unwrap();
    assert_eq!(v4.change_type, ChangeType::DraftUpdated);
    assert_eq!(v4.form_definition.pages.len(), 4);

    let meta = h.service.get_form(one.id).await.unwrap();
    assert_eq!(meta.last_version_number, 4);
    assert_eq!(meta.versions.len(), 4);
}

#[tokio::test]
async fn metadata_only_update_appends_no_version() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Quiet"), &a).await.unwrap();
    let updated = h
        .service
        .update_form_metadata(
            form.id,
            FormMetadataPatch {
                team_name: Some("Platform".into()),
                ..Default::default()
            },
            &a,
        )
        .await
        .unwrap();
    assert_eq!(updated.last_version_number, 1);
    let last = h.publisher.messages().await.pop().unwrap();
    assert_eq!(last.event_type, AuditEventType::FormUpdated);
}

#[tokio::test]
async fn title_update_cascades() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Old name"), &a).await.unwrap();
    let updated = h
        .service
        .update_form_metadata(
            form.id,
            FormMetadataPatch {
                title: Some("New name".into()),
                ..Default::default()
            },
            &a,
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "new-name");
    assert_eq!(updated.last_version_number, 2);
    let draft = h
        .service
        .get_definition(form.id, FormStatus::Draft)
        .await
        .unwrap();
    assert_eq!(draft.name, "New name");
    let version = h.service.get_version(form.id, 2).await.unwrap();
    assert_eq!(version.change_type, ChangeType::TitleUpdated);
    assert_eq!(version.metadata.slug, "new-name");

    let types: Vec<_> = h
        .publisher
        .messages()
        .await
        .iter()
        .map(|m| m.event_type)
        .collect();
    assert!(types.contains(&AuditEventType::FormTitleUpdated));
    assert!(!types.contains(&AuditEventType::FormUpdated));
}

// ── Transactions ───────────────────────────────────────────────

#[tokio::test]
async fn publish_failure_rolls_back_the_write() {
    let h = harness();
    let a = author();
    h.publisher.set_failing(true);
    let err = h.service.create_form(input("Doomed"), &a).await.unwrap_err();
    assert!(matches!(err, FormsError::Internal(_)));
    assert!(matches!(
        h.service.get_form_by_slug("doomed").await,
        Err(FormsError::NotFound(_))
    ));

    h.publisher.set_failing(false);
    let form = h.service.create_form(input("Doomed"), &a).await.unwrap();
    h.publisher.set_failing(true);
    let err = h
        .service
        .change_draft(
            form.id,
            DraftChange::CreatePage {
                page: page("/lost"),
                position: None,
            },
            &a,
        )
        .await;
    assert!(err.is_err());
    let draft = h
        .service
        .get_definition(form.id, FormStatus::Draft)
        .await
        .unwrap();
    assert_eq!(draft.pages.len(), 1);
    assert_eq!(
        h.service.get_latest_version_number(form.id).await.unwrap(),
        1
    );
}

// ── Draft edits ────────────────────────────────────────────────

#[tokio::test]
async fn condition_delete_clears_page_references() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Conditional"), &a).await.unwrap();

    let mut age_page = page("/age");
    age_page.components = Some(vec![text_field("age")]);
    let def = h
        .service
        .change_draft(
            form.id,
            DraftChange::CreatePage {
                page: age_page,
                position: None,
            },
            &a,
        )
        .await
        .unwrap();
    let component_id = def.pages[0].components()[0].id.unwrap();
    let def = h
        .service
        .change_draft(
            form.id,
            DraftChange::CreatePage {
                page: page("/adult"),
                position: None,
            },
            &a,
        )
        .await
        .unwrap();
    let adult_page = def.pages[1].id.unwrap();

    let condition_id = Uuid::new_v4();
    h.service
        .change_draft(
            form.id,
            DraftChange::CreateCondition {
                condition: ConditionWrapperV2 {
                    id: condition_id,
                    display_name: "Is adult".into(),
                    coordinator: None,
                    items: vec![ConditionItem {
                        id: Uuid::new_v4(),
                        component_id: Some(component_id),
                        condition_id: None,
                        operator: Some("isMoreThan".into()),
                        value: Some(json!(17)),
                    }],
                },
            },
            &a,
        )
        .await
        .unwrap();
    h.service
        .change_draft(
            form.id,
            DraftChange::UpdatePageFields {
                page_id: adult_page,
                fields: forms_core::mutation::PageFieldsPatch {
                    condition: Some(Some(condition_id.to_string())),
                    ..Default::default()
                },
            },
            &a,
        )
        .await
        .unwrap();

    let def = h
        .service
        .change_draft(form.id, DraftChange::DeleteCondition { condition_id }, &a)
        .await
        .unwrap();
    assert!(def
        .pages
        .iter()
        .all(|p| p.condition.as_deref() != Some(condition_id.to_string().as_str())));
    assert!(def.conditions.is_empty());
}

#[tokio::test]
async fn sections_round_trip_through_service() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Sectioned"), &a).await.unwrap();
    let mut ids = vec![];
    for path in ["/one", "/two", "/three"] {
        let def = h
            .service
            .change_draft(
                form.id,
                DraftChange::CreatePage {
                    page: page(path),
                    position: None,
                },
                &a,
            )
            .await
            .unwrap();
        ids.push(def.pages[def.pages.len() - 2].id.unwrap());
    }
    let assignments = vec![
        SectionAssignment {
            id: None,
            name: None,
            title: "About you".into(),
            hide_title: None,
            page_ids: vec![ids[2], ids[0]],
        },
        SectionAssignment {
            id: None,
            name: Some("business".into()),
            title: "Your business".into(),
            hide_title: Some(true),
            page_ids: vec![ids[1]],
        },
    ];
    h.service
        .change_draft(
            form.id,
            DraftChange::AssignSections {
                sections: assignments,
            },
            &a,
        )
        .await
        .unwrap();
    let sections = h.service.get_sections(form.id).await.unwrap();
    assert_eq!(sections[0].name, "about-you");
    let mut first = sections[0].page_ids.clone();
    first.sort();
    let mut want = vec![ids[2], ids[0]];
    want.sort();
    assert_eq!(first, want);
    assert_eq!(sections[1].page_ids, vec![ids[1]]);
}

#[tokio::test]
async fn reposition_summary_page_via_service() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Summary last"), &a).await.unwrap();
    let def = h
        .service
        .change_draft(
            form.id,
            DraftChange::CreatePage {
                page: page("/first"),
                position: Some(10),
            },
            &a,
        )
        .await
        .unwrap();
    assert!(!def.pages.last().unwrap().is_summary());
    let def = h
        .service
        .reposition_summary_page(form.id, &a)
        .await
        .unwrap();
    assert!(def.pages.last().unwrap().is_summary());
    assert_eq!(def.pages[0].path, "/first");
}

// ── Lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn draft_regeneration_and_deletion() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Cycle"), &a).await.unwrap();

    let err = h.service.delete_draft(form.id, &a).await.unwrap_err();
    assert!(matches!(err, FormsError::InvalidInput(_)));

    let mut ready = nearly_publishable();
    ready.notification_email = Some("out@example.gov.uk".into());
    h.service
        .update_form_metadata(form.id, ready, &a)
        .await
        .unwrap();
    let live = h.service.create_live_from_draft(form.id, &a).await.unwrap();

    let draft = h.service.create_draft_from_live(form.id, &a).await.unwrap();
    assert_eq!(draft, live);
    let meta = h.service.get_form(form.id).await.unwrap();
    assert!(meta.has_draft() && meta.is_live());
    let versions_before = meta.last_version_number;

    h.service.delete_draft(form.id, &a).await.unwrap();
    let meta = h.service.get_form(form.id).await.unwrap();
    assert!(!meta.has_draft());
    assert!(meta.is_live());
    assert_eq!(meta.last_version_number, versions_before);
}

#[tokio::test]
async fn migrate_v1_draft_to_v2() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Legacy"), &a).await.unwrap();
    let legacy: FormDefinition = serde_json::from_value(json!({
        "name": "Legacy",
        "startPage": "/first",
        "pages": [
            { "path": "/summary", "title": "Summary", "controller": "SummaryPageController" },
            { "path": "/first", "title": "First", "components": [
                { "type": "TextField", "name": "fullName", "title": "Full name" }
            ]}
        ]
    }))
    .unwrap();
    h.service
        .replace_draft_definition(form.id, legacy, &a)
        .await
        .unwrap();
    let before = h.service.get_latest_version_number(form.id).await.unwrap();

    let migrated = h.service.migrate_to_v2(form.id, &a).await.unwrap();
    assert!(migrated.is_v2());
    assert!(migrated.pages.last().unwrap().is_summary());
    assert!(migrated.pages.iter().all(|p| p.id.is_some()));
    assert!(migrated.components().all(|c| c.id.is_some()));
    assert_eq!(
        h.service.get_latest_version_number(form.id).await.unwrap(),
        before + 4
    );

    let again = h.service.migrate_to_v2(form.id, &a).await.unwrap();
    assert_eq!(again, migrated);
    assert_eq!(
        h.service.get_latest_version_number(form.id).await.unwrap(),
        before + 4
    );

    let migrated_events = h
        .publisher
        .messages()
        .await
        .iter()
        .filter(|m| m.event_type == AuditEventType::FormMigrated)
        .count();
    assert_eq!(migrated_events, 1);
}

#[tokio::test]
async fn delete_draft_only_form_removes_everything() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Temporary"), &a).await.unwrap();
    h.service
        .save_secret(form.id, "payment-api-key", "s3cret".into(), &a)
        .await
        .unwrap();
    h.service.delete_form(form.id, &a).await.unwrap();
    assert!(matches!(
        h.service.get_form(form.id).await,
        Err(FormsError::NotFound(_))
    ));
    assert_eq!(
        h.service.get_latest_version_number(form.id).await.unwrap(),
        0
    );
}

// ── Secrets ────────────────────────────────────────────────────

#[tokio::test]
async fn secrets_exist_without_exposing_value() {
    let h = harness();
    let a = author();
    let form = h.service.create_form(input("Payments"), &a).await.unwrap();
    assert!(!h
        .service
        .secret_exists(form.id, "payment-api-key")
        .await
        .unwrap());
    h.service
        .save_secret(form.id, "payment-api-key", "s3cret".into(), &a)
        .await
        .unwrap();
    assert!(h
        .service
        .secret_exists(form.id, "payment-api-key")
        .await
        .unwrap());
    let secret = h
        .service
        .get_secret(form.id, "payment-api-key")
        .await
        .unwrap();
    assert_eq!(secret.value, "s3cret");
    assert!(matches!(
        h.service.secret_exists(Uuid::new_v4(), "x").await,
        Err(FormsError::NotFound(_))
    ));
}
