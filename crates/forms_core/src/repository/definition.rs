//! Form-definition repository.
//!
//! Every structural edit goes through [`modify`]: state gate, load, mutate,
//! validate, single-row write, return the post-image.

use uuid::Uuid;

use super::ensure_single;
use crate::error::{FormsError, Result};
use crate::model::{
    ComponentDef, ConditionWrapperV2, FormDefinition, FormStatus, List, Page, SectionAssignment,
};
use crate::mutation::{self, PageFieldsPatch};
use crate::ports::FormTx;
use crate::validation::validate_definition;

/// The structural edits the draft supports.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftChange {
    /// `position: None` places the page by the summary/payment rule.
    CreatePage {
        page: Page,
        position: Option<i64>,
    },
    UpdatePage {
        page_id: Uuid,
        page: Page,
    },
    UpdatePageFields {
        page_id: Uuid,
        fields: PageFieldsPatch,
    },
    DeletePage {
        page_id: Uuid,
    },
    ReorderPages {
        order: Vec<Uuid>,
    },
    CreateComponent {
        page_id: Uuid,
        component: ComponentDef,
        position: Option<i64>,
    },
    UpdateComponent {
        page_id: Uuid,
        component_id: Uuid,
        component: ComponentDef,
    },
    DeleteComponent {
        page_id: Uuid,
        component_id: Uuid,
    },
    ReorderComponents {
        page_id: Uuid,
        order: Vec<Uuid>,
    },
    CreateList {
        list: List,
    },
    UpdateList {
        list_id: Uuid,
        list: List,
    },
    DeleteList {
        list_id: Uuid,
    },
    CreateCondition {
        condition: ConditionWrapperV2,
    },
    UpdateCondition {
        condition_id: Uuid,
        condition: ConditionWrapperV2,
    },
    /// Unassigns the condition from every page, then removes it.
    DeleteCondition {
        condition_id: Uuid,
    },
    AssignSections {
        sections: Vec<SectionAssignment>,
    },
    RepositionSummaryPage,
    AssignPageIds,
    AssignComponentIds,
    SetEngineV2,
}

impl DraftChange {
    /// Stable name used in logs and audit payloads.
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::CreatePage { .. } => "CREATE_PAGE",
            Self::UpdatePage { .. } => "UPDATE_PAGE",
            Self::UpdatePageFields { .. } => "UPDATE_PAGE_FIELDS",
            Self::DeletePage { .. } => "DELETE_PAGE",
            Self::ReorderPages { .. } => "REORDER_PAGES",
            Self::CreateComponent { .. } => "CREATE_COMPONENT",
            Self::UpdateComponent { .. } => "UPDATE_COMPONENT",
            Self::DeleteComponent { .. } => "DELETE_COMPONENT",
            Self::ReorderComponents { .. } => "REORDER_COMPONENTS",
            Self::CreateList { .. } => "CREATE_LIST",
            Self::UpdateList { .. } => "UPDATE_LIST",
            Self::DeleteList { .. } => "DELETE_LIST",
            Self::CreateCondition { .. } => "CREATE_CONDITION",
            Self::UpdateCondition { .. } => "UPDATE_CONDITION",
            Self::DeleteCondition { .. } => "DELETE_CONDITION",
            Self::AssignSections { .. } => "ASSIGN_SECTIONS",
            Self::RepositionSummaryPage => "REPOSITION_SUMMARY_PAGE",
            Self::AssignPageIds => "ASSIGN_PAGE_IDS",
            Self::AssignComponentIds => "ASSIGN_COMPONENT_IDS",
            Self::SetEngineV2 => "SET_ENGINE_V2",
        }
    }

    /// Apply the edit to a definition value.
    pub fn apply(self, def: FormDefinition) -> Result<FormDefinition> {
        match self {
            Self::CreatePage { page, position } => {
                let position = position.or_else(|| mutation::page_insert_position(&def, &page));
                mutation::add_page(def, page, position)
            }
            Self::UpdatePage { page_id, page } => mutation::update_page(def, page_id, page),
            Self::UpdatePageFields { page_id, fields } => {
                mutation::update_page_fields(def, page_id, fields)
            }
            Self::DeletePage { page_id } => mutation::delete_page(def, page_id),
            Self::ReorderPages { order } => mutation::reorder_pages(def, &order),
            Self::CreateComponent {
                page_id,
                component,
                position,
            } => mutation::add_component(def, page_id, component, position),
            Self::UpdateComponent {
                page_id,
                component_id,
                component,
            } => mutation::update_component(def, page_id, component_id, component),
            Self::DeleteComponent {
                page_id,
                component_id,
            } => mutation::delete_component(def, page_id, component_id),
            Self::ReorderComponents { page_id, order } => {
                mutation::reorder_components(def, page_id, &order)
            }
            Self::CreateList { list } => mutation::add_list(def, list),
            Self::UpdateList { list_id, list } => mutation::update_list(def, list_id, list),
            Self::DeleteList { list_id } => mutation::delete_list(def, list_id),
            Self::CreateCondition { condition } => mutation::add_condition(def, condition),
            Self::UpdateCondition {
                condition_id,
                condition,
            } => mutation::update_condition(def, condition_id, condition),
            Self::DeleteCondition { condition_id } => {
                mutation::condition_index(&def, condition_id)?;
                let def = mutation::unassign_condition(def, condition_id)?;
                mutation::delete_condition(def, condition_id)
            }
            Self::AssignSections { sections } => mutation::assign_sections(def, sections),
            Self::RepositionSummaryPage => mutation::reposition_summary_page(def),
            Self::AssignPageIds => mutation::assign_page_ids(def),
            Self::AssignComponentIds => mutation::assign_component_ids(def),
            Self::SetEngineV2 => mutation::set_engine_v2(def),
        }
    }
}

// ── Reads ─────────────────────────────────────────────────────

pub async fn get(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    state: FormStatus,
) -> Result<FormDefinition> {
    tx.get_definition(form_id, state)
        .await?
        .ok_or_else(|| FormsError::definition_not_found(form_id, state))
}

async fn get_for_update(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    state: FormStatus,
) -> Result<FormDefinition> {
    tx.get_definition_for_update(form_id, state)
        .await?
        .ok_or_else(|| FormsError::definition_not_found(form_id, state))
}

// ── Writes ────────────────────────────────────────────────────

/// Load, mutate, validate and write back one state of a definition.
///
/// Live definitions are rejected before anything is read or written. The row
/// stays locked from the read to the end of the transaction, so concurrent
/// edits apply one after the other instead of overwriting each other.
pub async fn modify<F>(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    state: FormStatus,
    operation: &str,
    mutate: F,
) -> Result<FormDefinition>
where
    F: FnOnce(FormDefinition) -> Result<FormDefinition> + Send,
{
    if state == FormStatus::Live {
        return Err(FormsError::form_is_live(form_id));
    }
    let result = async {
        let current = get_for_update(tx, form_id, state).await?;
        let updated = mutate(current)?;
        validate_definition(&updated)?;
        let affected = tx.update_definition(form_id, state, &updated).await?;
        ensure_single(affected, "form definition", form_id)?;
        Ok(updated)
    }
    .await;
    result.inspect_err(|e| {
        tracing::warn!(operation, %form_id, error = %e, "definition update failed");
    })
}

/// Apply one structural edit to the given state (normally draft).
pub async fn apply_change(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    state: FormStatus,
    change: DraftChange,
) -> Result<FormDefinition> {
    let operation = change.request_type();
    modify(tx, form_id, state, operation, move |def| change.apply(def)).await
}

/// Write the initial draft of a new form.
pub async fn create_draft(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    definition: &FormDefinition,
) -> Result<()> {
    validate_definition(definition)?;
    tx.upsert_definition(form_id, FormStatus::Draft, definition)
        .await
}

/// Replace the draft wholesale (definition upload).
pub async fn replace_draft(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    definition: FormDefinition,
) -> Result<FormDefinition> {
    validate_definition(&definition)?;
    tx.upsert_definition(form_id, FormStatus::Draft, &definition)
        .await?;
    Ok(definition)
}

/// Copy draft to live and clear the draft.
pub async fn create_live_from_draft(tx: &mut dyn FormTx, form_id: Uuid) -> Result<FormDefinition> {
    let draft = get_for_update(tx, form_id, FormStatus::Draft).await?;
    validate_definition(&draft)?;
    tx.upsert_definition(form_id, FormStatus::Live, &draft)
        .await?;
    let affected = tx
        .remove_definition_state(form_id, FormStatus::Draft)
        .await?;
    ensure_single(affected, "form definition", form_id)?;
    Ok(draft)
}

/// Regenerate the draft from live.
pub async fn create_draft_from_live(tx: &mut dyn FormTx, form_id: Uuid) -> Result<FormDefinition> {
    let live = get(tx, form_id, FormStatus::Live).await?;
    tx.upsert_definition(form_id, FormStatus::Draft, &live)
        .await?;
    Ok(live)
}

/// Drop the draft state; live is untouched.
pub async fn delete_draft(tx: &mut dyn FormTx, form_id: Uuid) -> Result<()> {
    get(tx, form_id, FormStatus::Draft).await?;
    let affected = tx
        .remove_definition_state(form_id, FormStatus::Draft)
        .await?;
    ensure_single(affected, "form definition", form_id)
}

/// Keep the draft's `name` in step with the form title.
pub async fn update_name(
    tx: &mut dyn FormTx,
    form_id: Uuid,
    name: &str,
) -> Result<FormDefinition> {
    let name = name.to_string();
    modify(tx, form_id, FormStatus::Draft, "update_name", move |mut def| {
        def.name = name;
        Ok(def)
    })
    .await
}

pub async fn remove(tx: &mut dyn FormTx, form_id: Uuid) -> Result<()> {
    let affected = tx.remove_definition(form_id).await?;
    ensure_single(affected, "form definition", form_id)
}
