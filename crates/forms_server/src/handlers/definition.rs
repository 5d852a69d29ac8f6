//! Draft and live definition handlers.
//!
//! Every structural edit maps to one [`DraftChange`] and returns the updated
//! draft definition.

use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use forms_core::model::{
    Author, ComponentDef, ConditionWrapperV2, FormDefinition, FormStatus, List, Page,
    SectionAssignment, SectionResponse,
};
use forms_core::mutation::{build_sections_response, PageFieldsPatch};
use forms_core::repository::definition::DraftChange;
use forms_core::FormService;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

type DefinitionResult = Result<Json<FormDefinition>, AppError>;

/// Optional insert position; negative counts from the end.
#[derive(Debug, Default, Deserialize)]
pub struct PositionQuery {
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SectionsBody {
    pub sections: Vec<SectionAssignment>,
}

async fn apply(
    service: &FormService,
    form_id: Uuid,
    change: DraftChange,
    author: &Author,
) -> DefinitionResult {
    Ok(Json(service.change_draft(form_id, change, author).await?))
}

// ── Whole definitions ─────────────────────────────────────────

pub async fn get_draft(
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> DefinitionResult {
    Ok(Json(service.get_definition(id, FormStatus::Draft).await?))
}

pub async fn get_live(
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> DefinitionResult {
    Ok(Json(service.get_definition(id, FormStatus::Live).await?))
}

pub async fn replace_draft(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
    Json(definition): Json<FormDefinition>,
) -> DefinitionResult {
    Ok(Json(
        service
            .replace_draft_definition(id, definition, &author)
            .await?,
    ))
}

pub async fn reposition_summary(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> DefinitionResult {
    Ok(Json(service.reposition_summary_page(id, &author).await?))
}

// ── Pages ─────────────────────────────────────────────────────

pub async fn create_page(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
    Query(at): Query<PositionQuery>,
    Json(page): Json<Page>,
) -> DefinitionResult {
    let change = DraftChange::CreatePage {
        page,
        position: at.position,
    };
    apply(&service, id, change, &author).await
}

pub async fn reorder_pages(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
    Json(order): Json<Vec<Uuid>>,
) -> DefinitionResult {
    apply(&service, id, DraftChange::ReorderPages { order }, &author).await
}

pub async fn update_page(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, page_id)): Path<(Uuid, Uuid)>,
    Json(page): Json<Page>,
) -> DefinitionResult {
    apply(&service, id, DraftChange::UpdatePage { page_id, page }, &author).await
}

pub async fn patch_page(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, page_id)): Path<(Uuid, Uuid)>,
    Json(fields): Json<PageFieldsPatch>,
) -> DefinitionResult {
    let change = DraftChange::UpdatePageFields { page_id, fields };
    apply(&service, id, change, &author).await
}

pub async fn delete_page(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, page_id)): Path<(Uuid, Uuid)>,
) -> DefinitionResult {
    apply(&service, id, DraftChange::DeletePage { page_id }, &author).await
}

// ── Components ────────────────────────────────────────────────

pub async fn create_component(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, page_id)): Path<(Uuid, Uuid)>,
    Query(at): Query<PositionQuery>,
    Json(component): Json<ComponentDef>,
) -> DefinitionResult {
    let change = DraftChange::CreateComponent {
        page_id,
        component,
        position: at.position,
    };
    apply(&service, id, change, &author).await
}

pub async fn reorder_components(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, page_id)): Path<(Uuid, Uuid)>,
    Json(order): Json<Vec<Uuid>>,
) -> DefinitionResult {
    let change = DraftChange::ReorderComponents { page_id, order };
    apply(&service, id, change, &author).await
}

pub async fn update_component(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, page_id, component_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(component): Json<ComponentDef>,
) -> DefinitionResult {
    let change = DraftChange::UpdateComponent {
        page_id,
        component_id,
        component,
    };
    apply(&service, id, change, &author).await
}

pub async fn delete_component(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, page_id, component_id)): Path<(Uuid, Uuid, Uuid)>,
) -> DefinitionResult {
    let change = DraftChange::DeleteComponent {
        page_id,
        component_id,
    };
    apply(&service, id, change, &author).await
}

// ── Lists ─────────────────────────────────────────────────────

pub async fn create_list(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
    Json(list): Json<List>,
) -> DefinitionResult {
    apply(&service, id, DraftChange::CreateList { list }, &author).await
}

pub async fn update_list(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, list_id)): Path<(Uuid, Uuid)>,
    Json(list): Json<List>,
) -> DefinitionResult {
    apply(&service, id, DraftChange::UpdateList { list_id, list }, &author).await
}

pub async fn delete_list(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, list_id)): Path<(Uuid, Uuid)>,
) -> DefinitionResult {
    apply(&service, id, DraftChange::DeleteList { list_id }, &author).await
}

// ── Conditions ────────────────────────────────────────────────

pub async fn create_condition(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
    Json(condition): Json<ConditionWrapperV2>,
) -> DefinitionResult {
    apply(&service, id, DraftChange::CreateCondition { condition }, &author).await
}

pub async fn update_condition(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, condition_id)): Path<(Uuid, Uuid)>,
    Json(condition): Json<ConditionWrapperV2>,
) -> DefinitionResult {
    let change = DraftChange::UpdateCondition {
        condition_id,
        condition,
    };
    apply(&service, id, change, &author).await
}

pub async fn delete_condition(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, condition_id)): Path<(Uuid, Uuid)>,
) -> DefinitionResult {
    let change = DraftChange::DeleteCondition { condition_id };
    apply(&service, id, change, &author).await
}

// ── Sections ──────────────────────────────────────────────────

pub async fn assign_sections(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SectionsBody>,
) -> Result<Json<Vec<SectionResponse>>, AppError> {
    let change = DraftChange::AssignSections {
        sections: body.sections,
    };
    let definition = service.change_draft(id, change, &author).await?;
    Ok(Json(build_sections_response(&definition)))
}

pub async fn get_sections(
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SectionResponse>>, AppError> {
    Ok(Json(service.get_sections(id).await?))
}
