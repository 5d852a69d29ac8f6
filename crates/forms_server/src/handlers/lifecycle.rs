//! Draft/live lifecycle handlers.
//!
//! POST   /forms/:id/create-live                     — publish the draft
//! POST   /forms/:id/create-draft-from-live          — regenerate the draft
//! DELETE /forms/:id/definition/draft                — discard the draft of a live form
//! POST   /forms/:id/definition/draft/migrate/v2     — one-way V1 → V2 upgrade

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use forms_core::model::{Author, FormDefinition};
use forms_core::FormService;
use uuid::Uuid;

use crate::error::AppError;

pub async fn create_live(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormDefinition>, AppError> {
    Ok(Json(service.create_live_from_draft(id, &author).await?))
}

pub async fn create_draft_from_live(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormDefinition>, AppError> {
    Ok(Json(service.create_draft_from_live(id, &author).await?))
}

pub async fn delete_draft(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_draft(id, &author).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn migrate_v2(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormDefinition>, AppError> {
    Ok(Json(service.migrate_to_v2(id, &author).await?))
}
