//! Version ledger handlers.
//!
//! GET /forms/:id/versions                  — newest first
//! GET /forms/:id/versions/:version_number

use std::sync::Arc;

use axum::extract::Path;
use axum::{Extension, Json};
use forms_core::model::FormVersionDocument;
use forms_core::FormService;
use uuid::Uuid;

use crate::error::AppError;

pub async fn list(
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FormVersionDocument>>, AppError> {
    Ok(Json(service.list_versions(id).await?))
}

pub async fn get(
    Extension(service): Extension<Arc<FormService>>,
    Path((id, version_number)): Path<(Uuid, u32)>,
) -> Result<Json<FormVersionDocument>, AppError> {
    Ok(Json(service.get_version(id, version_number).await?))
}
