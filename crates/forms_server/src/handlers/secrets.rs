//! Per-form secrets. Values go in but never come back out over HTTP.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use forms_core::model::Author;
use forms_core::FormService;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SecretBody {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct SecretExists {
    pub exists: bool,
}

pub async fn exists(
    Extension(service): Extension<Arc<FormService>>,
    Path((id, name)): Path<(Uuid, String)>,
) -> Result<Json<SecretExists>, AppError> {
    let exists = service.secret_exists(id, &name).await?;
    Ok(Json(SecretExists { exists }))
}

pub async fn save(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path((id, name)): Path<(Uuid, String)>,
    Json(body): Json<SecretBody>,
) -> Result<StatusCode, AppError> {
    service.save_secret(id, &name, body.value, &author).await?;
    Ok(StatusCode::NO_CONTENT)
}
