//! HTTP mapping of domain errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forms_core::error::{FormsError, ValidationCause};
use serde::Serialize;

/// Handler error: a [`FormsError`] rendered as `{ message, causes? }`.
#[derive(Debug)]
pub struct AppError(pub FormsError);

impl From<FormsError> for AppError {
    fn from(e: FormsError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    causes: Vec<ValidationCause>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = ?self.0, "request failed");
        }
        let body = ErrorBody {
            message: self.0.to_string(),
            causes: self.0.causes().to_vec(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_domain_error() {
        let resp = AppError(FormsError::not_found("form", "x")).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = AppError(FormsError::Conflict("dup".into())).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = AppError(FormsError::Internal(anyhow::anyhow!("db down"))).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
