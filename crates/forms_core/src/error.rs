use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::model::FormStatus;

pub type Result<T> = std::result::Result<T, FormsError>;

#[derive(Debug, Error)]
pub enum FormsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid form definition: {} issue(s)", .0.len())]
    InvalidDefinition(Vec<ValidationCause>),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FormsError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::InvalidDefinition(_) => 400,
            Self::InvalidInput(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Internal(_) => 500,
        }
    }

    /// Structured per-field causes, empty for every variant but `InvalidDefinition`.
    pub fn causes(&self) -> &[ValidationCause] {
        match self {
            Self::InvalidDefinition(causes) => causes,
            _ => &[],
        }
    }

    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} '{id}' not found"))
    }

    pub fn definition_not_found(form_id: Uuid, state: FormStatus) -> Self {
        Self::NotFound(format!("form definition '{form_id}' has no {state} state"))
    }

    pub fn form_is_live(form_id: Uuid) -> Self {
        Self::Conflict(format!("form '{form_id}' is live and cannot be modified"))
    }
}

/// A single schema violation found while validating a form definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationCause {
    /// Dotted path to the offending field, e.g. `pages.2.path`.
    pub path: String,
    /// Stable machine-readable code, `DEF:{CATEGORY}:{CODE}`.
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for ValidationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)
    }
}
