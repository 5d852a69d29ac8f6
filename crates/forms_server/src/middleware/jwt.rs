//! Bearer-token authentication.
//!
//! Validates an HS256 JWT and attaches the caller as an [`Author`] request
//! extension. `sub` becomes the author id, `name` the display name.

use axum::extract::{Extension, Request};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use forms_core::model::Author;
use forms_core::FormsError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Clone)]
pub struct JwtConfig {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not demanded.
        validation.required_spec_claims.clear();
        validation.required_spec_claims.insert("sub".to_string());
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn author_from_token(&self, token: &str) -> Result<Author, FormsError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| FormsError::Unauthorized(format!("invalid token: {e}")))?;
        Ok(data.claims.into_author())
    }
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
}

impl JwtClaims {
    fn into_author(self) -> Author {
        let display_name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.sub.clone());
        Author::new(self.sub, display_name)
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let author = match bearer_token(&req) {
        Some(token) => config.author_from_token(token),
        None => Err(FormsError::Unauthorized("missing bearer token".into())),
    };
    match author {
        Ok(author) => {
            tracing::debug!(author = %author.id, path = %req.uri().path(), "authenticated");
            req.extensions_mut().insert(author);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(path = %req.uri().path(), error = %e, "rejected request");
            AppError(e).into_response()
        }
    }
}
