//! Form metadata handlers.
//!
//! GET    /forms             — filtered, sorted, paginated listing
//! POST   /forms             — create a form with an empty draft
//! GET    /forms/slug/:slug  — look up by slug
//! GET    /forms/:id         — metadata by id
//! PATCH  /forms/:id         — partial metadata update
//! DELETE /forms/:id         — delete a form that never went live

use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use forms_core::listing::{ListOptions, QueryResult, SortBy, SortOrder};
use forms_core::model::{Author, FormMetadataDocument, FormMetadataInput, FormMetadataPatch, FormStatus};
use forms_core::{FormService, FormsError};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// Raw listing query. Multi-valued filters arrive comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort_by: Option<SortBy>,
    pub order: Option<SortOrder>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub organisations: Option<String>,
    pub status: Option<String>,
}

fn split_csv(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl TryFrom<ListQuery> for ListOptions {
    type Error = FormsError;

    fn try_from(query: ListQuery) -> Result<Self, Self::Error> {
        let defaults = ListOptions::default();
        let status = split_csv(query.status.as_deref())
            .map(|s| {
                FormStatus::from_str(s)
                    .ok_or_else(|| FormsError::InvalidInput(format!("unknown status '{s}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListOptions {
            page: query.page.unwrap_or(defaults.page),
            per_page: query.per_page.unwrap_or(defaults.per_page),
            sort_by: query.sort_by.unwrap_or(defaults.sort_by),
            order: query.order.unwrap_or(defaults.order),
            title: query.title.filter(|t| !t.trim().is_empty()),
            author: query.author.filter(|a| !a.trim().is_empty()),
            organisations: split_csv(query.organisations.as_deref())
                .map(str::to_string)
                .collect(),
            status,
        })
    }
}

pub async fn list(
    Extension(service): Extension<Arc<FormService>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<QueryResult>, AppError> {
    let options = ListOptions::try_from(query)?;
    Ok(Json(service.list_forms(&options).await?))
}

pub async fn create(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Json(input): Json<FormMetadataInput>,
) -> Result<(StatusCode, Json<FormMetadataDocument>), AppError> {
    let doc = service.create_form(input, &author).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn get(
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormMetadataDocument>, AppError> {
    Ok(Json(service.get_form(id).await?))
}

pub async fn get_by_slug(
    Extension(service): Extension<Arc<FormService>>,
    Path(slug): Path<String>,
) -> Result<Json<FormMetadataDocument>, AppError> {
    Ok(Json(service.get_form_by_slug(&slug).await?))
}

pub async fn update(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<FormMetadataPatch>,
) -> Result<Json<FormMetadataDocument>, AppError> {
    Ok(Json(service.update_form_metadata(id, patch, &author).await?))
}

pub async fn delete(
    Extension(author): Extension<Author>,
    Extension(service): Extension<Arc<FormService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_form(id, &author).await?;
    Ok(StatusCode::NO_CONTENT)
}
