//! Router construction for the forms server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post, put},
    Extension, Router,
};
use forms_core::FormService;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<FormService>, jwt_config: JwtConfig) -> Router {
    let draft = "/forms/:id/definition/draft";

    // Routes that require JWT authentication
    let protected = Router::new()
        // Metadata
        .route(
            "/forms",
            get(handlers::forms::list).post(handlers::forms::create),
        )
        .route("/forms/slug/:slug", get(handlers::forms::get_by_slug))
        .route(
            "/forms/:id",
            get(handlers::forms::get)
                .patch(handlers::forms::update)
                .delete(handlers::forms::delete),
        )
        // Lifecycle
        .route("/forms/:id/create-live", post(handlers::lifecycle::create_live))
        .route(
            "/forms/:id/create-draft-from-live",
            post(handlers::lifecycle::create_draft_from_live),
        )
        .route(
            "/forms/:id/definition/live",
            get(handlers::definition::get_live),
        )
        .route(
            draft,
            get(handlers::definition::get_draft)
                .put(handlers::definition::replace_draft)
                .delete(handlers::lifecycle::delete_draft),
        )
        .route(
            &format!("{draft}/migrate/v2"),
            post(handlers::lifecycle::migrate_v2),
        )
        // Pages
        .route(
            &format!("{draft}/pages/summary-controller/reposition"),
            post(handlers::definition::reposition_summary),
        )
        .route(
            &format!("{draft}/pages"),
            post(handlers::definition::create_page),
        )
        .route(
            &format!("{draft}/pages/order"),
            post(handlers::definition::reorder_pages),
        )
        .route(
            &format!("{draft}/pages/:page_id"),
            put(handlers::definition::update_page)
                .patch(handlers::definition::patch_page)
                .delete(handlers::definition::delete_page),
        )
        // Components
        .route(
            &format!("{draft}/pages/:page_id/components"),
            post(handlers::definition::create_component),
        )
        .route(
            &format!("{draft}/pages/:page_id/components/order"),
            post(handlers::definition::reorder_components),
        )
        .route(
            &format!("{draft}/pages/:page_id/components/:component_id"),
            put(handlers::definition::update_component)
                .delete(handlers::definition::delete_component),
        )
        // Lists
        .route(
            &format!("{draft}/lists"),
            post(handlers::definition::create_list),
        )
        .route(
            &format!("{draft}/lists/:list_id"),
            put(handlers::definition::update_list).delete(handlers::definition::delete_list),
        )
        // Conditions
        .route(
            &format!("{draft}/conditions"),
            post(handlers::definition::create_condition),
        )
        .route(
            &format!("{draft}/conditions/:condition_id"),
            put(handlers::definition::update_condition)
                .delete(handlers::definition::delete_condition),
        )
        // Sections
        .route(
            &format!("{draft}/sections"),
            get(handlers::definition::get_sections).put(handlers::definition::assign_sections),
        )
        // Versions
        .route("/forms/:id/versions", get(handlers::versions::list))
        .route(
            "/forms/:id/versions/:version_number",
            get(handlers::versions::get),
        )
        // Secrets
        .route(
            "/forms/:id/secrets/:name/exists",
            get(handlers::secrets::exists),
        )
        .route("/forms/:id/secrets/:name", put(handlers::secrets::save))
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    public
        .merge(protected)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}
