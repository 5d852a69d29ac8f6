//! forms_server — REST server for the forms manager.
//!
//! Configuration is read from the environment (and a `.env` file when
//! present); see [`forms_server::config`].

use std::sync::Arc;

use anyhow::Context;
use forms_core::memory::InMemoryFormStore;
use forms_core::ports::{EventPublisher, FormStore};
use forms_core::FormService;
use forms_postgres::{ensure_schema, PgFormStore};
use forms_server::config::ServerConfig;
use forms_server::middleware::jwt::JwtConfig;
use forms_server::publisher::{HttpEventPublisher, TracingEventPublisher};
use forms_server::router::build_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,forms_server=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn FormStore> = match &config.database_url {
        Some(url) => {
            let store = PgFormStore::connect(url, config.db_max_connections)
                .await
                .context("failed to connect to database")?;
            ensure_schema(store.pool())
                .await
                .context("failed to ensure schema")?;
            tracing::info!("Connected to database");
            Arc::new(store)
        }
        None => {
            tracing::warn!("FORMS_DATABASE_URL not set, using in-memory store");
            Arc::new(InMemoryFormStore::new())
        }
    };

    let publisher: Arc<dyn EventPublisher> = match &config.events_url {
        Some(url) => {
            tracing::info!(%url, "publishing audit events over HTTP");
            Arc::new(HttpEventPublisher::new(url.clone()))
        }
        None => Arc::new(TracingEventPublisher),
    };

    let service = Arc::new(FormService::new(store, publisher));
    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(service, jwt_config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("forms_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
