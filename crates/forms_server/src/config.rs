//! Environment configuration.
//!
//!   FORMS_DATABASE_URL        — Postgres connection string (optional; in-memory store when unset)
//!   FORMS_JWT_SECRET          — JWT HMAC secret (required)
//!   FORMS_BIND_ADDR           — listen address (default: 0.0.0.0:3000)
//!   FORMS_EVENTS_URL          — audit event endpoint (optional; events are logged when unset)
//!   FORMS_DB_MAX_CONNECTIONS  — pool size (default: 10)

use anyhow::{anyhow, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub events_url: Option<String>,
    pub db_max_connections: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret =
            get("FORMS_JWT_SECRET").ok_or_else(|| anyhow!("FORMS_JWT_SECRET must be set"))?;
        let db_max_connections = match get("FORMS_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow!("FORMS_DB_MAX_CONNECTIONS is not a number: {raw}"))?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url: get("FORMS_DATABASE_URL"),
            jwt_secret,
            bind_addr: get("FORMS_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            events_url: get("FORMS_EVENTS_URL"),
            db_max_connections,
        })
    }
}
