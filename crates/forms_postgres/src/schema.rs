//! Table layout for the forms document store.
//!
//! Every record is kept whole as JSONB. Key columns sit alongside the
//! document so uniqueness (slug, version number, secret name) is enforced by
//! the database rather than by read-then-write checks.

use anyhow::anyhow;
use sqlx::PgPool;

use forms_core::Result;

pub const SCHEMA_SQL: &str = r#"
CREATE SCHEMA IF NOT EXISTS forms;

CREATE TABLE IF NOT EXISTS forms.form_metadata (
    id          uuid PRIMARY KEY,
    slug        text NOT NULL UNIQUE,
    document    jsonb NOT NULL,
    updated_at  timestamptz NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS forms.form_definition (
    id     uuid PRIMARY KEY,
    draft  jsonb,
    live   jsonb
);

CREATE TABLE IF NOT EXISTS forms.form_versions (
    form_id         uuid NOT NULL,
    version_number  integer NOT NULL,
    document        jsonb NOT NULL,
    created_at      timestamptz NOT NULL,
    PRIMARY KEY (form_id, version_number)
);

CREATE TABLE IF NOT EXISTS forms.form_secrets (
    form_id   uuid NOT NULL,
    name      text NOT NULL,
    document  jsonb NOT NULL,
    PRIMARY KEY (form_id, name)
);
"#;

/// Create the schema and tables if they are missing. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(|e| anyhow!(e))?;
    tracing::info!("forms schema ensured");
    Ok(())
}
