//! Postgres implementation of the store port.
//!
//! `PgFormStore` is a newtype over `PgPool`; each `begin` opens a real
//! database transaction that `PgFormTx` drives until commit or rollback.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use forms_core::model::{
    FormDefinition, FormMetadataDocument, FormSecret, FormStatus, FormVersionDocument,
    VersionSummary,
};
use forms_core::ports::{FormStore, FormTx, InsertOutcome};
use forms_core::{FormsError, Result};

// ── PgFormStore ───────────────────────────────────────────────

#[derive(Clone)]
pub struct PgFormStore {
    pool: PgPool,
}

impl PgFormStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FormStore for PgFormStore {
    async fn begin(&self) -> Result<Box<dyn FormTx>> {
        let tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        Ok(Box::new(PgFormTx { tx }))
    }
}

// ── PgFormTx ──────────────────────────────────────────────────

pub struct PgFormTx {
    tx: Transaction<'static, Postgres>,
}

fn version_column(version_number: u32) -> Result<i32> {
    i32::try_from(version_number)
        .map_err(|_| FormsError::InvalidInput(format!("version {version_number} out of range")))
}

fn version_number(column: i32) -> Result<u32> {
    u32::try_from(column)
        .map_err(|_| FormsError::Internal(anyhow!("negative version number {column} in store")))
}

#[async_trait]
impl FormTx for PgFormTx {
    // ── Definitions ───────────────────────────────────────────

    async fn get_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
    ) -> Result<Option<FormDefinition>> {
        let query = format!(
            "SELECT {col} FROM forms.form_definition WHERE id = $1",
            col = state.field()
        );
        let row = sqlx::query_scalar::<_, Option<Json<FormDefinition>>>(&query)
            .bind(form_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.flatten().map(|Json(def)| def))
    }

    async fn get_definition_for_update(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
    ) -> Result<Option<FormDefinition>> {
        let query = format!(
            "SELECT {col} FROM forms.form_definition WHERE id = $1 FOR UPDATE",
            col = state.field()
        );
        let row = sqlx::query_scalar::<_, Option<Json<FormDefinition>>>(&query)
            .bind(form_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.flatten().map(|Json(def)| def))
    }

    async fn upsert_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
        definition: &FormDefinition,
    ) -> Result<()> {
        let query = format!(
            r#"
            INSERT INTO forms.form_definition (id, {col})
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET {col} = EXCLUDED.{col}
            "#,
            col = state.field()
        );
        sqlx::query(&query)
            .bind(form_id)
            .bind(Json(definition))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn update_definition(
        &mut self,
        form_id: Uuid,
        state: FormStatus,
        definition: &FormDefinition,
    ) -> Result<u64> {
        let query = format!(
            "UPDATE forms.form_definition SET {col} = $2 WHERE id = $1",
            col = state.field()
        );
        let result = sqlx::query(&query)
            .bind(form_id)
            .bind(Json(definition))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    async fn remove_definition_state(&mut self, form_id: Uuid, state: FormStatus) -> Result<u64> {
        let query = format!(
            "UPDATE forms.form_definition SET {col} = NULL WHERE id = $1",
            col = state.field()
        );
        let result = sqlx::query(&query)
            .bind(form_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    async fn remove_definition(&mut self, form_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM forms.form_definition WHERE id = $1")
            .bind(form_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    // ── Metadata ──────────────────────────────────────────────

    async fn get_metadata(&mut self, form_id: Uuid) -> Result<Option<FormMetadataDocument>> {
        let row = sqlx::query_scalar::<_, Json<FormMetadataDocument>>(
            "SELECT document FROM forms.form_metadata WHERE id = $1",
        )
        .bind(form_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn get_metadata_for_update(
        &mut self,
        form_id: Uuid,
    ) -> Result<Option<FormMetadataDocument>> {
        let row = sqlx::query_scalar::<_, Json<FormMetadataDocument>>(
            "SELECT document FROM forms.form_metadata WHERE id = $1 FOR UPDATE",
        )
        .bind(form_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn get_metadata_by_slug(&mut self, slug: &str) -> Result<Option<FormMetadataDocument>> {
        let row = sqlx::query_scalar::<_, Json<FormMetadataDocument>>(
            "SELECT document FROM forms.form_metadata WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn list_metadata(&mut self) -> Result<Vec<FormMetadataDocument>> {
        let rows = sqlx::query_scalar::<_, Json<FormMetadataDocument>>(
            "SELECT document FROM forms.form_metadata ORDER BY updated_at DESC",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn insert_metadata(&mut self, doc: &FormMetadataDocument) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO forms.form_metadata (id, slug, document, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(doc.id)
        .bind(&doc.slug)
        .bind(Json(doc))
        .bind(doc.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(match result.rows_affected() {
            0 => InsertOutcome::DuplicateKey,
            _ => InsertOutcome::Inserted,
        })
    }

    async fn replace_metadata(&mut self, doc: &FormMetadataDocument) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE forms.form_metadata
            SET slug = $2, document = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(doc.id)
        .bind(&doc.slug)
        .bind(Json(doc))
        .bind(doc.updated_at)
        .execute(&mut *self.tx)
        .await;
        match result {
            Ok(done) => Ok(done.rows_affected()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                FormsError::Conflict(format!("form with slug '{}' already exists", doc.slug)),
            ),
            Err(e) => Err(anyhow!(e).into()),
        }
    }

    async fn increment_version_number(&mut self, form_id: Uuid) -> Result<Option<u32>> {
        let next = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE forms.form_metadata
            SET document = jsonb_set(
                document,
                '{lastVersionNumber}',
                to_jsonb(COALESCE((document->>'lastVersionNumber')::int, 0) + 1)
            )
            WHERE id = $1
            RETURNING (document->>'lastVersionNumber')::int
            "#,
        )
        .bind(form_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        next.map(version_number).transpose()
    }

    async fn remove_metadata(&mut self, form_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM forms.form_metadata WHERE id = $1")
            .bind(form_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    // ── Versions ──────────────────────────────────────────────

    async fn insert_version(&mut self, version: &FormVersionDocument) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO forms.form_versions (form_id, version_number, document, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (form_id, version_number) DO NOTHING
            "#,
        )
        .bind(version.form_id)
        .bind(version_column(version.version_number)?)
        .bind(Json(version))
        .bind(version.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(match result.rows_affected() {
            0 => InsertOutcome::DuplicateKey,
            _ => InsertOutcome::Inserted,
        })
    }

    async fn get_version(
        &mut self,
        form_id: Uuid,
        version_number: u32,
    ) -> Result<Option<FormVersionDocument>> {
        let row = sqlx::query_scalar::<_, Json<FormVersionDocument>>(
            r#"
            SELECT document FROM forms.form_versions
            WHERE form_id = $1 AND version_number = $2
            "#,
        )
        .bind(form_id)
        .bind(version_column(version_number)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|Json(v)| v))
    }

    async fn list_versions(&mut self, form_id: Uuid) -> Result<Vec<FormVersionDocument>> {
        let rows = sqlx::query_scalar::<_, Json<FormVersionDocument>>(
            r#"
            SELECT document FROM forms.form_versions
            WHERE form_id = $1
            ORDER BY version_number DESC
            "#,
        )
        .bind(form_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(|Json(v)| v).collect())
    }

    async fn list_version_summaries(
        &mut self,
        form_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, VersionSummary)>> {
        let rows = sqlx::query_as::<_, (Uuid, i32, DateTime<Utc>)>(
            r#"
            SELECT form_id, version_number, created_at FROM forms.form_versions
            WHERE form_id = ANY($1)
            ORDER BY form_id, version_number
            "#,
        )
        .bind(form_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        rows.into_iter()
            .map(|(form_id, number, created_at)| {
                let summary = VersionSummary {
                    version_number: version_number(number)?,
                    created_at,
                };
                Ok((form_id, summary))
            })
            .collect()
    }

    async fn latest_version_number(&mut self, form_id: Uuid) -> Result<Option<u32>> {
        let latest = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(version_number) FROM forms.form_versions WHERE form_id = $1",
        )
        .bind(form_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        latest.map(version_number).transpose()
    }

    async fn remove_versions(&mut self, form_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM forms.form_versions WHERE form_id = $1")
            .bind(form_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    // ── Secrets ───────────────────────────────────────────────

    async fn get_secret(&mut self, form_id: Uuid, name: &str) -> Result<Option<FormSecret>> {
        let row = sqlx::query_scalar::<_, Json<FormSecret>>(
            "SELECT document FROM forms.form_secrets WHERE form_id = $1 AND name = $2",
        )
        .bind(form_id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(|Json(s)| s))
    }

    async fn upsert_secret(&mut self, secret: &FormSecret) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO forms.form_secrets (form_id, name, document)
            VALUES ($1, $2, $3)
            ON CONFLICT (form_id, name) DO UPDATE SET document = EXCLUDED.document
            "#,
        )
        .bind(secret.form_id)
        .bind(&secret.name)
        .bind(Json(secret))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn remove_secrets(&mut self, form_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM forms.form_secrets WHERE form_id = $1")
            .bind(form_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    // ── Lifecycle ─────────────────────────────────────────────

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_numbers_convert_within_range() {
        assert_eq!(version_column(7).unwrap(), 7);
        assert!(version_column(u32::MAX).is_err());
        assert_eq!(version_number(3).unwrap(), 3);
        assert!(matches!(version_number(-1), Err(FormsError::Internal(_))));
    }
}
