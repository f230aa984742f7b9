//! `PostgreSQL`-backed document store.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{DocumentStore, RepositoryError};

/// A [`DocumentStore`] over the `marketplace.document` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::migrate::MigrateError` if a migration fails.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn map_write_error(e: sqlx::Error, collection: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{collection} document already exists"));
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        unique_key: Option<&str>,
        body: Value,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO marketplace.document (collection, id, unique_key, body)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(unique_key)
        .bind(Json(body))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, collection))?;

        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepositoryError> {
        let row: Option<(Json<Value>,)> = sqlx::query_as(
            r"
            SELECT body FROM marketplace.document
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(body),)| body))
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        body: Value,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE marketplace.document
            SET body = $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(body))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, collection))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_unique_key(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, RepositoryError> {
        let row: Option<(Json<Value>,)> = sqlx::query_as(
            r"
            SELECT body FROM marketplace.document
            WHERE collection = $1 AND unique_key = $2
            ",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(body),)| body))
    }

    async fn list_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, RepositoryError> {
        let rows: Vec<(Json<Value>,)> = sqlx::query_as(
            r"
            SELECT body FROM marketplace.document
            WHERE collection = $1 AND body ->> $2 = $3
            ORDER BY created_at
            ",
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(Json(body),)| body).collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
