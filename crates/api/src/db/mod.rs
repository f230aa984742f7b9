//! Document persistence for marketplace records.
//!
//! Vendors, buyers, users, products, and orders are stored as JSON documents
//! grouped into collections. [`DocumentStore`] is the storage seam:
//!
//! - [`MemoryStore`] keeps everything in process (local development, tests)
//! - [`PgDocumentStore`] persists to `PostgreSQL` (`marketplace.document`)
//!
//! Typed repositories ([`EntityRepository`], [`UserRepository`],
//! [`ProductRepository`], [`OrderRepository`]) sit on top and convert between
//! models and documents.
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and are applied on startup
//! when a database URL is configured.

mod entities;
mod memory;
mod orders;
mod postgres;
mod products;
mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use entities::EntityRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use postgres::PgDocumentStore;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be decoded, or a model could not be encoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested document was not found.
    #[error("not found")]
    NotFound,

    /// Unique key violation (e.g., license already registered).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage for JSON documents keyed by `(collection, id)`.
///
/// `unique_key` is an optional natural key that must be unique within a
/// collection; inserting a duplicate fails with `RepositoryError::Conflict`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document.
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        unique_key: Option<&str>,
        body: Value,
    ) -> Result<(), RepositoryError>;

    /// Fetch a document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepositoryError>;

    /// Overwrite an existing document. Fails with `NotFound` if absent.
    async fn replace(&self, collection: &str, id: &str, body: Value)
    -> Result<(), RepositoryError>;

    /// Fetch a document by its unique key.
    async fn find_by_unique_key(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, RepositoryError>;

    /// All documents whose top-level string `field` equals `value`.
    async fn list_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, RepositoryError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

fn encode<T: Serialize>(model: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(model)
        .map_err(|e| RepositoryError::DataCorruption(format!("failed to encode document: {e}")))
}

fn decode<T: DeserializeOwned>(collection: &str, body: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(body).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid document in {collection}: {e}"))
    })
}
