//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, RepositoryError};

#[derive(Default)]
struct Collection {
    documents: HashMap<String, Value>,
    /// unique key -> document id
    unique_keys: HashMap<String, String>,
}

/// A [`DocumentStore`] backed by hash maps behind a single lock.
///
/// The write lock makes the unique-key check and the insert atomic, so two
/// concurrent registrations of the same license cannot both succeed.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        unique_key: Option<&str>,
        body: Value,
    ) -> Result<(), RepositoryError> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_owned()).or_default();

        if coll.documents.contains_key(id) {
            return Err(RepositoryError::Conflict(format!(
                "{collection} document {id} already exists"
            )));
        }
        if let Some(key) = unique_key {
            if coll.unique_keys.contains_key(key) {
                return Err(RepositoryError::Conflict(format!(
                    "{collection} key {key} already exists"
                )));
            }
            coll.unique_keys.insert(key.to_owned(), id.to_owned());
        }
        coll.documents.insert(id.to_owned(), body);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|coll| coll.documents.get(id))
            .cloned())
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        body: Value,
    ) -> Result<(), RepositoryError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|coll| coll.documents.get_mut(id))
            .ok_or(RepositoryError::NotFound)?;
        *doc = body;
        Ok(())
    }

    async fn find_by_unique_key(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|coll| {
            coll.unique_keys
                .get(key)
                .and_then(|id| coll.documents.get(id))
                .cloned()
        }))
    }

    async fn list_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|coll| {
                coll.documents
                    .values()
                    .filter(|doc| doc.get(field).and_then(Value::as_str) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
