//! Order persistence.

use leafline_core::OrderId;

use super::{DocumentStore, RepositoryError, decode, encode};
use crate::models::Order;

const COLLECTION: &str = "orders";

pub struct OrderRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Persist a new order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store rejects the write.
    pub async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        self.store
            .insert(COLLECTION, &order.id.to_string(), None, encode(order)?)
            .await
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.store
            .get(COLLECTION, &id.to_string())
            .await?
            .map(|body| decode(COLLECTION, body))
            .transpose()
    }

    /// Save changes to an existing order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        self.store
            .replace(COLLECTION, &order.id.to_string(), encode(order)?)
            .await
    }
}
