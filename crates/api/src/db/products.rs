//! Product persistence.

use leafline_core::{EntityId, ProductId};

use super::{DocumentStore, RepositoryError, decode, encode};
use crate::models::Product;

const COLLECTION: &str = "products";

pub struct ProductRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Persist a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store rejects the write.
    pub async fn create(&self, product: &Product) -> Result<(), RepositoryError> {
        self.store
            .insert(COLLECTION, &product.id.to_string(), None, encode(product)?)
            .await
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.store
            .get(COLLECTION, &id.to_string())
            .await?
            .map(|body| decode(COLLECTION, body))
            .transpose()
    }

    /// All products listed by a vendor, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored document is invalid.
    pub async fn list_by_vendor(&self, vendor_id: EntityId) -> Result<Vec<Product>, RepositoryError> {
        let mut products = self
            .store
            .list_by_field(COLLECTION, "vendorId", &vendor_id.to_string())
            .await?
            .into_iter()
            .map(|body| decode::<Product>(COLLECTION, body))
            .collect::<Result<Vec<_>, _>>()?;
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }
}
