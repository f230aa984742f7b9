//! Vendor and buyer persistence.

use leafline_core::{EntityId, LicenseId};

use super::{DocumentStore, RepositoryError, decode, encode};
use crate::models::BusinessEntity;

const COLLECTION: &str = "entities";

/// Repository for licensed business entities.
///
/// Entities are unique by state license id.
pub struct EntityRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> EntityRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Persist a new entity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the license is already registered.
    pub async fn create(&self, entity: &BusinessEntity) -> Result<(), RepositoryError> {
        self.store
            .insert(
                COLLECTION,
                &entity.id().to_string(),
                Some(entity.license_id().as_str()),
                encode(entity)?,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => RepositoryError::Conflict(format!(
                    "license {} is already registered",
                    entity.license_id()
                )),
                other => other,
            })
    }

    /// Get an entity by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get(&self, id: EntityId) -> Result<Option<BusinessEntity>, RepositoryError> {
        self.store
            .get(COLLECTION, &id.to_string())
            .await?
            .map(|body| decode(COLLECTION, body))
            .transpose()
    }

    /// Get an entity by its state license id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get_by_license(
        &self,
        license_id: &LicenseId,
    ) -> Result<Option<BusinessEntity>, RepositoryError> {
        self.store
            .find_by_unique_key(COLLECTION, license_id.as_str())
            .await?
            .map(|body| decode(COLLECTION, body))
            .transpose()
    }

    /// Save changes to an existing entity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entity does not exist.
    pub async fn update(&self, entity: &BusinessEntity) -> Result<(), RepositoryError> {
        self.store
            .replace(COLLECTION, &entity.id().to_string(), encode(entity)?)
            .await
    }
}
