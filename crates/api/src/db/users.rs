//! User persistence.

use leafline_core::{Email, UserId};

use super::{DocumentStore, RepositoryError, decode, encode};
use crate::models::User;

const COLLECTION: &str = "users";

/// Repository for user accounts. Users are unique by (normalized) email.
pub struct UserRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Persist a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        self.store
            .insert(
                COLLECTION,
                &user.id.to_string(),
                Some(user.email.as_str()),
                encode(user)?,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    RepositoryError::Conflict("email already exists".to_owned())
                }
                other => other,
            })
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.store
            .get(COLLECTION, &id.to_string())
            .await?
            .map(|body| decode(COLLECTION, body))
            .transpose()
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.store
            .find_by_unique_key(COLLECTION, email.as_str())
            .await?
            .map(|body| decode(COLLECTION, body))
            .transpose()
    }
}
