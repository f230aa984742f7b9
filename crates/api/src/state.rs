//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::MarketplaceConfig;
use crate::db::DocumentStore;
use crate::services::auth::TokenService;
use crate::services::license::{AuthorityError, LicenseVerifier};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the document store, the license
/// verifier, and the token service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MarketplaceConfig,
    store: Arc<dyn DocumentStore>,
    verifier: LicenseVerifier,
    tokens: TokenService,
}

impl AppState {
    /// Create application state, building the verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError` if the licensing authority client cannot be
    /// created.
    pub fn new(
        config: MarketplaceConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, AuthorityError> {
        let verifier = LicenseVerifier::from_config(&config.license_authority)?;
        Ok(Self::with_verifier(config, store, verifier))
    }

    /// Create application state with an explicit license verifier.
    #[must_use]
    pub fn with_verifier(
        config: MarketplaceConfig,
        store: Arc<dyn DocumentStore>,
        verifier: LicenseVerifier,
    ) -> Self {
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                verifier,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MarketplaceConfig {
        &self.inner.config
    }

    /// The document store backing all repositories.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn verifier(&self) -> &LicenseVerifier {
        &self.inner.verifier
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }
}
