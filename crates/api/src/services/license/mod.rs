//! External license verification.
//!
//! [`LicenseVerifier`] asks the state licensing authority whether a license is
//! active. Calls are retried with exponential backoff on transient failures,
//! guarded by a circuit breaker, and successful results are cached until the
//! cache TTL passes.

mod authority;
mod resilience;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use tracing::{instrument, warn};

use leafline_core::LicenseId;

pub use authority::{
    AuthorityError, HttpLicenseAuthority, LicenseAuthority, SandboxLicenseAuthority, Verification,
};
pub use resilience::{CircuitBreaker, RetryPolicy};

use crate::config::LicenseAuthorityConfig;

/// Why a license could not be verified.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerifyError {
    /// The authority could not be reached or answered with an error.
    #[error("external compliance API call failed: {0}")]
    ExternalService(String),

    /// Too many recent failures; calls are short-circuited.
    #[error("external compliance API is unavailable (circuit open)")]
    CircuitOpen,

    /// Unknown to the authority, or not active.
    #[error("license {0} is inactive or invalid based on state records")]
    Inactive(String),

    /// Known but past its expiration date. Carries the authority's record.
    #[error("license {} is expired based on state records", .0.license_id)]
    Expired(Verification),
}

struct Inner {
    authority: Box<dyn LicenseAuthority>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    cache: Cache<LicenseId, Verification>,
}

/// Verifies licenses with the licensing authority.
///
/// Cheap to clone; clones share the cache and circuit breaker.
#[derive(Clone)]
pub struct LicenseVerifier {
    inner: Arc<Inner>,
}

impl LicenseVerifier {
    /// Build a verifier around `authority`.
    #[must_use]
    pub fn new(
        authority: impl LicenseAuthority + 'static,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                authority: Box::new(authority),
                retry,
                breaker,
                cache: Cache::builder()
                    .max_capacity(10_000)
                    .time_to_live(cache_ttl)
                    .build(),
            }),
        }
    }

    /// Build a verifier from configuration: the HTTP authority when a base
    /// URL is set, the sandbox otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError` if the HTTP client cannot be created.
    pub fn from_config(config: &LicenseAuthorityConfig) -> Result<Self, AuthorityError> {
        let retry = RetryPolicy::with_max_retries(config.max_retries);
        let breaker = CircuitBreaker::new(config.failure_threshold, config.cooldown);

        Ok(match &config.base_url {
            Some(url) => {
                tracing::info!(authority = %url, "Using HTTP licensing authority");
                let authority =
                    HttpLicenseAuthority::new(url.clone(), config.api_key.clone(), config.timeout)?;
                Self::new(authority, retry, breaker, config.cache_ttl)
            }
            None => {
                warn!("LICENSE_AUTHORITY_URL not set, using sandbox licensing authority");
                Self::new(SandboxLicenseAuthority, retry, breaker, config.cache_ttl)
            }
        })
    }

    /// Verify that `license_id` is active and unexpired.
    ///
    /// # Errors
    ///
    /// - `VerifyError::ExternalService` / `CircuitOpen` when the authority is unavailable
    /// - `VerifyError::Expired` when the license has lapsed
    /// - `VerifyError::Inactive` when the license is unknown or inactive
    #[instrument(skip_all, fields(license_id = %license_id))]
    pub async fn verify(&self, license_id: &LicenseId) -> Result<Verification, VerifyError> {
        if let Some(cached) = self.inner.cache.get(license_id).await
            && cached.expiration_date > Utc::now()
        {
            tracing::debug!("License verification cache hit");
            return Ok(cached);
        }

        let record = self.lookup_with_retry(license_id).await?;
        let verification = evaluate(license_id, record)?;

        self.inner
            .cache
            .insert(license_id.clone(), verification.clone())
            .await;
        Ok(verification)
    }

    /// Verify, bypassing any cached result.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub async fn reverify(&self, license_id: &LicenseId) -> Result<Verification, VerifyError> {
        self.inner.cache.invalidate(license_id).await;
        self.verify(license_id).await
    }

    /// Whether calls are currently being short-circuited.
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        self.inner.breaker.is_open()
    }

    async fn lookup_with_retry(
        &self,
        license_id: &LicenseId,
    ) -> Result<Option<Verification>, VerifyError> {
        let inner = &self.inner;
        if !inner.breaker.allow() {
            warn!("Licensing authority circuit open, failing fast");
            return Err(VerifyError::CircuitOpen);
        }

        let mut attempt = 0;
        loop {
            match inner.authority.lookup(license_id).await {
                Ok(record) => {
                    inner.breaker.record_success();
                    return Ok(record);
                }
                Err(e) if e.is_transient() && attempt < inner.retry.max_retries => {
                    attempt += 1;
                    let delay = inner.retry.delay_for_attempt(attempt);
                    warn!(error = %e, attempt, ?delay, "Licensing authority call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        inner.breaker.record_failure();
                    }
                    tracing::error!(error = %e, attempts = attempt + 1, "Licensing authority call failed");
                    return Err(VerifyError::ExternalService(e.to_string()));
                }
            }
        }
    }
}

/// Turn an authority record into a verification outcome.
fn evaluate(
    license_id: &LicenseId,
    record: Option<Verification>,
) -> Result<Verification, VerifyError> {
    let Some(record) = record else {
        return Err(VerifyError::Inactive(license_id.to_string()));
    };

    if record.expiration_date <= Utc::now() {
        return Err(VerifyError::Expired(record));
    }
    if !record.is_active {
        return Err(VerifyError::Inactive(license_id.to_string()));
    }
    Ok(record)
}
