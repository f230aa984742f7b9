//! Clients for the state licensing authority.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use leafline_core::LicenseId;

/// A license record as reported by the licensing authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub license_id: String,
    pub is_active: bool,
    pub expiration_date: DateTime<Utc>,
    /// e.g. "Grower", "Dispensary", "Processor"
    pub entity_type: String,
}

/// Failures talking to the licensing authority.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthorityError {
    #[error("licensing authority request timed out")]
    Timeout,

    #[error("licensing authority unreachable: {0}")]
    Transport(String),

    #[error("licensing authority returned HTTP {0}")]
    Status(u16),

    #[error("invalid licensing authority response: {0}")]
    Decode(String),
}

impl AuthorityError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            Self::Decode(_) => false,
        }
    }
}

/// Lookup of license records by id.
///
/// `Ok(None)` means the authority has no record of the license.
#[async_trait]
pub trait LicenseAuthority: Send + Sync {
    async fn lookup(&self, license_id: &LicenseId) -> Result<Option<Verification>, AuthorityError>;
}

/// Live HTTP client: `GET {base_url}/licenses/{license_id}`.
pub struct HttpLicenseAuthority {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl HttpLicenseAuthority {
    /// Create a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::Transport` if the HTTP client cannot be built.
    pub fn new(
        base_url: Url,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, AuthorityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorityError::Transport(e.to_string()))?;

        // Url::join replaces the last path segment unless the base ends in '/'.
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn license_url(&self, license_id: &LicenseId) -> Result<Url, AuthorityError> {
        self.base_url
            .join(&format!("licenses/{license_id}"))
            .map_err(|e| AuthorityError::Transport(e.to_string()))
    }
}

#[async_trait]
impl LicenseAuthority for HttpLicenseAuthority {
    async fn lookup(&self, license_id: &LicenseId) -> Result<Option<Verification>, AuthorityError> {
        let mut request = self.client.get(self.license_url(license_id)?);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AuthorityError::Timeout
            } else {
                AuthorityError::Transport(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<Verification>()
                .await
                .map(Some)
                .map_err(|e| AuthorityError::Decode(e.to_string())),
            status => Err(AuthorityError::Status(status.as_u16())),
        }
    }
}

/// Offline authority with fixed fixtures, used when no authority URL is
/// configured.
///
/// | License id | Result |
/// |---|---|
/// | `OMMA-FAIL` | transport failure |
/// | `OMMA-ACTIVE-VENDOR`, `OMMA-ACTIVE-BUYER` | active, expires in six months |
/// | `OMMA-EXPIRED` | inactive, expired a year ago |
/// | anything else | no record |
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxLicenseAuthority;

#[async_trait]
impl LicenseAuthority for SandboxLicenseAuthority {
    async fn lookup(&self, license_id: &LicenseId) -> Result<Option<Verification>, AuthorityError> {
        let now = Utc::now();
        let record = |is_active, expiration_date, entity_type: &str| Verification {
            license_id: license_id.to_string(),
            is_active,
            expiration_date,
            entity_type: entity_type.to_owned(),
        };

        match license_id.as_str() {
            "OMMA-FAIL" => Err(AuthorityError::Transport(
                "simulated connection timeout".to_owned(),
            )),
            "OMMA-ACTIVE-VENDOR" | "OMMA-ACTIVE-BUYER" => {
                let expires = now
                    .checked_add_months(Months::new(6))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                Ok(Some(record(true, expires, "Dispensary")))
            }
            "OMMA-EXPIRED" => {
                let expired = now
                    .checked_sub_months(Months::new(12))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                Ok(Some(record(false, expired, "Grower")))
            }
            _ => Ok(None),
        }
    }
}
