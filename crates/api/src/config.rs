//! Marketplace configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LEAFLINE_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `LEAFLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `LEAFLINE_PORT` - Listen port (default: 8080)
//! - `LEAFLINE_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string.
//!   When neither is set the in-memory document store is used.
//! - `LEAFLINE_TOKEN_TTL_HOURS` - Access token lifetime (default: 24)
//! - `LEAFLINE_ADMIN_EMAILS` - Comma-separated admin allow-list
//!   (default: admin@company.com)
//! - `LEAFLINE_EXCISE_TAX_RATE` - Excise tax rate (default: 0.07)
//! - `LEAFLINE_SALES_TAX_RATE` - Sales tax rate (default: 0.045)
//! - `LICENSE_AUTHORITY_URL` - Licensing authority base URL. When unset the
//!   sandbox authority is used.
//! - `LICENSE_AUTHORITY_API_KEY` - Bearer key for the licensing authority
//! - `LICENSE_AUTHORITY_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `LICENSE_AUTHORITY_MAX_RETRIES` - Retries on transient failure (default: 2)
//! - `LICENSE_AUTHORITY_FAILURE_THRESHOLD` - Consecutive failures that open the
//!   circuit breaker (default: 5)
//! - `LICENSE_AUTHORITY_COOLDOWN_SECS` - How long the breaker stays open (default: 30)
//! - `LICENSE_CACHE_TTL_SECS` - Verification result cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use leafline_core::Email;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_ADMIN_EMAIL: &str = "admin@company.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Marketplace application configuration.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Access token configuration
    pub auth: AuthConfig,
    /// Licensing authority client configuration
    pub license_authority: LicenseAuthorityConfig,
    /// Tax rates applied to orders
    pub tax: TaxConfig,
    /// Emails allowed to register as ADMIN
    pub admin_emails: Vec<Email>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Access token signing configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens
    pub jwt_secret: SecretString,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Licensing authority client configuration.
#[derive(Clone)]
pub struct LicenseAuthorityConfig {
    /// Base URL of the authority. `None` selects the sandbox authority.
    pub base_url: Option<Url>,
    /// Bearer key sent to the authority
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt, transient failures only
    pub max_retries: u32,
    /// Consecutive failures before the circuit breaker opens
    pub failure_threshold: u32,
    /// How long the circuit breaker stays open
    pub cooldown: Duration,
    /// How long successful verifications are cached
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for LicenseAuthorityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseAuthorityConfig")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("failure_threshold", &self.failure_threshold)
            .field("cooldown", &self.cooldown)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl Default for LicenseAuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retries: 2,
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Tax rates applied to order subtotals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxConfig {
    /// Cannabis excise tax rate (e.g. 0.07 for 7%)
    pub excise_rate: Decimal,
    /// State sales tax rate
    pub sales_rate: Decimal,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            excise_rate: Decimal::new(7, 2),
            sales_rate: Decimal::new(45, 3),
        }
    }
}

impl MarketplaceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("LEAFLINE_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("LEAFLINE_PORT", "8080")?;
        let database_url = get_database_url("LEAFLINE_DATABASE_URL");

        let jwt_secret = get_validated_secret("LEAFLINE_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "LEAFLINE_JWT_SECRET")?;
        let token_ttl_hours = parse_env_or_default::<u64>("LEAFLINE_TOKEN_TTL_HOURS", "24")?;

        let admin_emails = parse_admin_emails(&get_env_or_default(
            "LEAFLINE_ADMIN_EMAILS",
            DEFAULT_ADMIN_EMAIL,
        ))?;

        Ok(Self {
            host,
            port,
            database_url,
            auth: AuthConfig {
                jwt_secret,
                token_ttl: Duration::from_secs(token_ttl_hours * 3600),
            },
            license_authority: LicenseAuthorityConfig::from_env()?,
            tax: TaxConfig {
                excise_rate: parse_env_or_default("LEAFLINE_EXCISE_TAX_RATE", "0.07")?,
                sales_rate: parse_env_or_default("LEAFLINE_SALES_TAX_RATE", "0.045")?,
            },
            admin_emails,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for tests and local tooling: in-memory store, sandbox
    /// authority, default tax rates, and the default admin allow-list.
    #[must_use]
    pub fn local(jwt_secret: SecretString) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            database_url: None,
            auth: AuthConfig {
                jwt_secret,
                token_ttl: Duration::from_secs(24 * 3600),
            },
            license_authority: LicenseAuthorityConfig::default(),
            tax: TaxConfig::default(),
            admin_emails: Email::parse(DEFAULT_ADMIN_EMAIL).into_iter().collect(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether `email` may register as an admin.
    #[must_use]
    pub fn is_admin_email(&self, email: &Email) -> bool {
        self.admin_emails.contains(email)
    }
}

impl LicenseAuthorityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_optional_env("LICENSE_AUTHORITY_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("LICENSE_AUTHORITY_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            base_url,
            api_key: get_optional_env("LICENSE_AUTHORITY_API_KEY").map(SecretString::from),
            timeout: Duration::from_secs(parse_env_or_default(
                "LICENSE_AUTHORITY_TIMEOUT_SECS",
                "10",
            )?),
            max_retries: parse_env_or_default("LICENSE_AUTHORITY_MAX_RETRIES", "2")?,
            failure_threshold: parse_env_or_default("LICENSE_AUTHORITY_FAILURE_THRESHOLD", "5")?,
            cooldown: Duration::from_secs(parse_env_or_default(
                "LICENSE_AUTHORITY_COOLDOWN_SECS",
                "30",
            )?),
            cache_ttl: Duration::from_secs(parse_env_or_default("LICENSE_CACHE_TTL_SECS", "300")?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the comma-separated admin allow-list.
fn parse_admin_emails(raw: &str) -> Result<Vec<Email>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Email::parse(s).map_err(|e| {
                ConfigError::InvalidEnvVar("LEAFLINE_ADMIN_EMAILS".to_string(), e.to_string())
            })
        })
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-secret-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_secret_length(&SecretString::from("x".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_parse_admin_emails() {
        let emails = parse_admin_emails("Admin@Company.com, ops@leafline.market ,").unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].as_str(), "admin@company.com");
        assert!(parse_admin_emails("not-an-email").is_err());
    }

    #[test]
    fn test_local_config_defaults() {
        let config = MarketplaceConfig::local(SecretString::from("k".repeat(32)));
        assert!(config.database_url.is_none());
        assert!(config.license_authority.base_url.is_none());
        assert_eq!(config.tax, TaxConfig::default());
        assert!(config.is_admin_email(&Email::parse("admin@company.com").unwrap()));
        assert!(!config.is_admin_email(&Email::parse("not-admin@x.com").unwrap()));
        assert_eq!(config.socket_addr().port(), 8080);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthConfig {
            jwt_secret: SecretString::from("super_secret_signing_key"),
            token_ttl: Duration::from_secs(60),
        };
        let authority = LicenseAuthorityConfig {
            api_key: Some(SecretString::from("super_secret_api_key")),
            ..LicenseAuthorityConfig::default()
        };

        let output = format!("{auth:?} {authority:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super_secret_signing_key"));
        assert!(!output.contains("super_secret_api_key"));
    }
}
