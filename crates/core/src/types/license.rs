//! State license identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`LicenseId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LicenseIdError {
    /// The input is empty.
    #[error("license id cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("license id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters other than letters, digits, and dashes.
    #[error("license id may only contain letters, digits, and dashes")]
    InvalidCharacter,
}

/// A state-issued cannabis business license identifier
/// (e.g. `PAAA-DJ3F-28JJ-283H`).
///
/// Normalized to uppercase so the store's uniqueness constraint sees one
/// spelling per license.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseId(String);

impl LicenseId {
    /// Maximum length accepted from clients.
    pub const MAX_LENGTH: usize = 64;

    /// Parse and normalize a license identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains anything but ASCII letters, digits,
    /// and dashes.
    pub fn parse(s: &str) -> Result<Self, LicenseIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LicenseIdError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(LicenseIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(LicenseIdError::InvalidCharacter);
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns the license id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LicenseId {
    type Error = LicenseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LicenseId> for String {
    fn from(id: LicenseId) -> Self {
        id.0
    }
}

impl AsRef<str> for LicenseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let id = LicenseId::parse(" omma-active-vendor ").unwrap();
        assert_eq!(id.as_str(), "OMMA-ACTIVE-VENDOR");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(LicenseId::parse(""), Err(LicenseIdError::Empty));
        assert_eq!(
            LicenseId::parse("PAAA DJ3F"),
            Err(LicenseIdError::InvalidCharacter)
        );
        assert!(matches!(
            LicenseId::parse(&"A".repeat(65)),
            Err(LicenseIdError::TooLong { max: 64 })
        ));
    }
}
