//! Roles and status enums for marketplace records.
//!
//! All of these serialize as `SCREAMING_SNAKE_CASE` strings, which is the
//! shape clients already send (`"VENDOR"`, `"PENDING_APPROVAL"`, ...).

use serde::{Deserialize, Serialize};

/// Error returned when a status or role string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// What was being parsed (e.g. "role").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Marketplace user role.
///
/// Vendors and buyers are scoped to a licensed business entity. Admins are
/// provisioned internally and never belong to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Vendor,
    Buyer,
}

impl Role {
    /// Whether this role must be scoped to a licensed business entity.
    #[must_use]
    pub const fn requires_entity(self) -> bool {
        matches!(self, Self::Vendor | Self::Buyer)
    }

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Vendor => "VENDOR",
            Self::Buyer => "BUYER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "VENDOR" => Ok(Self::Vendor),
            "BUYER" => Ok(Self::Buyer),
            _ => Err(ParseStatusError::new("role", s)),
        }
    }
}

/// Account status of a user or business entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    PendingApproval,
    Active,
    Inactive,
    Suspended,
}

/// Cached local judgment of whether an entity's license is valid.
///
/// ```text
/// PENDING ──verify──▶ VERIFIED ──expiry seen──▶ EXPIRED
///                        ▲  │                      │
///                        └──┘ re-verify            │
///                        ▲                         │
///                        └─────────re-verify───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    #[default]
    Pending,
    Verified,
    Expired,
}

impl ComplianceStatus {
    /// Whether the compliance state machine allows moving to `next`.
    ///
    /// `Verified -> Verified` is a re-verification that refreshes the
    /// expiration date.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Expired | Self::Verified, Self::Verified)
                | (Self::Verified, Self::Expired)
        )
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Completed,
}

impl OrderStatus {
    /// Whether an order in this status may move to `next`.
    ///
    /// Orders advance one step at a time and may only be cancelled before
    /// they ship.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Accepted, Self::Processing)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered, Self::Completed)
                | (
                    Self::Pending | Self::Accepted | Self::Processing,
                    Self::Cancelled
                )
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// B2B payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

/// B2B payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Check,
    Other,
}
