//! Licensed business entities (vendors and buyers).
//!
//! The set of entity kinds is closed, so `BusinessEntity` is a tagged enum
//! (`"kind": "VENDOR" | "BUYER"`) rather than a trait object. Both variants
//! share a [`BusinessProfile`] that carries the license and compliance state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leafline_core::{AccountStatus, ComplianceStatus, EntityId, LicenseId, Role};

/// Attempted compliance transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("compliance status cannot move from {from} to {to}")]
pub struct ComplianceTransitionError {
    pub from: ComplianceStatus,
    pub to: ComplianceStatus,
}

/// Business contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    /// Contact person's first and last name.
    #[serde(default)]
    pub full_name: Vec<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Fields shared by every licensed business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub id: EntityId,
    pub business_name: String,
    #[serde(rename = "okStateLicenseId")]
    pub license_id: LicenseId,
    /// Set once the license has been verified with the state.
    pub license_expiration_date: Option<DateTime<Utc>>,
    pub compliance_status: ComplianceStatus,
    pub status: AccountStatus,
    pub contact_info: ContactInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessProfile {
    /// A newly submitted business, not yet verified.
    #[must_use]
    pub fn pending(
        business_name: String,
        license_id: LicenseId,
        contact_info: ContactInfo,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::generate(),
            business_name,
            license_id,
            license_expiration_date: None,
            compliance_status: ComplianceStatus::Pending,
            status: AccountStatus::PendingApproval,
            contact_info,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A licensed seller (grower, processor) with a product catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    #[serde(flatten)]
    pub profile: BusinessProfile,
    /// Whether the vendor's products are listed on the marketplace.
    pub menu_enabled: bool,
}

/// A licensed purchaser (dispensary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    #[serde(flatten)]
    pub profile: BusinessProfile,
}

/// Discriminant of [`BusinessEntity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Vendor,
    Buyer,
}

impl EntityKind {
    /// The entity kind a user role is scoped to, if any.
    #[must_use]
    pub const fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::Vendor => Some(Self::Vendor),
            Role::Buyer => Some(Self::Buyer),
            Role::Admin => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vendor => f.write_str("Vendor"),
            Self::Buyer => f.write_str("Buyer"),
        }
    }
}

/// A vendor or buyer business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessEntity {
    Vendor(Vendor),
    Buyer(Buyer),
}

impl BusinessEntity {
    /// Start a pending entity of the given kind. New vendors are unlisted.
    #[must_use]
    pub const fn new(kind: EntityKind, profile: BusinessProfile) -> Self {
        match kind {
            EntityKind::Vendor => Self::Vendor(Vendor {
                profile,
                menu_enabled: false,
            }),
            EntityKind::Buyer => Self::Buyer(Buyer { profile }),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Vendor(_) => EntityKind::Vendor,
            Self::Buyer(_) => EntityKind::Buyer,
        }
    }

    #[must_use]
    pub const fn profile(&self) -> &BusinessProfile {
        match self {
            Self::Vendor(v) => &v.profile,
            Self::Buyer(b) => &b.profile,
        }
    }

    pub const fn profile_mut(&mut self) -> &mut BusinessProfile {
        match self {
            Self::Vendor(v) => &mut v.profile,
            Self::Buyer(b) => &mut b.profile,
        }
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.profile().id
    }

    #[must_use]
    pub const fn license_id(&self) -> &LicenseId {
        &self.profile().license_id
    }

    /// The vendor record, if this entity is a vendor.
    #[must_use]
    pub const fn as_vendor(&self) -> Option<&Vendor> {
        match self {
            Self::Vendor(v) => Some(v),
            Self::Buyer(_) => None,
        }
    }

    /// Whether the cached compliance state says the license is valid at `now`.
    #[must_use]
    pub fn is_compliant(&self, now: DateTime<Utc>) -> bool {
        let profile = self.profile();
        profile.compliance_status == ComplianceStatus::Verified
            && profile.license_expiration_date.is_some_and(|exp| now <= exp)
    }

    /// Human-readable summary, e.g. `Vendor: Green Harvest Farms (License: OMMA-1)`.
    #[must_use]
    pub fn describe(&self) -> String {
        let profile = self.profile();
        format!(
            "{}: {} (License: {})",
            self.kind(),
            profile.business_name,
            profile.license_id
        )
    }

    /// Record a successful external verification.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceTransitionError` if the current status cannot move
    /// to `VERIFIED`.
    pub fn mark_verified(
        &mut self,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), ComplianceTransitionError> {
        let profile = self.profile_mut();
        transition(profile, ComplianceStatus::Verified)?;
        profile.license_expiration_date = Some(expires_at);
        profile.status = AccountStatus::Active;
        profile.updated_at = now;
        Ok(())
    }

    /// Lazily flip a verified entity to `EXPIRED` once its license has lapsed.
    ///
    /// Returns `true` when the status changed and the record needs saving.
    pub fn refresh_expiry(&mut self, now: DateTime<Utc>) -> bool {
        let profile = self.profile_mut();
        let lapsed = profile.license_expiration_date.is_some_and(|exp| now > exp);
        if profile.compliance_status == ComplianceStatus::Verified && lapsed {
            profile.compliance_status = ComplianceStatus::Expired;
            profile.updated_at = now;
            return true;
        }
        false
    }
}

fn transition(
    profile: &mut BusinessProfile,
    to: ComplianceStatus,
) -> Result<(), ComplianceTransitionError> {
    let from = profile.compliance_status;
    if !from.can_transition_to(to) {
        return Err(ComplianceTransitionError { from, to });
    }
    profile.compliance_status = to;
    Ok(())
}
