//! Internal compliance checks against the locally cached license state.
//!
//! These run on every transactional request (adding a product, placing an
//! order, scoping a user to a business) and never call the licensing
//! authority. Re-verification goes through the registration service.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use leafline_core::{ComplianceStatus, EntityId};

use crate::db::{EntityRepository, RepositoryError};
use crate::models::{BusinessEntity, EntityKind};

/// Why the cached compliance state rejects an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ComplianceError {
    #[error("internal status check failed: entity is not marked as VERIFIED")]
    NotVerified(ComplianceStatus),

    #[error("internal status check failed: license has expired")]
    LicenseExpired,
}

/// Check a cached compliance status and license expiry.
///
/// The status is checked first; a verified entity with no recorded expiry is
/// treated as expired.
///
/// # Errors
///
/// Returns `ComplianceError::NotVerified` if `status` is not `VERIFIED`, and
/// `ComplianceError::LicenseExpired` if `now` is past `expires_at`.
pub fn check_internal(
    status: ComplianceStatus,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ComplianceError> {
    if status != ComplianceStatus::Verified {
        return Err(ComplianceError::NotVerified(status));
    }
    match expires_at {
        Some(exp) if now <= exp => Ok(()),
        _ => Err(ComplianceError::LicenseExpired),
    }
}

/// Failures of the transactional compliance gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("business entity {0} not found")]
    NotFound(EntityId),

    #[error("business entity {id} is a {actual}, expected a {expected}")]
    WrongKind {
        id: EntityId,
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("business entity {id} failed compliance check: {source}")]
    NonCompliant {
        id: EntityId,
        #[source]
        source: ComplianceError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Transactional compliance gate over stored entities.
pub struct ComplianceService<'a> {
    entities: EntityRepository<'a>,
}

impl<'a> ComplianceService<'a> {
    #[must_use]
    pub const fn new(entities: EntityRepository<'a>) -> Self {
        Self { entities }
    }

    /// Load an entity and require that it is currently compliant.
    ///
    /// A verified entity whose license has lapsed is flipped to `EXPIRED`
    /// and saved before the check runs.
    ///
    /// # Errors
    ///
    /// Returns `GateError::NotFound` / `WrongKind` when the entity does not
    /// exist or is not of the `expected` kind, and `GateError::NonCompliant`
    /// when the internal check fails.
    pub async fn ensure_entity_active(
        &self,
        id: EntityId,
        expected: Option<EntityKind>,
        now: DateTime<Utc>,
    ) -> Result<BusinessEntity, GateError> {
        let mut entity = self.entities.get(id).await?.ok_or(GateError::NotFound(id))?;

        if let Some(expected) = expected
            && entity.kind() != expected
        {
            return Err(GateError::WrongKind {
                id,
                expected,
                actual: entity.kind(),
            });
        }

        if entity.refresh_expiry(now) {
            info!(entity_id = %id, "License lapsed, marking entity EXPIRED");
            self.entities.update(&entity).await?;
        }

        let profile = entity.profile();
        if let Err(source) =
            check_internal(profile.compliance_status, profile.license_expiration_date, now)
        {
            warn!(entity_id = %id, error = %source, "Transactional license check failed");
            return Err(GateError::NonCompliant { id, source });
        }

        Ok(entity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use leafline_core::LicenseId;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{BusinessProfile, ContactInfo};

    fn entity(kind: EntityKind, now: DateTime<Utc>) -> BusinessEntity {
        BusinessEntity::new(
            kind,
            BusinessProfile::pending(
                "Green Harvest Farms".to_string(),
                LicenseId::parse(&format!("OMMA-{}", EntityId::generate())).unwrap(),
                ContactInfo::default(),
                now,
            ),
        )
    }

    #[test]
    fn test_check_internal() {
        let now = Utc::now();
        let future = Some(now + Duration::days(30));
        let past = Some(now - Duration::days(1));

        assert!(check_internal(ComplianceStatus::Verified, future, now).is_ok());
        assert!(check_internal(ComplianceStatus::Verified, Some(now), now).is_ok());
        assert_eq!(
            check_internal(ComplianceStatus::Verified, past, now),
            Err(ComplianceError::LicenseExpired)
        );
        assert_eq!(
            check_internal(ComplianceStatus::Verified, None, now),
            Err(ComplianceError::LicenseExpired)
        );
        // Status is checked first.
        assert_eq!(
            check_internal(ComplianceStatus::Expired, past, now),
            Err(ComplianceError::NotVerified(ComplianceStatus::Expired))
        );
        assert_eq!(
            check_internal(ComplianceStatus::Expired, Some(now + Duration::days(365)), now),
            Err(ComplianceError::NotVerified(ComplianceStatus::Expired))
        );
        assert_eq!(
            check_internal(ComplianceStatus::Pending, future, now),
            Err(ComplianceError::NotVerified(ComplianceStatus::Pending))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ComplianceError::NotVerified(ComplianceStatus::Pending).to_string(),
            "internal status check failed: entity is not marked as VERIFIED"
        );
        assert_eq!(
            ComplianceError::LicenseExpired.to_string(),
            "internal status check failed: license has expired"
        );
    }

    #[tokio::test]
    async fn test_gate_passes_verified_entity() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut vendor = entity(EntityKind::Vendor, now);
        vendor.mark_verified(now + Duration::days(90), now).unwrap();
        EntityRepository::new(&store).create(&vendor).await.unwrap();

        let gate = ComplianceService::new(EntityRepository::new(&store));
        let loaded = gate
            .ensure_entity_active(vendor.id(), Some(EntityKind::Vendor), now)
            .await
            .unwrap();
        assert_eq!(loaded.id(), vendor.id());
    }

    #[tokio::test]
    async fn test_gate_rejects_wrong_kind_and_missing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut buyer = entity(EntityKind::Buyer, now);
        buyer.mark_verified(now + Duration::days(90), now).unwrap();
        EntityRepository::new(&store).create(&buyer).await.unwrap();

        let gate = ComplianceService::new(EntityRepository::new(&store));
        let err = gate
            .ensure_entity_active(buyer.id(), Some(EntityKind::Vendor), now)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::WrongKind { .. }));

        let err = gate
            .ensure_entity_active(EntityId::generate(), None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_gate_persists_lazy_expiry() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut buyer = entity(EntityKind::Buyer, now);
        buyer.mark_verified(now + Duration::days(1), now).unwrap();
        let repo = EntityRepository::new(&store);
        repo.create(&buyer).await.unwrap();

        let later = now + Duration::days(2);
        let gate = ComplianceService::new(EntityRepository::new(&store));
        let err = gate
            .ensure_entity_active(buyer.id(), Some(EntityKind::Buyer), later)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::NonCompliant {
                source: ComplianceError::NotVerified(ComplianceStatus::Expired),
                ..
            }
        ));

        let stored = repo.get(buyer.id()).await.unwrap().unwrap();
        assert_eq!(stored.profile().compliance_status, ComplianceStatus::Expired);
    }

    #[tokio::test]
    async fn test_gate_rejects_pending_entity() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let vendor = entity(EntityKind::Vendor, now);
        EntityRepository::new(&store).create(&vendor).await.unwrap();

        let gate = ComplianceService::new(EntityRepository::new(&store));
        let err = gate
            .ensure_entity_active(vendor.id(), None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::NonCompliant { .. }));
    }
}
