//! Vendor and buyer registration against the licensing authority.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use leafline_core::{EntityId, LicenseId};

use crate::db::{EntityRepository, RepositoryError};
use crate::models::{BusinessEntity, BusinessProfile, ComplianceTransitionError, ContactInfo, EntityKind};
use crate::services::license::{LicenseVerifier, VerifyError};

/// A business submitted for registration.
#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub business_name: String,
    pub license_id: LicenseId,
    pub contact_info: ContactInfo,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid registration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Verification(#[from] VerifyError),

    #[error("license {0} is already registered")]
    AlreadyRegistered(LicenseId),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error(transparent)]
    Transition(#[from] ComplianceTransitionError),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// Registers licensed businesses and re-verifies their licenses.
pub struct RegistrationService<'a> {
    entities: EntityRepository<'a>,
    verifier: &'a LicenseVerifier,
}

impl<'a> RegistrationService<'a> {
    #[must_use]
    pub const fn new(entities: EntityRepository<'a>, verifier: &'a LicenseVerifier) -> Self {
        Self { entities, verifier }
    }

    /// Verify a license with the state and register the business.
    ///
    /// The entity is only persisted once the authority confirms the license
    /// is active, and is stored as `VERIFIED` with the authority's expiry.
    ///
    /// # Errors
    ///
    /// - `RegistrationError::Invalid` if the business name is blank
    /// - `RegistrationError::Verification` if the license cannot be verified
    /// - `RegistrationError::AlreadyRegistered` if the license is taken
    #[instrument(skip_all, fields(kind = %kind, license_id = %business.license_id))]
    pub async fn register(
        &self,
        kind: EntityKind,
        business: NewBusiness,
    ) -> Result<BusinessEntity, RegistrationError> {
        let business_name = business.business_name.trim();
        if business_name.is_empty() {
            return Err(RegistrationError::Invalid(
                "businessName is required".to_owned(),
            ));
        }

        let verification = self
            .verifier
            .verify(&business.license_id)
            .await
            .inspect_err(log_verification_failure)?;

        let now = Utc::now();
        let mut entity = BusinessEntity::new(
            kind,
            BusinessProfile::pending(
                business_name.to_owned(),
                business.license_id.clone(),
                business.contact_info,
                now,
            ),
        );
        entity.mark_verified(verification.expiration_date, now)?;

        self.entities.create(&entity).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                RegistrationError::AlreadyRegistered(business.license_id.clone())
            }
            other => RegistrationError::Repository(other),
        })?;

        info!(
            entity_id = %entity.id(),
            expires = %verification.expiration_date.format("%Y-%m-%d"),
            "{} registered with active license",
            entity.describe()
        );
        Ok(entity)
    }

    /// Re-check an entity's license with the state and refresh its
    /// compliance state.
    ///
    /// A lapsed license is recorded as `EXPIRED` even when the check fails:
    /// a locally lapsed expiry, or an authority record reporting the license
    /// expired, is persisted before the error is returned.
    ///
    /// # Errors
    ///
    /// - `RegistrationError::NotFound` if no entity of `kind` has this id
    /// - `RegistrationError::Verification` if the license is not active
    #[instrument(skip(self))]
    pub async fn reverify(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> Result<BusinessEntity, RegistrationError> {
        let mut entity = self
            .entities
            .get(id)
            .await
            .map_err(RegistrationError::Repository)?
            .filter(|e| e.kind() == kind)
            .ok_or(RegistrationError::NotFound { kind, id })?;

        let now = Utc::now();
        if entity.refresh_expiry(now) {
            self.entities
                .update(&entity)
                .await
                .map_err(RegistrationError::Repository)?;
        }

        let outcome = self.verifier.reverify(entity.license_id()).await;
        let verification = match outcome {
            Ok(verification) => verification,
            Err(err) => {
                log_verification_failure(&err);
                if let VerifyError::Expired(record) = &err {
                    self.record_lapse(&mut entity, record.expiration_date).await?;
                }
                return Err(err.into());
            }
        };

        entity.mark_verified(verification.expiration_date, now)?;
        self.entities
            .update(&entity)
            .await
            .map_err(RegistrationError::Repository)?;

        info!(
            entity_id = %id,
            expires = %verification.expiration_date.format("%Y-%m-%d"),
            "License re-verified"
        );
        Ok(entity)
    }

    /// Store the authority's lapsed expiry and flip a verified entity to
    /// `EXPIRED`.
    async fn record_lapse(
        &self,
        entity: &mut BusinessEntity,
        expired_on: DateTime<Utc>,
    ) -> Result<(), RegistrationError> {
        let now = Utc::now();
        let profile = entity.profile_mut();
        profile.license_expiration_date = Some(expired_on);
        profile.updated_at = now;
        entity.refresh_expiry(now);
        self.entities
            .update(entity)
            .await
            .map_err(RegistrationError::Repository)?;
        info!(
            entity_id = %entity.id(),
            status = %entity.profile().compliance_status,
            "Recorded lapsed license"
        );
        Ok(())
    }
}

fn log_verification_failure(error: &VerifyError) {
    match error {
        VerifyError::Expired(record) => warn!(
            expired_on = %record.expiration_date.format("%Y-%m-%d"),
            entity_type = %record.entity_type,
            "External verification failed: license expired"
        ),
        other => warn!(error = %other, "External verification failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use leafline_core::ComplianceStatus;

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::license::{
        AuthorityError, CircuitBreaker, LicenseAuthority, RetryPolicy, SandboxLicenseAuthority,
        Verification,
    };

    /// Reports every license as revoked yesterday.
    struct Revoked;

    #[async_trait]
    impl LicenseAuthority for Revoked {
        async fn lookup(
            &self,
            license_id: &LicenseId,
        ) -> Result<Option<Verification>, AuthorityError> {
            Ok(Some(Verification {
                license_id: license_id.to_string(),
                is_active: false,
                expiration_date: Utc::now() - chrono::Duration::days(1),
                entity_type: "Grower".to_owned(),
            }))
        }
    }

    fn verifier() -> LicenseVerifier {
        verifier_with(SandboxLicenseAuthority)
    }

    fn verifier_with(authority: impl LicenseAuthority + 'static) -> LicenseVerifier {
        LicenseVerifier::new(
            authority,
            RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
            CircuitBreaker::new(5, Duration::from_secs(30)),
            Duration::from_secs(60),
        )
    }

    fn business(license: &str) -> NewBusiness {
        NewBusiness {
            business_name: "Green Harvest Farms".to_string(),
            license_id: LicenseId::parse(license).unwrap(),
            contact_info: ContactInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_register_active_license() {
        let store = MemoryStore::new();
        let verifier = verifier();
        let service = RegistrationService::new(EntityRepository::new(&store), &verifier);

        let vendor = service
            .register(EntityKind::Vendor, business("OMMA-ACTIVE-VENDOR"))
            .await
            .unwrap();
        assert_eq!(vendor.profile().compliance_status, ComplianceStatus::Verified);
        assert!(vendor.is_compliant(Utc::now()));

        let stored = EntityRepository::new(&store)
            .get(vendor.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, vendor);
    }

    #[tokio::test]
    async fn test_register_rejects_unverifiable_licenses() {
        let store = MemoryStore::new();
        let verifier = verifier();
        let service = RegistrationService::new(EntityRepository::new(&store), &verifier);

        let expired = service
            .register(EntityKind::Vendor, business("OMMA-EXPIRED"))
            .await
            .unwrap_err();
        assert!(matches!(
            expired,
            RegistrationError::Verification(VerifyError::Expired(_))
        ));

        let failed = service
            .register(EntityKind::Buyer, business("OMMA-FAIL"))
            .await
            .unwrap_err();
        assert!(matches!(
            failed,
            RegistrationError::Verification(VerifyError::ExternalService(_))
        ));

        // Nothing was stored for either.
        let repo = EntityRepository::new(&store);
        assert!(
            repo.get_by_license(&LicenseId::parse("OMMA-EXPIRED").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_license() {
        let store = MemoryStore::new();
        let verifier = verifier();
        let service = RegistrationService::new(EntityRepository::new(&store), &verifier);

        service
            .register(EntityKind::Buyer, business("OMMA-ACTIVE-BUYER"))
            .await
            .unwrap();
        let err = service
            .register(EntityKind::Buyer, business("OMMA-ACTIVE-BUYER"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_register_requires_business_name() {
        let store = MemoryStore::new();
        let verifier = verifier();
        let service = RegistrationService::new(EntityRepository::new(&store), &verifier);

        let mut blank = business("OMMA-ACTIVE-VENDOR");
        blank.business_name = "  ".to_string();
        let err = service
            .register(EntityKind::Vendor, blank)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_reverify_restores_expired_entity() {
        let store = MemoryStore::new();
        let verifier = verifier();
        let repo = EntityRepository::new(&store);
        let service = RegistrationService::new(EntityRepository::new(&store), &verifier);

        let mut vendor = service
            .register(EntityKind::Vendor, business("OMMA-ACTIVE-VENDOR"))
            .await
            .unwrap();
        // Simulate a lapse recorded by the gate.
        vendor.profile_mut().compliance_status = ComplianceStatus::Expired;
        repo.update(&vendor).await.unwrap();

        let refreshed = service
            .reverify(EntityKind::Vendor, vendor.id())
            .await
            .unwrap();
        assert_eq!(
            refreshed.profile().compliance_status,
            ComplianceStatus::Verified
        );

        let err = service
            .reverify(EntityKind::Buyer, vendor.id())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reverify_records_authority_expiry() {
        let store = MemoryStore::new();
        let repo = EntityRepository::new(&store);
        let now = Utc::now();
        let mut vendor = BusinessEntity::new(
            EntityKind::Vendor,
            BusinessProfile::pending(
                "Green Harvest Farms".to_string(),
                LicenseId::parse("OMMA-REVOKED").unwrap(),
                ContactInfo::default(),
                now,
            ),
        );
        vendor
            .mark_verified(now + chrono::Duration::days(90), now)
            .unwrap();
        repo.create(&vendor).await.unwrap();

        let verifier = verifier_with(Revoked);
        let service = RegistrationService::new(EntityRepository::new(&store), &verifier);
        let err = service
            .reverify(EntityKind::Vendor, vendor.id())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Verification(VerifyError::Expired(_))
        ));

        let stored = repo.get(vendor.id()).await.unwrap().unwrap();
        assert_eq!(stored.profile().compliance_status, ComplianceStatus::Expired);
        assert!(
            stored
                .profile()
                .license_expiration_date
                .is_some_and(|exp| exp < now)
        );
        assert!(!stored.is_compliant(Utc::now()));
    }
}
