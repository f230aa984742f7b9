//! User account creation, scoped to licensed businesses.

use chrono::Utc;
use tracing::{info, instrument, warn};

use leafline_core::{AccountStatus, Email, EmailError, EntityId, Role, UserId};

use crate::config::MarketplaceConfig;
use crate::db::{RepositoryError, UserRepository};
use crate::models::{EntityKind, User};
use crate::services::auth::{self, AuthError};
use crate::services::compliance::{ComplianceService, GateError};

/// Input for creating a user account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Raw role string as submitted; parsed case-insensitively.
    pub role: String,
    pub associated_entity_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("missing associated entity ID for licensed role")]
    MissingEntity,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("password is required")]
    PasswordRequired,

    #[error("{0}")]
    WeakPassword(String),

    /// The associated entity is missing, malformed, of the wrong kind, or
    /// fails the compliance check.
    #[error("associated entity is invalid or non-compliant: {0}")]
    EntityRejected(String),

    #[error("admin accounts must be provisioned internally")]
    AdminNotAllowed,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("password hashing failed")]
    PasswordHash,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<AuthError> for AccountError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakPassword(msg) => Self::WeakPassword(msg),
            AuthError::InvalidEmail(e) => Self::InvalidEmail(e),
            AuthError::Repository(e) => Self::Repository(e),
            _ => Self::PasswordHash,
        }
    }
}

/// Creates user accounts after checking the role's business rules.
pub struct AccountService<'a> {
    users: UserRepository<'a>,
    compliance: ComplianceService<'a>,
    config: &'a MarketplaceConfig,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(
        users: UserRepository<'a>,
        compliance: ComplianceService<'a>,
        config: &'a MarketplaceConfig,
    ) -> Self {
        Self {
            users,
            compliance,
            config,
        }
    }

    /// Create an active user account.
    ///
    /// - `VENDOR`/`BUYER` must name an associated business of the matching
    ///   kind that passes the internal compliance check.
    /// - `ADMIN` is only allowed for allow-listed emails.
    ///
    /// A password is optional here (accounts may be provisioned first and
    /// set a password later) but is validated when given.
    ///
    /// # Errors
    ///
    /// See [`AccountError`]; each variant maps to one rejection reason.
    #[instrument(skip_all, fields(email = %request.email, role = %request.role))]
    pub async fn create_user(&self, request: NewUser) -> Result<User, AccountError> {
        let role: Role = request
            .role
            .parse()
            .map_err(|_| AccountError::InvalidRole(request.role.clone()))?;
        let email = Email::parse(&request.email)?;

        let associated_entity_id = match EntityKind::for_role(role) {
            Some(kind) => Some(self.check_entity(kind, request.associated_entity_id.as_deref()).await?),
            None => {
                if !self.config.is_admin_email(&email) {
                    warn!("Rejected admin self-registration");
                    return Err(AccountError::AdminNotAllowed);
                }
                None
            }
        };

        let password_hash = match request.password.as_deref() {
            Some(password) => {
                auth::validate_password(password)?;
                Some(auth::hash_password(password)?)
            }
            None => None,
        };

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            first_name: request.first_name.trim().to_owned(),
            last_name: request.last_name.trim().to_owned(),
            email,
            password_hash,
            role,
            status: AccountStatus::Active,
            associated_entity_id,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AccountError::EmailTaken,
            other => AccountError::Repository(other),
        })?;

        info!(user_id = %user.id, "User account created");
        Ok(user)
    }

    /// Like [`create_user`](Self::create_user), but a password is required.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::PasswordRequired` when no password is given,
    /// otherwise as `create_user`.
    pub async fn sign_up(&self, request: NewUser) -> Result<User, AccountError> {
        if request.password.as_deref().is_none_or(str::is_empty) {
            return Err(AccountError::PasswordRequired);
        }
        self.create_user(request).await
    }

    async fn check_entity(
        &self,
        kind: EntityKind,
        raw_id: Option<&str>,
    ) -> Result<EntityId, AccountError> {
        let raw_id = raw_id.map(str::trim).unwrap_or_default();
        if raw_id.is_empty() {
            return Err(AccountError::MissingEntity);
        }

        let id = EntityId::parse(raw_id)
            .map_err(|e| AccountError::EntityRejected(e.to_string()))?;

        match self
            .compliance
            .ensure_entity_active(id, Some(kind), Utc::now())
            .await
        {
            Ok(_) => Ok(id),
            Err(GateError::Repository(e)) => Err(AccountError::Repository(e)),
            Err(e) => {
                warn!(entity_id = %id, error = %e, "Rejected user for associated entity");
                Err(AccountError::EntityRejected(e.to_string()))
            }
        }
    }
}
