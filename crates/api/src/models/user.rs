//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leafline_core::{AccountStatus, Email, EntityId, Role, UserId};

/// A marketplace user account.
///
/// Vendor and buyer users are scoped to the business entity they act for;
/// admins have no associated entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    /// Argon2id PHC string. Accounts provisioned without a password have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_entity_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", skipping blank parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Client-facing view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub role: Role,
    pub status: AccountStatus,
    pub associated_entity_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            associated_entity_id: user.associated_entity_id,
            created_at: user.created_at,
        }
    }
}
