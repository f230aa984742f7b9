//! The authenticated caller behind a request.

use leafline_core::{EntityId, Role, UserId};

/// Identity carried by a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    /// The business the user acts for. `None` for admins.
    pub entity_id: Option<EntityId>,
}

impl Actor {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether the caller acts for `entity` (admins act for everyone).
    #[must_use]
    pub fn acts_for(&self, entity: EntityId) -> bool {
        self.is_admin() || self.entity_id == Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acts_for() {
        let entity = EntityId::generate();
        let vendor = Actor {
            user_id: UserId::generate(),
            role: Role::Vendor,
            entity_id: Some(entity),
        };
        assert!(vendor.acts_for(entity));
        assert!(!vendor.acts_for(EntityId::generate()));

        let admin = Actor {
            user_id: UserId::generate(),
            role: Role::Admin,
            entity_id: None,
        };
        assert!(admin.acts_for(entity));
    }
}
