//! Domain models for the marketplace.

pub mod actor;
pub mod catalog;
pub mod entity;
pub mod order;
pub mod user;

pub use actor::Actor;
pub use catalog::{Catalog, Product};
pub use entity::{
    BusinessEntity, BusinessProfile, Buyer, ComplianceTransitionError, ContactInfo, EntityKind,
    Vendor,
};
pub use order::{Order, OrderDraft, OrderItem, OrderTransitionError, Timeline, Totals};
pub use user::{User, UserProfile};
