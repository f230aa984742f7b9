//! Business logic services.
//!
//! # Services
//!
//! - `license` - External license verification (retry, circuit breaker, cache)
//! - `compliance` - Internal compliance check and the transactional gate
//! - `registration` - Vendor/buyer registration and re-verification
//! - `accounts` - User account creation scoped to licensed businesses
//! - `auth` - Password login and access tokens
//! - `catalog` - Catalog browsing, visibility, product listings
//! - `orders` - Order placement and lifecycle

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod compliance;
pub mod license;
pub mod orders;
pub mod registration;
