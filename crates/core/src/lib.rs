//! Leafline Core - Shared domain types.
//!
//! This crate provides the types shared by every Leafline component:
//! - `api` - The marketplace HTTP service
//! - `integration-tests` - End-to-end tests against the in-process router
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Compliance and order status transitions live here
//! because they are plain state machines over these types.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, license identifiers, prices, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
