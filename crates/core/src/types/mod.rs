//! Core types for Leafline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod license;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use license::{LicenseId, LicenseIdError};
pub use price::{Price, PriceError};
pub use status::*;
