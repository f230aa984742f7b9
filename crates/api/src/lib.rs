//! Leafline marketplace API library.
//!
//! B2B marketplace for licensed cannabis vendors and buyers. Every
//! registration and transaction passes a license compliance gate backed by
//! the state licensing authority.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
