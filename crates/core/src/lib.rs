//! OpenWeed Core - domain types and rules for the delivery marketplace.
//!
//! Shared by:
//! - `storefront` - the HTTP service (public API, onboarding, lounge, admin API)
//! - `cli` - migrations, demo seeding, and user management
//!
//! # Architecture
//!
//! No I/O lives here: no database access, no HTTP. Everything in this crate is
//! plain data plus the pure rules the service applies to it, so it can be
//! tested without a database.
//!
//! # Modules
//!
//! - [`types`] - type-safe IDs, emails, driver handles, and domain enums
//! - [`geo`] - ZIP lookup, distance math, and zone matching
//! - [`ordering`] - pricing and validation of order line items
//! - [`chat`] - lounge message and history rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod chat;
pub mod geo;
pub mod ordering;
pub mod types;

pub use types::*;
