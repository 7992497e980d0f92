//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password accounts and login
//! - `access` - Ownership checks shared by the API handlers
//! - `drivers` - Profile creation and edits
//! - `orders` - Who may see and change which orders

pub mod access;
pub mod auth;
pub mod drivers;
pub mod orders;
