//! Core types for OpenWeed.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod handle;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use handle::{DriverHandle, HandleError};
pub use id::*;
pub use status::*;
