//! Authentication error types.

use thiserror::Error;

use openweed_core::UserRole;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] openweed_core::EmailError),

    #[error("Name is required")]
    InvalidName,

    /// Wrong password, unknown email, or an account without a password.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("{0}")]
    WeakPassword(String),

    /// Self-registration cannot pick this role.
    #[error("Cannot register as {0}")]
    RoleNotAllowed(UserRole),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}
