//! Account management commands.
//!
//! Admin accounts can only be created here; the HTTP API refuses to
//! register them.

use openweed_core::{Email, UserRole};
use openweed_storefront::db::{RepositoryError, UserRepository};
use openweed_storefront::services::auth::{hash_password, validate_password};

use super::{CliError, connect};

fn parse_role(role: &str) -> Result<UserRole, CliError> {
    role.parse()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))
}

/// Create an account, optionally with a password.
///
/// # Errors
///
/// Returns `CliError` for an invalid role, email, or password, or if the
/// email is already registered.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: Option<&str>,
) -> Result<(), CliError> {
    let role = parse_role(role)?;
    let email = Email::parse(email).map_err(|_| CliError::InvalidEmail(email.to_owned()))?;
    let password_hash = match password {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    tracing::info!("Creating account: {} ({})", email, role);
    let user = users
        .create(name.trim(), &email, password_hash.as_deref(), role)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CliError::UserExists(email.to_string()),
            other => CliError::Repository(other),
        })?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    if password_hash.is_none() {
        tracing::warn!("Account has no password and cannot sign in until one is set");
    }
    Ok(())
}

/// Change the role of an existing account.
///
/// # Errors
///
/// Returns `CliError::UnknownUser` if no account has this email.
pub async fn set_role(email: &str, role: &str) -> Result<(), CliError> {
    let role = parse_role(role)?;
    let parsed = Email::parse(email).map_err(|_| CliError::UnknownUser(email.to_owned()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let (user, _) = users
        .get_with_password_hash(&parsed)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_owned()))?;

    let user = users.set_role(user.id, role).await?;
    tracing::info!("{} is now {}", user.email, user.role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert!(matches!(parse_role("Admin"), Ok(UserRole::Admin)));
        assert!(matches!(parse_role("owner"), Err(CliError::InvalidRole(r)) if r == "owner"));
    }
}
