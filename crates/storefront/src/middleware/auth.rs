//! Authentication extractors.
//!
//! Handlers take the signed-in user from the session through these
//! extractors. The session only proves who is signed in: the account is
//! reloaded per request, so role changes and deletions apply to sessions
//! that are already open. Rejections are JSON, matching the rest of the API.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use sqlx::PgPool;
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, User, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     Json(user)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// The user already resolved for this request, so the guard and the
/// extractors share one account lookup.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedUser(pub(crate) Option<CurrentUser>);

/// How the identity stored in a session compares with the account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    /// The stored copy matches the account.
    Current(CurrentUser),
    /// The account changed since sign-in; carries the fresh identity.
    Stale(CurrentUser),
    /// The account no longer exists.
    Revoked,
}

/// Compare a stored session identity with the account as loaded now.
#[must_use]
pub fn check_session(stored: &CurrentUser, account: Option<&User>) -> SessionCheck {
    let Some(account) = account else {
        return SessionCheck::Revoked;
    };
    let fresh = CurrentUser::from(account);
    if fresh == *stored {
        SessionCheck::Current(fresh)
    } else {
        SessionCheck::Stale(fresh)
    }
}

/// The signed-in user with the role the database holds right now.
///
/// Sessions without a stored user never touch the database. A drifted copy
/// is rewritten in place; a session whose account was deleted is flushed.
///
/// # Errors
///
/// Returns an error if the session store or the account lookup fails.
pub async fn resolve_current_user(
    session: &Session,
    pool: &PgPool,
) -> Result<Option<CurrentUser>, AppError> {
    let Some(stored) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    else {
        return Ok(None);
    };

    let account = UserRepository::new(pool).get_by_id(stored.id).await?;
    match check_session(&stored, account.as_ref()) {
        SessionCheck::Current(user) => Ok(Some(user)),
        SessionCheck::Stale(user) => {
            tracing::info!(
                user_id = %user.id,
                from = %stored.role,
                to = %user.role,
                "session identity refreshed from account"
            );
            refresh_current_user(session, &user).await?;
            Ok(Some(user))
        }
        SessionCheck::Revoked => {
            tracing::info!(user_id = %stored.id, "session for deleted account cleared");
            clear_current_user(session).await?;
            Ok(None)
        }
    }
}

async fn request_user(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, AppError> {
    if let Some(ResolvedUser(user)) = parts.extensions.get::<ResolvedUser>() {
        return Ok(user.clone());
    }

    let user = match parts.extensions.get::<Session>() {
        Some(session) => resolve_current_user(session, state.pool()).await?,
        None => None,
    };
    parts.extensions.insert(ResolvedUser(user.clone()));
    Ok(user)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        request_user(parts, &state)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user = request_user(parts, &state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;
        if user.is_admin() {
            Ok(Self(user))
        } else {
            Err(AppError::Forbidden("Forbidden".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(request_user(parts, &state).await?))
    }
}

/// Store the signed-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be fixated.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Replace the stored user without cycling the session, e.g. after a role change.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn refresh_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Sign out: drop the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use openweed_core::{Email, UserId, UserRole};

    use super::*;

    fn account(role: UserRole) -> User {
        User {
            id: UserId::new(5),
            name: "Rae".to_string(),
            email: Email::parse("rae@openweed.dev").unwrap(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unchanged_account_keeps_session() {
        let stored = CurrentUser::from(&account(UserRole::Driver));
        assert_eq!(
            check_session(&stored, Some(&account(UserRole::Driver))),
            SessionCheck::Current(stored)
        );
    }

    #[test]
    fn test_demoted_admin_loses_admin_role() {
        let stored = CurrentUser::from(&account(UserRole::Admin));
        assert!(stored.is_admin());

        let SessionCheck::Stale(fresh) = check_session(&stored, Some(&account(UserRole::Buyer)))
        else {
            panic!("role change should mark the session stale");
        };
        assert_eq!(fresh.role, UserRole::Buyer);
        assert!(!fresh.is_admin());
        assert_eq!(fresh.id, stored.id);
    }

    #[test]
    fn test_promotion_reaches_open_session() {
        let stored = CurrentUser::from(&account(UserRole::Buyer));
        assert_eq!(
            check_session(&stored, Some(&account(UserRole::Driver))),
            SessionCheck::Stale(CurrentUser::from(&account(UserRole::Driver)))
        );
    }

    #[test]
    fn test_deleted_account_revokes_session() {
        let stored = CurrentUser::from(&account(UserRole::Admin));
        assert_eq!(check_session(&stored, None), SessionCheck::Revoked);
    }
}
