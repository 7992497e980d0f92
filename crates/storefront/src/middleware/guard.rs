//! Route-prefix authorization.
//!
//! Coarse role checks run before any handler so that unauthenticated writes
//! never reach the database. Ownership is checked later, in the handlers.
//!
//! | prefix | rule |
//! |---|---|
//! | `/api/admin` | admin session |
//! | `/api/drivers`, `/api/products` (non-GET) | driver or admin session |
//! | `/api/orders`, `/api/onboard` | any session |
//! | `/api/chat` (non-GET) | any session |

use axum::{
    Json,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use openweed_core::UserRole;

use super::auth::{ResolvedUser, resolve_current_user};
use crate::state::AppState;

/// What a request needs from the session before it may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Seller,
    Admin,
}

impl Access {
    /// Whether a session with `role` (or none) satisfies this rule.
    #[must_use]
    pub const fn allows(self, role: Option<UserRole>) -> bool {
        match (self, role) {
            (Self::Public, _) => true,
            (_, None) => false,
            (Self::Authenticated, Some(_)) => true,
            (Self::Seller, Some(role)) => role.can_sell(),
            (Self::Admin, Some(role)) => role.is_admin(),
        }
    }
}

fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// The rule for a method and path.
#[must_use]
pub fn required_access(method: &Method, path: &str) -> Access {
    let read = method == Method::GET || method == Method::HEAD;

    if under(path, "/api/admin") {
        Access::Admin
    } else if under(path, "/api/drivers") || under(path, "/api/products") {
        if read {
            Access::Public
        } else {
            Access::Seller
        }
    } else if under(path, "/api/orders") || under(path, "/api/onboard") {
        Access::Authenticated
    } else if under(path, "/api/chat") {
        if read {
            Access::Public
        } else {
            Access::Authenticated
        }
    } else {
        Access::Public
    }
}

/// Reject requests whose session does not satisfy [`required_access`].
///
/// The role comes from the account row, not from the session copy, so a
/// role change applies to sessions that are already open. Must run inside
/// the session layer.
pub async fn route_guard_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let access = required_access(request.method(), request.uri().path());
    if access == Access::Public {
        return next.run(request).await;
    }

    let user = match request.extensions().get::<Session>() {
        Some(session) => match resolve_current_user(session, state.pool()).await {
            Ok(user) => user,
            Err(err) => return err.into_response(),
        },
        None => None,
    };

    if access.allows(user.as_ref().map(|user| user.role)) {
        request.extensions_mut().insert(ResolvedUser(user));
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), ?access, "route guard rejected request");
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_prefix() {
        assert_eq!(required_access(&Method::GET, "/api/admin/stats"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/api/admin"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/api/administrators"), Access::Public);
    }

    #[test]
    fn test_catalog_reads_are_public() {
        assert_eq!(required_access(&Method::GET, "/api/drivers"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/api/products/4"), Access::Public);
        assert_eq!(required_access(&Method::POST, "/api/products"), Access::Seller);
        assert_eq!(required_access(&Method::DELETE, "/api/drivers/2"), Access::Seller);
    }

    #[test]
    fn test_orders_and_onboarding_need_session() {
        assert_eq!(required_access(&Method::GET, "/api/orders"), Access::Authenticated);
        assert_eq!(required_access(&Method::GET, "/api/onboard/status"), Access::Authenticated);
        assert_eq!(required_access(&Method::GET, "/api/chat"), Access::Public);
        assert_eq!(required_access(&Method::POST, "/api/chat"), Access::Authenticated);
    }

    #[test]
    fn test_allows() {
        assert!(Access::Public.allows(None));
        assert!(!Access::Authenticated.allows(None));
        assert!(Access::Authenticated.allows(Some(UserRole::Buyer)));
        assert!(!Access::Seller.allows(Some(UserRole::Buyer)));
        assert!(Access::Seller.allows(Some(UserRole::Driver)));
        assert!(Access::Seller.allows(Some(UserRole::Admin)));
        assert!(!Access::Admin.allows(Some(UserRole::Driver)));
    }
}
