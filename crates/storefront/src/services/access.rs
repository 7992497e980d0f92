//! Ownership checks.
//!
//! Route guards only know the caller's role. Whether the caller owns the
//! driver profile, product, or order being touched is decided here.

use crate::error::AppError;
use crate::models::{CurrentUser, Driver};

/// Admins manage every profile; drivers only their own.
#[must_use]
pub fn can_manage_driver(user: &CurrentUser, driver: &Driver) -> bool {
    user.is_admin() || driver.user_id == user.id
}

/// # Errors
///
/// `AppError::Forbidden` unless [`can_manage_driver`] holds.
pub fn ensure_can_manage_driver(user: &CurrentUser, driver: &Driver) -> Result<(), AppError> {
    if can_manage_driver(user, driver) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Forbidden".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use openweed_core::{DriverId, Email, UserId, UserRole};

    use super::*;

    fn user(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("someone@example.com").unwrap(),
            name: "Someone".to_string(),
            role,
        }
    }

    fn driver_owned_by(owner: i32) -> Driver {
        Driver {
            id: DriverId::new(1),
            user_id: UserId::new(owner),
            handle: "atxweedog".to_string(),
            region: "austin-central".to_string(),
            service_area: None,
            bio: None,
            license: None,
            license_type: None,
            avatar: None,
            is_active: true,
            is_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_and_admin_can_manage() {
        let driver = driver_owned_by(5);
        assert!(can_manage_driver(&user(5, UserRole::Driver), &driver));
        assert!(can_manage_driver(&user(1, UserRole::Admin), &driver));
        assert!(!can_manage_driver(&user(6, UserRole::Driver), &driver));
        assert!(ensure_can_manage_driver(&user(6, UserRole::Buyer), &driver).is_err());
    }
}
