//! Order visibility and update rules.
//!
//! | caller | sees | may change |
//! |---|---|---|
//! | admin | every order | status, notes, delivery time |
//! | driver | orders placed with their profile | status, notes, delivery time |
//! | buyer | orders they placed | cancellation (with notes) only |
//!
//! Status changes are additionally checked against the lifecycle when the
//! row is locked for update.

use openweed_core::{DriverId, OrderStatus, UserRole};

use crate::db::OrderFilter;
use crate::error::AppError;
use crate::models::{CurrentUser, Order, OrderChanges};

/// Build the list filter for a caller.
///
/// `own_driver` is the caller's driver profile, if they have one. `None`
/// means the caller can see nothing matching the request.
#[must_use]
pub fn visible_orders(
    user: &CurrentUser,
    own_driver: Option<DriverId>,
    requested_driver: Option<DriverId>,
    status: Option<OrderStatus>,
) -> Option<OrderFilter> {
    match user.role {
        UserRole::Admin => Some(OrderFilter {
            buyer_id: None,
            driver_id: requested_driver,
            status,
        }),
        UserRole::Driver => {
            let own = own_driver?;
            if requested_driver.is_some_and(|d| d != own) {
                return None;
            }
            Some(OrderFilter {
                buyer_id: None,
                driver_id: Some(own),
                status,
            })
        }
        UserRole::Buyer => Some(OrderFilter {
            buyer_id: Some(user.id),
            driver_id: requested_driver,
            status,
        }),
    }
}

#[must_use]
pub fn can_view(user: &CurrentUser, own_driver: Option<DriverId>, order: &Order) -> bool {
    user.is_admin() || order.buyer_id == user.id || own_driver == Some(order.driver_id)
}

/// # Errors
///
/// `AppError::Forbidden` when the caller may not apply `changes` to `order`,
/// `AppError::BadRequest` for an empty update.
pub fn authorize_update(
    user: &CurrentUser,
    own_driver: Option<DriverId>,
    order: &Order,
    changes: &OrderChanges,
) -> Result<(), AppError> {
    if changes.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    if user.is_admin() || own_driver == Some(order.driver_id) {
        return Ok(());
    }
    if order.buyer_id == user.id {
        let cancelling = changes.status == Some(OrderStatus::Cancelled);
        if cancelling && changes.delivery_time.is_none() {
            return Ok(());
        }
        return Err(AppError::Forbidden(
            "Buyers can only cancel their orders".to_string(),
        ));
    }
    Err(AppError::Forbidden("Forbidden".to_string()))
}
