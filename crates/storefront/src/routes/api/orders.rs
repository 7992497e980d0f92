//! Order placement and fulfilment.
//!
//! ```text
//! GET   /api/orders?status=&driverId=
//! POST  /api/orders
//! GET   /api/orders/{id}
//! PATCH /api/orders/{id}
//! ```

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use openweed_core::ordering::LineRequest;
use openweed_core::{DriverId, OrderId, OrderStatus, UserRole};

use super::drivers::DRIVER_NOT_FOUND;
use super::{ApiJson, ApiPath, ApiQuery, non_blank};
use crate::db::{DriverRepository, OrderRepository, OrderRequest};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order, OrderChanges, OrderDetail};
use crate::services::orders::{authorize_update, can_view, visible_orders};
use crate::state::AppState;

const ORDER_NOT_FOUND: &str = "Order not found";
const MAX_NOTES_LENGTH: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub driver_id: Option<DriverId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub driver_id: DriverId,
    #[serde(default)]
    pub items: Vec<LineRequest>,
    pub notes: Option<String>,
    #[serde(default)]
    pub delivery_address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
}

fn validate_notes(notes: Option<String>) -> Result<Option<String>> {
    let notes = non_blank(notes);
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
    {
        return Err(AppError::BadRequest("Notes are too long".to_string()));
    }
    Ok(notes)
}

impl UpdateOrderRequest {
    fn into_changes(self) -> Result<OrderChanges> {
        Ok(OrderChanges {
            status: self.status,
            notes: validate_notes(self.notes)?,
            delivery_time: self.delivery_time,
        })
    }
}

/// The caller's own driver profile id, when they sell.
async fn own_driver_id(state: &AppState, user: &CurrentUser) -> Result<Option<DriverId>> {
    if user.role != UserRole::Driver {
        return Ok(None);
    }
    Ok(DriverRepository::new(state.pool())
        .get_by_user(user.id)
        .await?
        .map(|driver| driver.id))
}

async fn load_order(state: &AppState, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))
}

async fn load_detail(state: &AppState, id: OrderId) -> Result<OrderDetail> {
    OrderRepository::new(state.pool())
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))
}

/// GET /api/orders
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Json<Vec<OrderDetail>>> {
    let own_driver = own_driver_id(&state, &user).await?;
    let Some(filter) = visible_orders(&user, own_driver, query.driver_id, query.status) else {
        return Ok(Json(Vec::new()));
    };
    let orders = OrderRepository::new(state.pool()).list(filter).await?;
    Ok(Json(orders))
}

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    DriverRepository::new(state.pool())
        .get(req.driver_id)
        .await?
        .filter(|driver| driver.is_live())
        .ok_or_else(|| AppError::NotFound(DRIVER_NOT_FOUND.to_string()))?;

    let delivery_address = req.delivery_address.trim().to_string();
    if delivery_address.is_empty() {
        return Err(AppError::BadRequest(
            "Delivery address is required".to_string(),
        ));
    }

    let request = OrderRequest {
        buyer_id: user.id,
        driver_id: req.driver_id,
        lines: req.items,
        delivery_address,
        notes: validate_notes(req.notes)?,
    };
    let order = OrderRepository::new(state.pool()).place(&request).await?;

    tracing::info!(
        order_id = %order.order.id,
        buyer_id = %user.id,
        driver_id = %order.order.driver_id,
        total = %order.order.total,
        "order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = load_order(&state, id).await?;
    let own_driver = own_driver_id(&state, &user).await?;
    if !can_view(&user, own_driver, &order) {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }
    Ok(Json(load_detail(&state, id).await?))
}

/// PATCH /api/orders/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<UpdateOrderRequest>,
) -> Result<Json<OrderDetail>> {
    let order = load_order(&state, id).await?;
    let own_driver = own_driver_id(&state, &user).await?;
    let changes = req.into_changes()?;
    authorize_update(&user, own_driver, &order, &changes)?;

    let updated = OrderRepository::new(state.pool())
        .update(id, &changes)
        .await?;
    tracing::info!(
        order_id = %id,
        by = %user.id,
        from = %order.status,
        to = %updated.status,
        "order updated"
    );

    Ok(Json(load_detail(&state, id).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use openweed_core::ProductId;

    use super::*;

    #[test]
    fn test_create_request_shape() {
        let req: CreateOrderRequest = serde_json::from_str(
            r#"{"driverId":3,"items":[{"productId":9,"quantity":2}],"deliveryAddress":"1 Congress Ave"}"#,
        )
        .unwrap();
        assert_eq!(req.driver_id, DriverId::new(3));
        assert_eq!(req.items.len(), 1);
        assert_eq!(req.items[0].product_id, ProductId::new(9));
        assert_eq!(req.items[0].quantity, 2);
    }

    #[test]
    fn test_update_request_parses_status() {
        let req: UpdateOrderRequest =
            serde_json::from_str(r#"{"status":"OUT_FOR_DELIVERY","notes":"  "}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.status, Some(OrderStatus::OutForDelivery));
        assert_eq!(changes.notes, None);
    }

    #[test]
    fn test_notes_length() {
        assert!(validate_notes(Some("x".repeat(MAX_NOTES_LENGTH + 1))).is_err());
        assert!(validate_notes(Some("ring twice".into())).is_ok());
    }
}
