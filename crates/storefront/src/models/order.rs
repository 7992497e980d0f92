//! Orders and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use openweed_core::{
    DriverId, OrderId, OrderItemId, OrderStatus, ProductCategory, ProductId, UserId,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub driver_id: DriverId,
    pub total: Decimal,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub notes: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderParty {
    pub name: String,
    pub email: String,
}

/// Account behind a driver profile, as shown on an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDriverUser {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDriver {
    pub handle: String,
    pub region: String,
    pub user: OrderDriverUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemProduct {
    pub name: String,
    pub photo: Option<String>,
    pub category: ProductCategory,
}

/// A line item. `price` is the unit price paid, not the current list price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetail {
    pub id: OrderItemId,
    #[serde(skip)]
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub product: OrderItemProduct,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub buyer: OrderParty,
    pub driver: OrderDriver,
    pub items: Vec<OrderItemDetail>,
}

/// Fields an order update may touch. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
}

impl OrderChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none() && self.delivery_time.is_none()
    }
}
