//! Order repository.
//!
//! Placing and cancelling orders are the only writes that span several
//! rows. Both run in one transaction with the affected product rows locked,
//! so stock never goes negative and no half-written order is ever visible.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use openweed_core::ordering::{LineRequest, OrderLineError, ProductSnapshot, price_order};
use openweed_core::{
    DriverId, OrderId, OrderItemId, OrderStatus, ProductCategory, ProductId, UserId,
};

use super::RepositoryError;
use crate::models::order::{OrderDriverUser, OrderItemProduct};
use crate::models::{Order, OrderChanges, OrderDetail, OrderDriver, OrderItemDetail, OrderParty};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The request itself is unacceptable (empty, unavailable product, stock).
    #[error(transparent)]
    Rejected(#[from] OrderLineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

#[derive(Debug, Error)]
pub enum OrderUpdateError {
    #[error("order not found")]
    NotFound,

    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderUpdateError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    buyer_id: UserId,
    driver_id: DriverId,
    total: Decimal,
    status: OrderStatus,
    delivery_address: String,
    notes: Option<String>,
    delivery_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            buyer_id: row.buyer_id,
            driver_id: row.driver_id,
            total: row.total,
            status: row.status,
            delivery_address: row.delivery_address,
            notes: row.notes,
            delivery_time: row.delivery_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    #[sqlx(flatten)]
    order: OrderRow,
    buyer_name: String,
    buyer_email: String,
    driver_handle: String,
    driver_region: String,
    driver_owner_name: String,
}

impl OrderDetailRow {
    fn into_detail(self, items: Vec<OrderItemDetail>) -> OrderDetail {
        OrderDetail {
            items,
            buyer: OrderParty {
                name: self.buyer_name,
                email: self.buyer_email,
            },
            driver: OrderDriver {
                handle: self.driver_handle,
                region: self.driver_region,
                user: OrderDriverUser {
                    name: self.driver_owner_name,
                },
            },
            order: self.order.into(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
    product_name: String,
    product_photo: Option<String>,
    product_category: ProductCategory,
}

impl From<OrderItemRow> for OrderItemDetail {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: row.price,
            product: OrderItemProduct {
                name: row.product_name,
                photo: row.product_photo,
                category: row.product_category,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    id: ProductId,
    driver_id: DriverId,
    price: Decimal,
    stock: i32,
    is_active: bool,
}

impl From<SnapshotRow> for ProductSnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            id: row.id,
            driver_id: row.driver_id,
            price: row.price,
            stock: row.stock,
            is_active: row.is_active,
        }
    }
}

const ORDER_COLUMNS: &str = "o.id, o.buyer_id, o.driver_id, o.total, o.status, \
     o.delivery_address, o.notes, o.delivery_time, o.created_at, o.updated_at";

const DETAIL_SELECT: &str = r"
    SELECT o.id, o.buyer_id, o.driver_id, o.total, o.status,
           o.delivery_address, o.notes, o.delivery_time, o.created_at, o.updated_at,
           b.name AS buyer_name, b.email AS buyer_email,
           d.handle AS driver_handle, d.region AS driver_region,
           du.name AS driver_owner_name
    FROM marketplace.customer_order o
    JOIN marketplace.user_account b ON b.id = o.buyer_id
    JOIN marketplace.driver_profile d ON d.id = o.driver_id
    JOIN marketplace.user_account du ON du.id = d.user_id
";

/// Visibility and status filters for order lists, combined with AND.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub buyer_id: Option<UserId>,
    pub driver_id: Option<DriverId>,
    pub status: Option<OrderStatus>,
}

/// What an order placement needs beyond the line items.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub buyer_id: UserId,
    pub driver_id: DriverId,
    pub lines: Vec<LineRequest>,
    pub delivery_address: String,
    pub notes: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM marketplace.customer_order o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderDetailRow>(&format!("{DETAIL_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut details = self.attach_items(vec![row]).await?;
        Ok(details.pop())
    }

    /// Orders matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<OrderDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderDetailRow>(&format!(
            r"{DETAIL_SELECT}
            WHERE ($1::int IS NULL OR o.buyer_id = $1)
              AND ($2::int IS NULL OR o.driver_id = $2)
              AND ($3::marketplace.order_status IS NULL OR o.status = $3)
            ORDER BY o.created_at DESC
            "
        ))
        .bind(filter.buyer_id)
        .bind(filter.driver_id)
        .bind(filter.status)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Validate, price, and record an order, taking its items out of stock.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Rejected` when the line items fail validation
    /// against the locked product rows. Nothing is written in that case.
    pub async fn place(&self, request: &OrderRequest) -> Result<OrderDetail, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        // Lock in id order so concurrent orders over the same products can't deadlock.
        let ids: Vec<ProductId> = request
            .lines
            .iter()
            .map(|line| line.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let snapshots: Vec<ProductSnapshot> = sqlx::query_as::<_, SnapshotRow>(
            r"
            SELECT id, driver_id, price, stock, is_active
            FROM marketplace.product
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

        let priced = price_order(request.driver_id, &request.lines, &snapshots)?;

        let order_id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO marketplace.customer_order
                (buyer_id, driver_id, total, delivery_address, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(request.buyer_id)
        .bind(request.driver_id)
        .bind(priced.total)
        .bind(&request.delivery_address)
        .bind(request.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for line in &priced.lines {
            sqlx::query(
                r"
                INSERT INTO marketplace.order_item (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        for (product_id, quantity) in priced.stock_deltas() {
            let result = sqlx::query(
                r"
                UPDATE marketplace.product
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(OrderLineError::InsufficientStock(product_id).into());
            }
        }

        tx.commit().await?;

        self.get_detail(order_id)
            .await?
            .ok_or(PlaceOrderError::Repository(RepositoryError::NotFound))
    }

    /// Apply status, notes, and delivery time changes under a row lock.
    ///
    /// A move to `CANCELLED` puts every item back into stock in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderUpdateError::InvalidTransition` when the status change is
    /// not allowed from the order's current status.
    pub async fn update(
        &self,
        id: OrderId,
        changes: &OrderChanges,
    ) -> Result<Order, OrderUpdateError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus = sqlx::query_scalar(
            "SELECT status FROM marketplace.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(OrderUpdateError::NotFound)?;

        if let Some(next) = changes.status
            && !current.can_transition_to(next)
        {
            return Err(OrderUpdateError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE marketplace.customer_order o
            SET status = COALESCE($2, o.status),
                notes = COALESCE($3, o.notes),
                delivery_time = COALESCE($4, o.delivery_time),
                updated_at = NOW()
            WHERE o.id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.status)
        .bind(changes.notes.as_deref())
        .bind(changes.delivery_time)
        .fetch_one(&mut *tx)
        .await?;

        if changes.status == Some(OrderStatus::Cancelled) && current != OrderStatus::Cancelled {
            sqlx::query(
                r"
                UPDATE marketplace.product p
                SET stock = p.stock + restock.quantity, updated_at = NOW()
                FROM (
                    SELECT product_id, SUM(quantity)::int AS quantity
                    FROM marketplace.order_item
                    WHERE order_id = $1
                    GROUP BY product_id
                ) AS restock
                WHERE p.id = restock.product_id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn attach_items(
        &self,
        rows: Vec<OrderDetailRow>,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT i.id, i.order_id, i.product_id, i.quantity, i.price,
                   p.name AS product_name, p.photo AS product_photo,
                   p.category AS product_category
            FROM marketplace.order_item i
            JOIN marketplace.product p ON p.id = i.product_id
            WHERE i.order_id = ANY($1)
            ORDER BY i.id
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItemDetail>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.order.id).unwrap_or_default();
                row.into_detail(items)
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn detail_row() -> OrderDetailRow {
        OrderDetailRow {
            order: OrderRow {
                id: OrderId::new(9),
                buyer_id: UserId::new(3),
                driver_id: DriverId::new(2),
                total: Decimal::new(7000, 2),
                status: OrderStatus::Pending,
                delivery_address: "1100 Congress Ave".to_string(),
                notes: None,
                delivery_time: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            buyer_name: "Sam Buyer".to_string(),
            buyer_email: "buyer@openweed.dev".to_string(),
            driver_handle: "atxweedog".to_string(),
            driver_region: "austin-central".to_string(),
            driver_owner_name: "Dee Driver".to_string(),
        }
    }

    #[test]
    fn test_detail_carries_driver_owner_and_item_category() {
        let item = OrderItemRow {
            id: OrderItemId::new(1),
            order_id: OrderId::new(9),
            product_id: ProductId::new(4),
            quantity: 2,
            price: Decimal::new(3500, 2),
            product_name: "Blue Dream".to_string(),
            product_photo: None,
            product_category: ProductCategory::Flower,
        };
        let detail = detail_row().into_detail(vec![item.into()]);
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["id"], 9);
        assert_eq!(json["buyer"]["name"], "Sam Buyer");
        assert_eq!(json["driver"]["handle"], "atxweedog");
        assert_eq!(json["driver"]["user"]["name"], "Dee Driver");
        assert_eq!(json["items"][0]["product"]["category"], "FLOWER");
        assert_eq!(json["items"][0]["productId"], 4);
    }
}
