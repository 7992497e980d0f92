//! Back-office aggregates and health counts.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::PgPool;

use openweed_core::{OrderStatus, ProductId};

use super::RepositoryError;
use super::drivers::{DriverStatusFilter, LIVE_CONDITION};
use crate::models::{Analytics, DashboardStats, MonthlyRevenue, RegionCount, TopProduct};

/// Months covered by [`StatsRepository::analytics`].
const ANALYTICS_MONTHS: i32 = 12;
const TOP_PRODUCTS: i64 = 5;

#[derive(Debug, sqlx::FromRow)]
struct DriverCountsRow {
    total: i64,
    active: i64,
    pending: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct MonthlyRow {
    month: String,
    revenue: Decimal,
    orders: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct RegionRow {
    region: String,
    drivers: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: ProductId,
    name: String,
    quantity_sold: i64,
    revenue: Decimal,
}

pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, RepositoryError> {
        let drivers = sqlx::query_as::<_, DriverCountsRow>(&format!(
            r"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE {active}) AS active,
                   COUNT(*) FILTER (WHERE {pending}) AS pending
            FROM marketplace.driver_profile d
            ",
            active = DriverStatusFilter::Active.condition(),
            pending = DriverStatusFilter::Pending.condition(),
        ))
        .fetch_one(self.pool)
        .await?;

        let by_status: Vec<(OrderStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM marketplace.customer_order GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let revenue: Decimal = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(total), 0)
            FROM marketplace.customer_order
            WHERE status = 'DELIVERED'
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let mut orders_by_status: BTreeMap<OrderStatus, i64> =
            OrderStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        orders_by_status.extend(by_status);

        Ok(DashboardStats {
            total_drivers: drivers.total,
            active_drivers: drivers.active,
            pending_verification: drivers.pending,
            pending_orders: orders_by_status
                .get(&OrderStatus::Pending)
                .copied()
                .unwrap_or_default(),
            revenue,
            orders_by_status,
        })
    }

    /// Revenue per month, drivers per region, and best sellers.
    ///
    /// Only delivered orders count toward revenue and sales.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn analytics(&self) -> Result<Analytics, RepositoryError> {
        let months = sqlx::query_as::<_, MonthlyRow>(
            r"
            SELECT to_char(date_trunc('month', created_at), 'YYYY-MM') AS month,
                   COALESCE(SUM(total), 0) AS revenue,
                   COUNT(*) AS orders
            FROM marketplace.customer_order
            WHERE status = 'DELIVERED'
              AND created_at >= date_trunc('month', NOW()) - make_interval(months => $1 - 1)
            GROUP BY 1
            ORDER BY 1
            ",
        )
        .bind(ANALYTICS_MONTHS)
        .fetch_all(self.pool)
        .await?;

        let regions = sqlx::query_as::<_, RegionRow>(
            r"
            SELECT region, COUNT(*) AS drivers
            FROM marketplace.driver_profile
            GROUP BY region
            ORDER BY drivers DESC, region
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let top = sqlx::query_as::<_, TopProductRow>(
            r"
            SELECT p.id AS product_id, p.name,
                   SUM(i.quantity)::bigint AS quantity_sold,
                   SUM(i.quantity * i.price) AS revenue
            FROM marketplace.order_item i
            JOIN marketplace.customer_order o ON o.id = i.order_id
            JOIN marketplace.product p ON p.id = i.product_id
            WHERE o.status = 'DELIVERED'
            GROUP BY p.id, p.name
            ORDER BY quantity_sold DESC, p.id
            LIMIT $1
            ",
        )
        .bind(TOP_PRODUCTS)
        .fetch_all(self.pool)
        .await?;

        Ok(Analytics {
            revenue_by_month: months
                .into_iter()
                .map(|r| MonthlyRevenue {
                    month: r.month,
                    revenue: r.revenue,
                    orders: r.orders,
                })
                .collect(),
            drivers_by_region: regions
                .into_iter()
                .map(|r| RegionCount {
                    region: r.region,
                    drivers: r.drivers,
                })
                .collect(),
            top_products: top
                .into_iter()
                .map(|r| TopProduct {
                    product_id: r.product_id,
                    name: r.name,
                    quantity_sold: r.quantity_sold,
                    revenue: r.revenue,
                })
                .collect(),
        })
    }

    /// Live driver and active product counts for the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn catalog_counts(&self) -> Result<(i64, i64), RepositoryError> {
        let counts: (i64, i64) = sqlx::query_as(&format!(
            r"
            SELECT
                (SELECT COUNT(*) FROM marketplace.driver_profile d WHERE {LIVE_CONDITION}),
                (SELECT COUNT(*) FROM marketplace.product WHERE is_active)
            "
        ))
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }
}
