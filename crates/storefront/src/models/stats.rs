//! Back-office aggregates.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use openweed_core::{OrderStatus, ProductId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_drivers: i64,
    pub active_drivers: i64,
    pub pending_verification: i64,
    pub pending_orders: i64,
    /// Sum of delivered order totals.
    pub revenue: Decimal,
    pub orders_by_status: BTreeMap<OrderStatus, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// `YYYY-MM`.
    pub month: String,
    pub revenue: Decimal,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub drivers: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub drivers_by_region: Vec<RegionCount>,
    pub top_products: Vec<TopProduct>,
}
