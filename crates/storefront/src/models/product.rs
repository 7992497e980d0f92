//! Catalog items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use openweed_core::{DriverId, ProductCategory, ProductId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub driver_id: DriverId,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub price: Decimal,
    pub photo: Option<String>,
    pub stock: i32,
    pub thc: Option<f64>,
    pub cbd: Option<f64>,
    pub strain: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Card-sized product preview used inside driver listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    #[serde(skip)]
    pub driver_id: DriverId,
    pub name: String,
    pub category: ProductCategory,
    pub price: Decimal,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDriver {
    pub handle: String,
    pub region: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub driver: ProductDriver,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub driver_id: DriverId,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub price: Decimal,
    pub photo: Option<String>,
    pub stock: i32,
    pub thc: Option<f64>,
    pub cbd: Option<f64>,
    pub strain: Option<String>,
}

/// Partial product update. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub price: Option<Decimal>,
    pub photo: Option<String>,
    pub stock: Option<i32>,
    pub thc: Option<f64>,
    pub cbd: Option<f64>,
    pub strain: Option<String>,
    pub is_active: Option<bool>,
}
