//! Driver profiles and the shapes they are listed in.

use chrono::{DateTime, Utc};
use serde::Serialize;

use openweed_core::{DriverHandle, DriverId, UserId};

use super::{Product, ProductSummary};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub user_id: UserId,
    pub handle: String,
    /// Zone key, e.g. `austin-central`.
    pub region: String,
    pub service_area: Option<String>,
    pub bio: Option<String>,
    pub license: Option<String>,
    pub license_type: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    /// Active and verified: visible to buyers and able to take orders.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.is_active && self.is_verified
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverOwner {
    pub name: String,
    pub email: String,
}

/// A driver in a list: owner, a preview of active products, and counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverListing {
    #[serde(flatten)]
    pub driver: Driver,
    pub user: DriverOwner,
    pub products: Vec<ProductSummary>,
    pub product_count: i64,
    pub order_count: i64,
}

/// A single driver with the full active catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverDetail {
    #[serde(flatten)]
    pub driver: Driver,
    pub user: DriverOwner,
    pub products: Vec<Product>,
    pub order_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewDriver {
    pub user_id: UserId,
    pub handle: DriverHandle,
    pub region: String,
    pub bio: Option<String>,
    pub license: Option<String>,
}

/// Partial profile update. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct DriverChanges {
    pub handle: Option<DriverHandle>,
    pub region: Option<String>,
    pub service_area: Option<String>,
    pub bio: Option<String>,
    pub license: Option<String>,
    pub license_type: Option<String>,
    pub avatar: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl DriverChanges {
    /// Whether the update touches admin-only flags.
    #[must_use]
    pub const fn touches_moderation(&self) -> bool {
        self.is_active.is_some() || self.is_verified.is_some()
    }
}
