//! Service zones.

use serde::{Deserialize, Serialize};

use openweed_core::ZoneId;
use openweed_core::geo::{Coordinates, Located, ServiceArea};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: ZoneId,
    /// Region key shared with driver profiles and lounge rooms.
    pub key: String,
    pub name: String,
    pub zip_codes: Vec<String>,
    pub center_lat: f64,
    pub center_lng: f64,
    /// Miles.
    pub radius: f64,
    pub is_active: bool,
}

impl Zone {
    #[must_use]
    pub fn serves_zip(&self, zip: &str) -> bool {
        self.zip_codes.iter().any(|z| z == zip)
    }
}

impl Located for Zone {
    fn position(&self) -> Coordinates {
        self.center()
    }
}

impl ServiceArea for Zone {
    fn center(&self) -> Coordinates {
        Coordinates::new(self.center_lat, self.center_lng)
    }

    fn radius_miles(&self) -> f64 {
        self.radius
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewZone {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub zip_codes: Vec<String>,
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChanges {
    pub name: Option<String>,
    pub zip_codes: Option<Vec<String>>,
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub radius: Option<f64>,
    pub is_active: Option<bool>,
}

const fn default_true() -> bool {
    true
}
