//! Zone search by ZIP code or coordinates.
//!
//! ```text
//! GET /api/geo?zipCode=78704
//! GET /api/geo?lat=30.26&lng=-97.74
//! GET /api/zones
//! ```

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use openweed_core::geo::{
    Coordinates, DEFAULT_ZONE_KEY, DEFAULT_ZONE_NAME, MapBounds, ServiceArea, bounds,
    default_zone_for_zip, format_zip, haversine_miles, is_valid_zip, nearest_zone, within_radius,
    zip_coordinates,
};

use super::ApiQuery;
use crate::db::DriverRepository;
use crate::error::{AppError, Result};
use crate::models::{DriverListing, Zone};
use crate::state::AppState;

/// Zones whose centers fall within this many miles are listed as nearby.
const NEARBY_RADIUS_MILES: f64 = 25.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoQuery {
    pub zip_code: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub key: String,
    pub name: String,
}

impl From<&Zone> for ZoneSummary {
    fn from(zone: &Zone) -> Self {
        Self {
            key: zone.key.clone(),
            name: zone.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyZone {
    pub key: String,
    pub name: String,
    pub distance_miles: f64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GeoResponse {
    #[serde(rename_all = "camelCase")]
    Zip {
        zip_code: String,
        coordinates: Coordinates,
        zone: ZoneSummary,
        drivers: Vec<DriverListing>,
    },
    #[serde(rename_all = "camelCase")]
    Point {
        coordinates: Coordinates,
        zone: Option<ZoneSummary>,
        distance_miles: Option<f64>,
        nearby_zones: Vec<NearbyZone>,
        drivers: Vec<DriverListing>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesResponse {
    pub zones: Vec<Zone>,
    pub bounds: MapBounds,
    pub mapbox_token: Option<String>,
}

/// Zone for a ZIP: the first active zone listing it, else the built-in default.
pub fn zone_for_zip(zones: &[Zone], zip: &str) -> Option<ZoneSummary> {
    if let Some(zone) = zones.iter().find(|zone| zone.serves_zip(zip)) {
        return Some(zone.into());
    }
    let key = default_zone_for_zip(zip)?;
    Some(
        zones
            .iter()
            .find(|zone| zone.key == key)
            .map_or_else(
                || ZoneSummary {
                    key: DEFAULT_ZONE_KEY.to_string(),
                    name: DEFAULT_ZONE_NAME.to_string(),
                },
                ZoneSummary::from,
            ),
    )
}

fn parse_coordinates(lat: &str, lng: &str) -> Result<Coordinates> {
    let invalid = || AppError::BadRequest("Invalid coordinates".to_string());
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    let point = Coordinates::new(lat, lng);
    if point.is_valid() {
        Ok(point)
    } else {
        Err(invalid())
    }
}

/// GET /api/geo
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GeoQuery>,
) -> Result<Json<GeoResponse>> {
    let drivers = DriverRepository::new(state.pool());

    if let Some(raw) = query.zip_code.as_deref().map(str::trim) {
        let invalid = || AppError::BadRequest("Invalid ZIP code".to_string());
        if !is_valid_zip(raw) {
            return Err(invalid());
        }
        let zip = format_zip(raw);
        let coordinates = zip_coordinates(zip).ok_or_else(invalid)?;

        let zones = state.active_zones().await?;
        let zone = zone_for_zip(zones.as_slice(), zip).ok_or_else(invalid)?;
        let drivers = drivers.list_live(Some(&zone.key)).await?;

        return Ok(Json(GeoResponse::Zip {
            zip_code: zip.to_string(),
            coordinates,
            zone,
            drivers,
        }));
    }

    let (Some(lat), Some(lng)) = (query.lat.as_deref(), query.lng.as_deref()) else {
        return Err(AppError::BadRequest("Missing parameters".to_string()));
    };
    let point = parse_coordinates(lat, lng)?;

    let zones = state.active_zones().await?;
    let nearby_zones = within_radius(point, zones.iter(), NEARBY_RADIUS_MILES)
        .into_iter()
        .map(|(zone, distance)| NearbyZone {
            key: zone.key.clone(),
            name: zone.name.clone(),
            distance_miles: distance,
        })
        .collect();

    let Some((zone, _)) = nearest_zone(point, zones.as_slice()) else {
        return Ok(Json(GeoResponse::Point {
            coordinates: point,
            zone: None,
            distance_miles: None,
            nearby_zones,
            drivers: Vec::new(),
        }));
    };

    let distance_miles = haversine_miles(point, zone.center());
    let listings = drivers.list_live(Some(&zone.key)).await?;
    Ok(Json(GeoResponse::Point {
        coordinates: point,
        zone: Some(zone.into()),
        distance_miles: Some(distance_miles),
        nearby_zones,
        drivers: listings,
    }))
}

/// GET /api/zones
pub async fn zones(State(state): State<AppState>) -> Result<Json<ZonesResponse>> {
    let zones = state.active_zones().await?;
    let centers: Vec<Coordinates> = zones.iter().map(|zone| zone.center()).collect();

    Ok(Json(ZonesResponse {
        bounds: bounds(&centers),
        zones: zones.as_ref().clone(),
        mapbox_token: state.config().mapbox_public_token.clone(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use openweed_core::ZoneId;

    use super::*;

    fn zone(key: &str, zips: &[&str]) -> Zone {
        Zone {
            id: ZoneId::new(1),
            key: key.to_string(),
            name: key.to_uppercase(),
            zip_codes: zips.iter().map(ToString::to_string).collect(),
            center_lat: 30.25,
            center_lng: -97.75,
            radius: 10.0,
            is_active: true,
        }
    }

    #[test]
    fn test_configured_zone_wins() {
        let zones = vec![zone("south-congress", &["78704"])];
        assert_eq!(zone_for_zip(&zones, "78704").unwrap().key, "south-congress");
    }

    #[test]
    fn test_falls_back_to_default_zone() {
        let summary = zone_for_zip(&[], "78701").unwrap();
        assert_eq!(summary.key, DEFAULT_ZONE_KEY);
        assert_eq!(summary.name, DEFAULT_ZONE_NAME);

        let configured = vec![zone(DEFAULT_ZONE_KEY, &[])];
        assert_eq!(
            zone_for_zip(&configured, "78701").unwrap().name,
            DEFAULT_ZONE_KEY.to_uppercase()
        );
    }

    #[test]
    fn test_unknown_zip_has_no_zone() {
        assert!(zone_for_zip(&[], "10001").is_none());
    }

    #[test]
    fn test_parse_coordinates() {
        assert!(parse_coordinates("30.26", "-97.74").is_ok());
        assert!(parse_coordinates("abc", "-97.74").is_err());
        assert!(parse_coordinates("91", "0").is_err());
        assert!(parse_coordinates("NaN", "0").is_err());
    }
}
