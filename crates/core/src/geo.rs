//! Geographic helpers for zone search.
//!
//! Two distance measures are used on purpose:
//! - [`haversine_miles`] for anything shown to a user in miles
//! - [`planar_degrees`] for nearest-zone matching, where a zone's radius is
//!   converted to degrees at [`MILES_PER_DEGREE`]
//!
//! The ZIP table covers the Austin launch area only. Every listed ZIP maps to
//! the `austin-central` zone until more zones are configured.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Mean earth radius used by [`haversine_miles`].
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Approximate miles per degree of latitude.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Zone key every known ZIP falls back to.
pub const DEFAULT_ZONE_KEY: &str = "austin-central";

pub const DEFAULT_ZONE_NAME: &str = "Austin Central";

/// Map box shown when there is nothing to frame.
pub const DEFAULT_BOUNDS: MapBounds = MapBounds {
    north: 30.3,
    south: 30.2,
    east: -97.7,
    west: -97.8,
};

static ZIP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d{5}(-\d{4})?$").expect("valid ZIP regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within -90..=90 / -180..=180.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

const DOWNTOWN: Coordinates = Coordinates::new(30.2672, -97.7431);
const SOUTH_AUSTIN: Coordinates = Coordinates::new(30.2303, -97.7717);

/// Austin ZIP codes with approximate centroids.
const ZIP_TABLE: &[(&str, Coordinates)] = &[
    ("78701", DOWNTOWN),
    ("78702", DOWNTOWN),
    ("78703", DOWNTOWN),
    ("78704", SOUTH_AUSTIN),
    ("78705", DOWNTOWN),
    ("78712", DOWNTOWN),
    ("78721", DOWNTOWN),
    ("78722", DOWNTOWN),
    ("78723", DOWNTOWN),
    ("78724", DOWNTOWN),
    ("78725", DOWNTOWN),
    ("78726", DOWNTOWN),
    ("78727", DOWNTOWN),
    ("78728", DOWNTOWN),
    ("78729", DOWNTOWN),
    ("78730", DOWNTOWN),
    ("78731", DOWNTOWN),
    ("78732", DOWNTOWN),
    ("78733", DOWNTOWN),
    ("78734", DOWNTOWN),
    ("78735", DOWNTOWN),
    ("78736", DOWNTOWN),
    ("78737", DOWNTOWN),
    ("78738", DOWNTOWN),
    ("78739", DOWNTOWN),
    ("78741", DOWNTOWN),
    ("78742", DOWNTOWN),
    ("78744", DOWNTOWN),
    ("78745", DOWNTOWN),
    ("78746", DOWNTOWN),
    ("78747", DOWNTOWN),
    ("78748", DOWNTOWN),
    ("78749", DOWNTOWN),
    ("78750", DOWNTOWN),
    ("78751", DOWNTOWN),
    ("78752", DOWNTOWN),
    ("78753", DOWNTOWN),
    ("78754", DOWNTOWN),
    ("78756", DOWNTOWN),
    ("78757", DOWNTOWN),
    ("78758", DOWNTOWN),
    ("78759", DOWNTOWN),
];

/// Anything with a center and a service radius.
pub trait ServiceArea {
    fn center(&self) -> Coordinates;
    fn radius_miles(&self) -> f64;
}

/// Anything with a position on the map.
pub trait Located {
    fn position(&self) -> Coordinates;
}

impl Located for Coordinates {
    fn position(&self) -> Coordinates {
        *self
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn position(&self) -> Coordinates {
        (**self).position()
    }
}

/// Centroid for a five-digit ZIP.
#[must_use]
pub fn zip_coordinates(zip: &str) -> Option<Coordinates> {
    ZIP_TABLE
        .iter()
        .find(|(code, _)| *code == zip)
        .map(|(_, coords)| *coords)
}

/// Zone key for a ZIP from the built-in table.
#[must_use]
pub fn default_zone_for_zip(zip: &str) -> Option<&'static str> {
    zip_coordinates(zip).map(|_| DEFAULT_ZONE_KEY)
}

/// All built-in ZIPs served by a region, by display name or key.
#[must_use]
pub fn zips_in_region(region: &str) -> Vec<&'static str> {
    if region == DEFAULT_ZONE_NAME || region == DEFAULT_ZONE_KEY {
        ZIP_TABLE.iter().map(|(code, _)| *code).collect()
    } else {
        Vec::new()
    }
}

/// `12345` or `12345-6789`.
#[must_use]
pub fn is_valid_zip(zip: &str) -> bool {
    ZIP_PATTERN.is_match(zip)
}

/// Strip a ZIP+4 suffix.
#[must_use]
pub fn format_zip(zip: &str) -> &str {
    zip.split('-').next().unwrap_or(zip)
}

/// Great-circle distance in miles.
#[must_use]
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Straight-line distance in raw degrees. Not geodesic.
#[must_use]
pub fn planar_degrees(a: Coordinates, b: Coordinates) -> f64 {
    (a.lat - b.lat).hypot(a.lng - b.lng)
}

/// The closest area whose radius covers `point`, with its planar distance.
///
/// Ties keep the earlier area.
pub fn nearest_zone<Z: ServiceArea>(point: Coordinates, zones: &[Z]) -> Option<(&Z, f64)> {
    let mut best: Option<(&Z, f64)> = None;
    for zone in zones {
        let distance = planar_degrees(point, zone.center());
        if distance > zone.radius_miles() / MILES_PER_DEGREE {
            continue;
        }
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((zone, distance));
        }
    }
    best
}

/// Items within `radius_miles` of `center`, nearest first, with distances.
pub fn within_radius<T: Located>(
    center: Coordinates,
    items: impl IntoIterator<Item = T>,
    radius_miles: f64,
) -> Vec<(T, f64)> {
    let mut hits: Vec<(T, f64)> = items
        .into_iter()
        .map(|item| {
            let distance = haversine_miles(center, item.position());
            (item, distance)
        })
        .filter(|(_, distance)| *distance <= radius_miles)
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

/// Bounding box of `points`, or [`DEFAULT_BOUNDS`] when empty.
#[must_use]
pub fn bounds(points: &[Coordinates]) -> MapBounds {
    let Some(first) = points.first() else {
        return DEFAULT_BOUNDS;
    };
    points.iter().skip(1).fold(
        MapBounds {
            north: first.lat,
            south: first.lat,
            east: first.lng,
            west: first.lng,
        },
        |b, p| MapBounds {
            north: b.north.max(p.lat),
            south: b.south.min(p.lat),
            east: b.east.max(p.lng),
            west: b.west.min(p.lng),
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    struct Area {
        key: &'static str,
        center: Coordinates,
        radius: f64,
    }

    impl ServiceArea for Area {
        fn center(&self) -> Coordinates {
            self.center
        }

        fn radius_miles(&self) -> f64 {
            self.radius
        }
    }

    #[test]
    fn known_zip_resolves_to_default_zone() {
        assert_eq!(zip_coordinates("78704"), Some(SOUTH_AUSTIN));
        assert_eq!(zip_coordinates("78701"), Some(DOWNTOWN));
        assert_eq!(default_zone_for_zip("78745"), Some(DEFAULT_ZONE_KEY));
        assert_eq!(default_zone_for_zip("10001"), None);
    }

    #[test]
    fn zip_format() {
        assert!(is_valid_zip("78704"));
        assert!(is_valid_zip("78704-1234"));
        assert!(!is_valid_zip("7870"));
        assert!(!is_valid_zip("78704-12"));
        assert!(!is_valid_zip("abcde"));
        assert_eq!(format_zip("78704-1234"), "78704");
        assert_eq!(format_zip("78704"), "78704");
    }

    #[test]
    fn region_zip_listing() {
        assert_eq!(zips_in_region("Austin Central").len(), ZIP_TABLE.len());
        assert!(zips_in_region("Dallas").is_empty());
    }

    #[test]
    fn haversine_is_zero_for_same_point_and_symmetric() {
        assert_eq!(haversine_miles(DOWNTOWN, DOWNTOWN), 0.0);
        let there = haversine_miles(DOWNTOWN, SOUTH_AUSTIN);
        let back = haversine_miles(SOUTH_AUSTIN, DOWNTOWN);
        assert!((there - back).abs() < 1e-9);
        // Downtown to south Austin is a little under three miles.
        assert!(there > 2.5 && there < 3.5, "{there}");
    }

    #[test]
    fn nearest_zone_respects_radius_in_degrees() {
        let zones = [
            Area {
                key: "austin-central",
                center: DOWNTOWN,
                radius: 10.0,
            },
            Area {
                key: "austin-south",
                center: Coordinates::new(30.20, -97.78),
                radius: 5.0,
            },
        ];

        let (zone, _) = nearest_zone(Coordinates::new(30.21, -97.78), &zones).unwrap();
        assert_eq!(zone.key, "austin-south");

        let (zone, distance) = nearest_zone(DOWNTOWN, &zones).unwrap();
        assert_eq!(zone.key, "austin-central");
        assert_eq!(distance, 0.0);

        // 10 miles is about 0.145 degrees; half a degree away is out of range.
        assert!(nearest_zone(Coordinates::new(30.77, -97.74), &zones).is_none());
    }

    #[test]
    fn nearest_zone_with_no_zones() {
        let zones: [Area; 0] = [];
        assert!(nearest_zone(DOWNTOWN, &zones).is_none());
    }

    #[test]
    fn within_radius_filters_and_sorts() {
        let far = Coordinates::new(31.0, -97.7);
        let hits = within_radius(SOUTH_AUSTIN, [DOWNTOWN, far, SOUTH_AUSTIN], 5.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, SOUTH_AUSTIN);
        assert_eq!(hits[1].0, DOWNTOWN);
    }

    #[test]
    fn bounds_defaults_and_extremes() {
        assert_eq!(bounds(&[]), DEFAULT_BOUNDS);
        let b = bounds(&[DOWNTOWN, SOUTH_AUSTIN]);
        assert_eq!(b.north, DOWNTOWN.lat);
        assert_eq!(b.south, SOUTH_AUSTIN.lat);
        assert_eq!(b.east, DOWNTOWN.lng);
        assert_eq!(b.west, SOUTH_AUSTIN.lng);
    }

    #[test]
    fn coordinate_validation() {
        assert!(DOWNTOWN.is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}
