//! Marketplace rules exercised end to end without a database.
//!
//! Checkout pricing, the order lifecycle with its permission checks, and the
//! zone lookups used by search, combined the way the handlers combine them.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use rust_decimal::Decimal;

use openweed_core::geo::{
    Coordinates, DEFAULT_ZONE_KEY, DEFAULT_ZONE_NAME, nearest_zone, within_radius, zip_coordinates,
};
use openweed_core::ordering::{
    LineRequest, MAX_AMOUNT, OrderLineError, ProductSnapshot, price_order,
};
use openweed_core::{DriverId, Email, OrderId, OrderStatus, ProductId, UserId, UserRole, ZoneId};
use openweed_storefront::error::AppError;
use openweed_storefront::models::{CurrentUser, Order, OrderChanges, Zone};
use openweed_storefront::routes::api::geo::zone_for_zip;
use openweed_storefront::services::orders::{authorize_update, can_view, visible_orders};

const DRIVER: DriverId = DriverId::new(7);
const DRIVER_USER: UserId = UserId::new(70);
const BUYER: UserId = UserId::new(100);

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn user(id: UserId, role: UserRole) -> CurrentUser {
    CurrentUser {
        id,
        email: Email::parse(&format!("user{id}@openweed.dev")).unwrap(),
        name: format!("User {id}"),
        role,
    }
}

fn catalog() -> Vec<ProductSnapshot> {
    let product = |id, price: &str, stock| ProductSnapshot {
        id: ProductId::new(id),
        driver_id: DRIVER,
        price: dec(price),
        stock,
        is_active: true,
    };
    vec![
        product(1, "35.00", 40),
        product(2, "12.00", 3),
        product(3, "25.00", 30),
    ]
}

fn line(id: i32, quantity: i32) -> LineRequest {
    LineRequest {
        product_id: ProductId::new(id),
        quantity,
    }
}

fn order(status: OrderStatus) -> Order {
    Order {
        id: OrderId::new(1),
        buyer_id: BUYER,
        driver_id: DRIVER,
        total: dec("70.00"),
        status,
        delivery_address: "1100 Congress Ave".to_string(),
        notes: None,
        delivery_time: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn status_change(status: OrderStatus) -> OrderChanges {
    OrderChanges {
        status: Some(status),
        ..OrderChanges::default()
    }
}

fn zone(key: &str, zips: &[&str], center: Coordinates, radius: f64) -> Zone {
    Zone {
        id: ZoneId::new(1),
        key: key.to_string(),
        name: key.replace('-', " "),
        zip_codes: zips.iter().map(|z| (*z).to_string()).collect(),
        center_lat: center.lat,
        center_lng: center.lng,
        radius,
        is_active: true,
    }
}

// ============================================================================
// Checkout
// ============================================================================

#[test]
fn test_checkout_total_is_sum_of_snapshot_subtotals() {
    let priced = price_order(DRIVER, &[line(1, 2), line(3, 1)], &catalog()).unwrap();

    assert_eq!(priced.total, dec("95.00"));
    assert_eq!(
        priced.total,
        priced.lines.iter().map(|l| l.subtotal()).sum::<Decimal>()
    );
    assert_eq!(priced.stock_deltas().get(&ProductId::new(1)), Some(&2));
}

#[test]
fn test_demo_order_totals_seventy() {
    let priced = price_order(DRIVER, &[line(1, 2)], &catalog()).unwrap();
    assert_eq!(priced.total, dec("70"));
}

#[test]
fn test_split_lines_cannot_oversell() {
    // Three in stock: 2 + 2 across two lines must fail even though each fits
    let result = price_order(DRIVER, &[line(2, 2), line(2, 2)], &catalog());
    assert_eq!(
        result,
        Err(OrderLineError::InsufficientStock(ProductId::new(2)))
    );
}

#[test]
fn test_cannot_buy_from_another_drivers_catalog() {
    let result = price_order(DriverId::new(8), &[line(1, 1)], &catalog());
    assert_eq!(result, Err(OrderLineError::Unavailable(ProductId::new(1))));
}

#[test]
fn test_checkout_past_money_range_is_a_client_error() {
    let vault = ProductSnapshot {
        id: ProductId::new(9),
        driver_id: DRIVER,
        price: MAX_AMOUNT,
        stock: 5,
        is_active: true,
    };
    let err: AppError = price_order(DRIVER, &[line(9, 2)], &[vault])
        .unwrap_err()
        .into();

    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(err.client_message(), "Order total cannot exceed 99999999.99");
}

// ============================================================================
// Lifecycle and permissions
// ============================================================================

#[test]
fn test_driver_walks_order_to_delivered() {
    let driver = user(DRIVER_USER, UserRole::Driver);
    let mut current = order(OrderStatus::Pending);
    let mut steps = 0;

    while let Some(next) = current.status.next() {
        authorize_update(&driver, Some(DRIVER), &current, &status_change(next)).unwrap();
        assert!(current.status.can_transition_to(next));
        current.status = next;
        steps += 1;
    }

    assert_eq!(current.status, OrderStatus::Delivered);
    assert_eq!(steps, 4);
    assert!(!current.status.can_transition_to(OrderStatus::Cancelled));
}

#[test]
fn test_buyer_may_only_cancel() {
    let buyer = user(BUYER, UserRole::Buyer);
    let pending = order(OrderStatus::Pending);

    assert!(authorize_update(&buyer, None, &pending, &status_change(OrderStatus::Cancelled)).is_ok());
    assert!(matches!(
        authorize_update(&buyer, None, &pending, &status_change(OrderStatus::Accepted)),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn test_other_buyer_cannot_touch_order() {
    let stranger = user(UserId::new(101), UserRole::Buyer);
    let pending = order(OrderStatus::Pending);

    assert!(!can_view(&stranger, None, &pending));
    assert!(matches!(
        authorize_update(&stranger, None, &pending, &status_change(OrderStatus::Cancelled)),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn test_order_lists_are_scoped_by_role() {
    let buyer = user(BUYER, UserRole::Buyer);
    let filter = visible_orders(&buyer, None, None, None).unwrap();
    assert_eq!(filter.buyer_id, Some(BUYER));

    let driver = user(DRIVER_USER, UserRole::Driver);
    assert!(visible_orders(&driver, Some(DRIVER), Some(DriverId::new(8)), None).is_none());
    assert!(visible_orders(&driver, None, None, None).is_none());

    let admin = user(UserId::new(1), UserRole::Admin);
    let filter = visible_orders(&admin, None, Some(DRIVER), Some(OrderStatus::Pending)).unwrap();
    assert_eq!(filter.driver_id, Some(DRIVER));
    assert_eq!(filter.buyer_id, None);
}

// ============================================================================
// Zones
// ============================================================================

#[test]
fn test_known_zip_falls_back_to_default_zone() {
    let summary = zone_for_zip(&[], "78701").unwrap();
    assert_eq!(summary.key, DEFAULT_ZONE_KEY);
    assert_eq!(summary.name, DEFAULT_ZONE_NAME);

    assert!(zone_for_zip(&[], "10001").is_none());
}

#[test]
fn test_configured_zone_listing_zip_wins() {
    let downtown = zip_coordinates("78701").unwrap();
    let zones = vec![
        zone(DEFAULT_ZONE_KEY, &[], downtown, 15.0),
        zone("south-congress", &["78704"], downtown, 5.0),
    ];

    assert_eq!(zone_for_zip(&zones, "78704").unwrap().key, "south-congress");
    assert_eq!(zone_for_zip(&zones, "78701").unwrap().key, DEFAULT_ZONE_KEY);
}

#[test]
fn test_nearest_zone_respects_radius_in_degrees() {
    let center = Coordinates::new(30.0, -97.0);
    let zones = vec![zone("tiny", &[], center, 6.9)];

    // 6.9 miles is 0.1 degrees
    assert!(nearest_zone(Coordinates::new(30.09, -97.0), &zones).is_some());
    assert!(nearest_zone(Coordinates::new(30.11, -97.0), &zones).is_none());
}

#[test]
fn test_nearby_zones_are_sorted_by_distance() {
    let here = Coordinates::new(30.2672, -97.7431);
    let zones = vec![
        zone("far", &[], Coordinates::new(30.50, -97.74), 10.0),
        zone("near", &[], Coordinates::new(30.27, -97.74), 10.0),
        zone("houston", &[], Coordinates::new(29.76, -95.37), 10.0),
    ];

    let keys: Vec<&str> = within_radius(here, zones.iter(), 25.0)
        .into_iter()
        .map(|(zone, _)| zone.key.as_str())
        .collect();
    assert_eq!(keys, ["near", "far"]);
}
