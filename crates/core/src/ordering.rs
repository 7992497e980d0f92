//! Pricing and validation of order line items.
//!
//! The storefront locks the requested product rows, loads them as
//! [`ProductSnapshot`]s and hands them to [`price_order`] inside the same
//! transaction that writes the order. Everything here is pure so the rules
//! can be tested without a database.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DriverId, ProductId};

/// Largest amount a price or an order total can hold: money is stored as
/// `NUMERIC(10,2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Upper bound on distinct line items per order.
pub const MAX_LINE_ITEMS: usize = 50;

/// One requested line as sent by the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// The product fields that matter for placing an order, read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub driver_id: DriverId,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
}

/// A validated line with its purchase-time unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PricedLine {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub total: Decimal,
    pub lines: Vec<PricedLine>,
}

impl PricedOrder {
    /// Quantity to take out of stock per product.
    #[must_use]
    pub fn stock_deltas(&self) -> BTreeMap<ProductId, i32> {
        let mut deltas = BTreeMap::new();
        for line in &self.lines {
            *deltas.entry(line.product_id).or_insert(0) += line.quantity;
        }
        deltas
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderLineError {
    #[error("Order must contain at least one item")]
    Empty,
    #[error("Order cannot contain more than {max} items")]
    TooManyLines { max: usize },
    #[error("Invalid quantity for product {0}")]
    InvalidQuantity(ProductId),
    #[error("Product {0} not available")]
    Unavailable(ProductId),
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(ProductId),
    #[error("Order total cannot exceed {max}")]
    TotalTooLarge { max: Decimal },
}

/// Validate `lines` against `snapshots` and price them.
///
/// A line is rejected when its quantity is not positive, or its product is
/// missing, inactive, or sold by another driver. Lines that repeat a product
/// are checked against stock by their combined quantity. The total uses the
/// snapshot prices, never a client-supplied price, and may not exceed
/// [`MAX_AMOUNT`].
///
/// # Errors
///
/// Returns the first [`OrderLineError`] found, in request order.
pub fn price_order(
    driver_id: DriverId,
    lines: &[LineRequest],
    snapshots: &[ProductSnapshot],
) -> Result<PricedOrder, OrderLineError> {
    if lines.is_empty() {
        return Err(OrderLineError::Empty);
    }
    if lines.len() > MAX_LINE_ITEMS {
        return Err(OrderLineError::TooManyLines {
            max: MAX_LINE_ITEMS,
        });
    }

    let by_id: HashMap<ProductId, &ProductSnapshot> =
        snapshots.iter().map(|p| (p.id, p)).collect();
    let mut requested: HashMap<ProductId, i64> = HashMap::new();
    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        if line.quantity <= 0 {
            return Err(OrderLineError::InvalidQuantity(line.product_id));
        }
        let product = by_id
            .get(&line.product_id)
            .filter(|p| p.is_active && p.driver_id == driver_id)
            .ok_or(OrderLineError::Unavailable(line.product_id))?;

        let wanted = requested.entry(product.id).or_insert(0);
        *wanted += i64::from(line.quantity);
        if *wanted > i64::from(product.stock) {
            return Err(OrderLineError::InsufficientStock(product.id));
        }

        let line = PricedLine {
            product_id: product.id,
            quantity: line.quantity,
            unit_price: product.price,
        };
        total = total
            .checked_add(line.subtotal())
            .filter(|total| *total <= MAX_AMOUNT)
            .ok_or(OrderLineError::TotalTooLarge { max: MAX_AMOUNT })?;
        priced.push(line);
    }

    Ok(PricedOrder {
        total,
        lines: priced,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DRIVER: DriverId = DriverId::new(1);

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: i32, price: Decimal, stock: i32) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            driver_id: DRIVER,
            price,
            stock,
            is_active: true,
        }
    }

    fn line(id: i32, quantity: i32) -> LineRequest {
        LineRequest {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn total_is_sum_of_snapshot_price_times_quantity() {
        let catalog = [product(1, dec("45.00"), 10), product(2, dec("25.00"), 5)];
        let order = price_order(DRIVER, &[line(1, 1), line(2, 2)], &catalog).unwrap();

        assert_eq!(order.total, dec("95.00"));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[1].unit_price, dec("25.00"));
    }

    #[test]
    fn rejects_empty_and_non_positive_quantities() {
        let catalog = [product(1, dec("10"), 10)];
        assert_eq!(price_order(DRIVER, &[], &catalog), Err(OrderLineError::Empty));
        assert_eq!(
            price_order(DRIVER, &[line(1, 0)], &catalog),
            Err(OrderLineError::InvalidQuantity(ProductId::new(1)))
        );
        assert_eq!(
            price_order(DRIVER, &[line(1, -3)], &catalog),
            Err(OrderLineError::InvalidQuantity(ProductId::new(1)))
        );
    }

    #[test]
    fn rejects_products_from_other_drivers_or_inactive() {
        let mut other = product(2, dec("10"), 10);
        other.driver_id = DriverId::new(99);
        let mut inactive = product(3, dec("10"), 10);
        inactive.is_active = false;
        let catalog = [product(1, dec("10"), 10), other, inactive];

        assert_eq!(
            price_order(DRIVER, &[line(1, 1), line(2, 1)], &catalog),
            Err(OrderLineError::Unavailable(ProductId::new(2)))
        );
        assert_eq!(
            price_order(DRIVER, &[line(3, 1)], &catalog),
            Err(OrderLineError::Unavailable(ProductId::new(3)))
        );
        assert_eq!(
            price_order(DRIVER, &[line(404, 1)], &catalog),
            Err(OrderLineError::Unavailable(ProductId::new(404)))
        );
    }

    #[test]
    fn repeated_lines_are_checked_against_stock_together() {
        let catalog = [product(1, dec("50"), 3)];
        assert!(price_order(DRIVER, &[line(1, 3)], &catalog).is_ok());
        assert_eq!(
            price_order(DRIVER, &[line(1, 2), line(1, 2)], &catalog),
            Err(OrderLineError::InsufficientStock(ProductId::new(1)))
        );
    }

    #[test]
    fn stock_deltas_merge_repeated_products() {
        let catalog = [product(1, dec("5"), 10), product(2, dec("7"), 10)];
        let order =
            price_order(DRIVER, &[line(1, 2), line(2, 1), line(1, 3)], &catalog).unwrap();
        let deltas = order.stock_deltas();
        assert_eq!(deltas[&ProductId::new(1)], 5);
        assert_eq!(deltas[&ProductId::new(2)], 1);
        assert_eq!(order.total, dec("32"));
    }

    #[test]
    fn max_amount_fits_numeric_10_2() {
        assert_eq!(MAX_AMOUNT, dec("99999999.99"));
    }

    #[test]
    fn total_past_column_range_is_rejected() {
        let catalog = [product(1, MAX_AMOUNT, 5)];
        assert_eq!(price_order(DRIVER, &[line(1, 1)], &catalog).unwrap().total, MAX_AMOUNT);
        assert_eq!(
            price_order(DRIVER, &[line(1, 2)], &catalog),
            Err(OrderLineError::TotalTooLarge { max: MAX_AMOUNT })
        );
    }

    #[test]
    fn cap_applies_to_the_sum_of_lines() {
        let catalog = [product(1, dec("60000000"), 5), product(2, dec("40000000.00"), 5)];
        assert_eq!(
            price_order(DRIVER, &[line(1, 1), line(2, 1)], &catalog),
            Err(OrderLineError::TotalTooLarge { max: MAX_AMOUNT })
        );
    }
}
