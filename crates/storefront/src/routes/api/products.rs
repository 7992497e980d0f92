//! Product catalog.
//!
//! ```text
//! GET    /api/products?driverId=&category=&search=
//! POST   /api/products
//! GET    /api/products/{id}
//! PATCH  /api/products/{id}
//! DELETE /api/products/{id}
//! ```

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;

use openweed_core::ordering::MAX_AMOUNT;
use openweed_core::{DriverId, ProductCategory, ProductId};

use super::drivers::DRIVER_NOT_FOUND;
use super::{ApiJson, ApiPath, ApiQuery, MessageResponse, non_blank};
use crate::db::{DriverRepository, ProductFilter, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, NewProduct, Product, ProductChanges, ProductListing};
use crate::services::access::{can_manage_driver, ensure_can_manage_driver};
use crate::state::AppState;

const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Upper bound for THC/CBD: percent for flower, milligrams for edibles.
const MAX_CANNABINOID: f64 = 1000.0;
const MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub driver_id: Option<DriverId>,
    pub category: Option<ProductCategory>,
    pub search: Option<String>,
}

/// Prices arrive as JSON numbers from forms and as strings from exports.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn to_decimal(&self) -> Result<Decimal> {
        let invalid = || AppError::BadRequest("Invalid price".to_string());
        let price = match self {
            Self::Number(n) => Decimal::try_from(*n).map_err(|_| invalid())?,
            Self::Text(s) => s.trim().parse::<Decimal>().map_err(|_| invalid())?,
        };
        if price.is_sign_negative() {
            return Err(AppError::BadRequest("Price cannot be negative".to_string()));
        }
        let price = price.round_dp(2);
        if price > MAX_AMOUNT {
            return Err(AppError::BadRequest(format!(
                "Price cannot exceed {MAX_AMOUNT}"
            )));
        }
        Ok(price)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub driver_id: DriverId,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub price: PriceInput,
    pub photo: Option<String>,
    #[serde(default)]
    pub stock: i32,
    pub thc: Option<f64>,
    pub cbd: Option<f64>,
    pub strain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub price: Option<PriceInput>,
    pub photo: Option<String>,
    pub stock: Option<i32>,
    pub thc: Option<f64>,
    pub cbd: Option<f64>,
    pub strain: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest("Name is too long".to_string()));
    }
    Ok(name.to_string())
}

fn validate_stock(stock: i32) -> Result<i32> {
    if stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".to_string()));
    }
    Ok(stock)
}

fn validate_cannabinoid(label: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=MAX_CANNABINOID).contains(&v) => Err(
            AppError::BadRequest(format!("{label} must be between 0 and {MAX_CANNABINOID}")),
        ),
        other => Ok(other),
    }
}

impl CreateProductRequest {
    fn into_new_product(self) -> Result<NewProduct> {
        Ok(NewProduct {
            driver_id: self.driver_id,
            name: validate_name(&self.name)?,
            description: non_blank(self.description),
            category: self.category,
            price: self.price.to_decimal()?,
            photo: non_blank(self.photo),
            stock: validate_stock(self.stock)?,
            thc: validate_cannabinoid("THC", self.thc)?,
            cbd: validate_cannabinoid("CBD", self.cbd)?,
            strain: non_blank(self.strain),
        })
    }
}

impl UpdateProductRequest {
    fn into_changes(self) -> Result<ProductChanges> {
        Ok(ProductChanges {
            name: self.name.as_deref().map(validate_name).transpose()?,
            description: self.description,
            category: self.category,
            price: self.price.as_ref().map(PriceInput::to_decimal).transpose()?,
            photo: non_blank(self.photo),
            stock: self.stock.map(validate_stock).transpose()?,
            thc: validate_cannabinoid("THC", self.thc)?,
            cbd: validate_cannabinoid("CBD", self.cbd)?,
            strain: self.strain,
            is_active: self.is_active,
        })
    }
}

/// Load a product and check the caller may change it.
async fn load_owned(state: &AppState, user: &CurrentUser, id: ProductId) -> Result<Product> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;
    let driver = DriverRepository::new(state.pool())
        .get(product.driver_id)
        .await?
        .ok_or_else(|| AppError::NotFound(DRIVER_NOT_FOUND.to_string()))?;
    ensure_can_manage_driver(user, &driver)?;
    Ok(product)
}

/// GET /api/products
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Vec<ProductListing>>> {
    let filter = ProductFilter {
        driver_id: query.driver_id,
        category: query.category,
        search: non_blank(query.search),
    };
    let products = ProductRepository::new(state.pool()).search(&filter).await?;
    Ok(Json(products))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    // Someone else's profile looks the same as a missing one
    let driver = DriverRepository::new(state.pool())
        .get(req.driver_id)
        .await?
        .filter(|driver| can_manage_driver(&user, driver))
        .ok_or_else(|| AppError::NotFound(DRIVER_NOT_FOUND.to_string()))?;

    let new = req.into_new_product()?;
    let product = ProductRepository::new(state.pool()).create(&new).await?;
    tracing::info!(product_id = %product.id, driver_id = %driver.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductListing>> {
    ProductRepository::new(state.pool())
        .get_listing(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_string()))
}

/// PATCH /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> Result<Json<Product>> {
    load_owned(&state, &user, id).await?;
    let changes = req.into_changes()?;

    let product = ProductRepository::new(state.pool())
        .update(id, &changes)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(PRODUCT_NOT_FOUND.to_string()),
            other => other.into(),
        })?;
    Ok(Json(product))
}

/// DELETE /api/products/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<MessageResponse>> {
    load_owned(&state, &user, id).await?;

    let removed = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(PRODUCT_NOT_FOUND.to_string()),
            other => other.into(),
        })?;

    let message = if removed {
        "Product deleted successfully"
    } else {
        "Product has past orders and was deactivated"
    };
    tracing::info!(product_id = %id, removed, "product deleted");
    Ok(Json(MessageResponse { message }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_request(body: &str) -> CreateProductRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_price_accepts_numbers_and_strings() {
        let number = create_request(
            r#"{"driverId":1,"name":"Blue Dream","category":"FLOWER","price":35.5,"stock":3}"#,
        );
        assert_eq!(number.price.to_decimal().unwrap(), Decimal::new(3550, 2));

        let text = create_request(
            r#"{"driverId":1,"name":"Blue Dream","category":"FLOWER","price":"35.50"}"#,
        );
        assert_eq!(text.price.to_decimal().unwrap(), Decimal::new(3550, 2));
    }

    #[test]
    fn test_price_is_capped_at_column_range() {
        let at_cap = create_request(
            r#"{"driverId":1,"name":"Vault","category":"FLOWER","price":"99999999.99"}"#,
        );
        assert_eq!(at_cap.price.to_decimal().unwrap(), MAX_AMOUNT);

        let billion = create_request(
            r#"{"driverId":1,"name":"Vault","category":"FLOWER","price":1000000000}"#,
        );
        let err = billion.into_new_product().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Price cannot exceed 99999999.99");

        // Rounds up past the cap
        let rounded = create_request(
            r#"{"driverId":1,"name":"Vault","category":"FLOWER","price":"99999999.996"}"#,
        );
        assert!(rounded.price.to_decimal().is_err());
    }

    #[test]
    fn test_create_validation() {
        let blank = create_request(r#"{"driverId":1,"name":"  ","category":"EDIBLE","price":5}"#);
        assert!(blank.into_new_product().is_err());

        let negative =
            create_request(r#"{"driverId":1,"name":"Gummies","category":"EDIBLE","price":-1}"#);
        assert!(negative.into_new_product().is_err());

        let stock = create_request(
            r#"{"driverId":1,"name":"Gummies","category":"EDIBLE","price":5,"stock":-2}"#,
        );
        assert!(stock.into_new_product().is_err());

        let thc = create_request(
            r#"{"driverId":1,"name":"Gummies","category":"EDIBLE","price":5,"thc":1001}"#,
        );
        assert!(thc.into_new_product().is_err());
    }

    #[test]
    fn test_create_trims_fields() {
        let req = create_request(
            r#"{"driverId":1,"name":" Gummies ","category":"EDIBLE","price":5,"strain":" ","thc":100}"#,
        );
        let new = req.into_new_product().unwrap();
        assert_eq!(new.name, "Gummies");
        assert_eq!(new.strain, None);
        assert_eq!(new.thc, Some(100.0));
        assert_eq!(new.stock, 0);
    }

    #[test]
    fn test_update_is_partial() {
        let changes = UpdateProductRequest {
            stock: Some(4),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.stock, Some(4));
        assert!(changes.name.is_none() && changes.price.is_none());
    }
}
