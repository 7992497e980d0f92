//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use openweed_core::{DriverId, ProductCategory, ProductId};

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductChanges, ProductDriver, ProductListing};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    driver_id: DriverId,
    name: String,
    description: Option<String>,
    category: ProductCategory,
    price: Decimal,
    photo: Option<String>,
    stock: i32,
    thc: Option<f64>,
    cbd: Option<f64>,
    strain: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            driver_id: row.driver_id,
            name: row.name,
            description: row.description,
            category: row.category,
            price: row.price,
            photo: row.photo,
            stock: row.stock,
            thc: row.thc,
            cbd: row.cbd,
            strain: row.strain,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    driver_handle: String,
    driver_region: String,
    driver_name: String,
}

impl From<ProductListingRow> for ProductListing {
    fn from(row: ProductListingRow) -> Self {
        Self {
            product: row.product.into(),
            driver: ProductDriver {
                handle: row.driver_handle,
                region: row.driver_region,
                name: row.driver_name,
            },
        }
    }
}

const PRODUCT_COLUMNS: &str = "p.id, p.driver_id, p.name, p.description, p.category, p.price, \
     p.photo, p.stock, p.thc, p.cbd, p.strain, p.is_active, p.created_at, p.updated_at";

const LISTING_FROM: &str = r"
    FROM marketplace.product p
    JOIN marketplace.driver_profile d ON d.id = p.driver_id
    JOIN marketplace.user_account u ON u.id = d.user_id
";

/// Catalog search filters; all optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub driver_id: Option<DriverId>,
    pub category: Option<ProductCategory>,
    /// Case-insensitive match on name, description, or strain.
    pub search: Option<String>,
}

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM marketplace.product p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// A product with its driver's public details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_listing(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductListing>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductListingRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS},
                   d.handle AS driver_handle, d.region AS driver_region, u.name AS driver_name
            {LISTING_FROM}
            WHERE p.id = $1
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Active products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filter: &ProductFilter) -> Result<Vec<ProductListing>, RepositoryError> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let rows = sqlx::query_as::<_, ProductListingRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS},
                   d.handle AS driver_handle, d.region AS driver_region, u.name AS driver_name
            {LISTING_FROM}
            WHERE p.is_active
              AND ($1::int IS NULL OR p.driver_id = $1)
              AND ($2::marketplace.product_category IS NULL OR p.category = $2)
              AND ($3::text IS NULL
                   OR p.name ILIKE $3
                   OR p.description ILIKE $3
                   OR p.strain ILIKE $3)
            ORDER BY p.created_at DESC
            "
        ))
        .bind(filter.driver_id)
        .bind(filter.category)
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        insert_product(self.pool, new).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE marketplace.product p
            SET name = COALESCE($2, p.name),
                description = COALESCE($3, p.description),
                category = COALESCE($4, p.category),
                price = COALESCE($5, p.price),
                photo = COALESCE($6, p.photo),
                stock = COALESCE($7, p.stock),
                thc = COALESCE($8, p.thc),
                cbd = COALESCE($9, p.cbd),
                strain = COALESCE($10, p.strain),
                is_active = COALESCE($11, p.is_active),
                updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.category)
        .bind(changes.price)
        .bind(changes.photo.as_deref())
        .bind(changes.stock)
        .bind(changes.thc)
        .bind(changes.cbd)
        .bind(changes.strain.as_deref())
        .bind(changes.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a product, or deactivate it when past orders reference it.
    ///
    /// Returns `true` when the row was removed and `false` when it was only
    /// hidden from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM marketplace.order_item WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = if referenced {
            "UPDATE marketplace.product SET is_active = FALSE, updated_at = NOW() WHERE id = $1"
        } else {
            "DELETE FROM marketplace.product WHERE id = $1"
        };
        let result = sqlx::query(sql).bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(!referenced)
    }
}

pub(crate) async fn insert_product<'e>(
    executor: impl PgExecutor<'e>,
    new: &NewProduct,
) -> Result<Product, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        r"
        INSERT INTO marketplace.product AS p
            (driver_id, name, description, category, price, photo, stock, thc, cbd, strain)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {PRODUCT_COLUMNS}
        "
    ))
    .bind(new.driver_id)
    .bind(&new.name)
    .bind(new.description.as_deref())
    .bind(new.category)
    .bind(new.price)
    .bind(new.photo.as_deref())
    .bind(new.stock)
    .bind(new.thc)
    .bind(new.cbd)
    .bind(new.strain.as_deref())
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::from_write)?;

    Ok(row.into())
}

pub(crate) async fn list_active_for_driver<'e>(
    executor: impl PgExecutor<'e>,
    driver_id: DriverId,
) -> Result<Vec<Product>, RepositoryError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        r"
        SELECT {PRODUCT_COLUMNS}
        FROM marketplace.product p
        WHERE p.driver_id = $1 AND p.is_active
        ORDER BY p.created_at DESC
        "
    ))
    .bind(driver_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
