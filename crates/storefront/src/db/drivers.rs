//! Driver profile repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use openweed_core::{DriverId, ProductCategory, ProductId, UserId, UserRole};

use super::RepositoryError;
use super::products::list_active_for_driver;
use super::users::set_role;
use crate::models::{
    Driver, DriverChanges, DriverDetail, DriverListing, DriverOwner, NewDriver, ProductSummary,
    User,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DriverRow {
    id: DriverId,
    user_id: UserId,
    handle: String,
    region: String,
    service_area: Option<String>,
    bio: Option<String>,
    license: Option<String>,
    license_type: Option<String>,
    avatar: Option<String>,
    is_active: bool,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DriverRow> for Driver {
    fn from(row: DriverRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            handle: row.handle,
            region: row.region,
            service_area: row.service_area,
            bio: row.bio,
            license: row.license,
            license_type: row.license_type,
            avatar: row.avatar,
            is_active: row.is_active,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DriverListingRow {
    #[sqlx(flatten)]
    driver: DriverRow,
    owner_name: String,
    owner_email: String,
    product_count: i64,
    order_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductSummaryRow {
    id: ProductId,
    driver_id: DriverId,
    name: String,
    category: ProductCategory,
    price: Decimal,
    photo: Option<String>,
}

impl From<ProductSummaryRow> for ProductSummary {
    fn from(row: ProductSummaryRow) -> Self {
        Self {
            id: row.id,
            driver_id: row.driver_id,
            name: row.name,
            category: row.category,
            price: row.price,
            photo: row.photo,
        }
    }
}

const DRIVER_COLUMNS: &str = "d.id, d.user_id, d.handle, d.region, d.service_area, d.bio, \
     d.license, d.license_type, d.avatar, d.is_active, d.is_verified, d.created_at, d.updated_at";

const LISTING_SELECT: &str = r"
    SELECT d.id, d.user_id, d.handle, d.region, d.service_area, d.bio,
           d.license, d.license_type, d.avatar, d.is_active, d.is_verified,
           d.created_at, d.updated_at,
           u.name AS owner_name, u.email AS owner_email,
           (SELECT COUNT(*) FROM marketplace.product p
             WHERE p.driver_id = d.id AND p.is_active) AS product_count,
           (SELECT COUNT(*) FROM marketplace.customer_order o
             WHERE o.driver_id = d.id) AS order_count
    FROM marketplace.driver_profile d
    JOIN marketplace.user_account u ON u.id = d.user_id
";

/// A driver listed publicly: activated and verified by an admin.
pub(crate) const LIVE_CONDITION: &str = "d.is_active AND d.is_verified";

/// Status filter for the back-office driver list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatusFilter {
    /// Not yet verified.
    Pending,
    Verified,
    /// Live, the same set the dashboard counts as active drivers.
    Active,
    /// Deactivated by an admin, verified or not.
    Inactive,
}

impl DriverStatusFilter {
    /// SQL condition over a `driver_profile` aliased `d`.
    #[must_use]
    pub const fn condition(self) -> &'static str {
        match self {
            Self::Pending => "NOT d.is_verified",
            Self::Verified => "d.is_verified",
            Self::Active => LIVE_CONDITION,
            Self::Inactive => "NOT d.is_active",
        }
    }
}

impl std::str::FromStr for DriverStatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("invalid driver status filter: {other}")),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

pub struct DriverRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DriverRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DriverId) -> Result<Option<Driver>, RepositoryError> {
        let row = sqlx::query_as::<_, DriverRow>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM marketplace.driver_profile d WHERE d.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_handle(&self, handle: &str) -> Result<Option<Driver>, RepositoryError> {
        let row = sqlx::query_as::<_, DriverRow>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM marketplace.driver_profile d WHERE d.handle = lower($1)"
        ))
        .bind(handle)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// The profile owned by an account, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Driver>, RepositoryError> {
        let row = sqlx::query_as::<_, DriverRow>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM marketplace.driver_profile d WHERE d.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Whether another profile already uses `handle`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn handle_taken(
        &self,
        handle: &str,
        except: Option<DriverId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM marketplace.driver_profile
                WHERE handle = lower($1) AND ($2::int IS NULL OR id <> $2)
            )
            ",
        )
        .bind(handle)
        .bind(except)
        .fetch_one(self.pool)
        .await?;

        Ok(taken)
    }

    /// Insert a profile. New profiles start inactive and unverified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the handle or owner already has a
    /// profile (constraint name in the message).
    pub async fn create(&self, new: &NewDriver) -> Result<Driver, RepositoryError> {
        insert_driver(self.pool, new).await
    }

    /// Insert a profile and give its owner the `DRIVER` role, atomically.
    ///
    /// # Errors
    ///
    /// As [`Self::create`]; nothing is written on failure.
    pub async fn create_and_promote(
        &self,
        new: &NewDriver,
    ) -> Result<(Driver, User), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let driver = insert_driver(&mut *tx, new).await?;
        let user = set_role(&mut *tx, new.user_id, UserRole::Driver).await?;
        tx.commit().await?;
        Ok((driver, user))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist and
    /// `RepositoryError::Conflict` on a handle collision.
    pub async fn update(
        &self,
        id: DriverId,
        changes: &DriverChanges,
    ) -> Result<Driver, RepositoryError> {
        let row = sqlx::query_as::<_, DriverRow>(&format!(
            r"
            UPDATE marketplace.driver_profile d
            SET handle = COALESCE($2, d.handle),
                region = COALESCE($3, d.region),
                service_area = COALESCE($4, d.service_area),
                bio = COALESCE($5, d.bio),
                license = COALESCE($6, d.license),
                license_type = COALESCE($7, d.license_type),
                avatar = COALESCE($8, d.avatar),
                is_active = COALESCE($9, d.is_active),
                is_verified = COALESCE($10, d.is_verified),
                updated_at = NOW()
            WHERE d.id = $1
            RETURNING {DRIVER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.handle.as_ref().map(|h| h.as_str()))
        .bind(changes.region.as_deref())
        .bind(changes.service_area.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.license.as_deref())
        .bind(changes.license_type.as_deref())
        .bind(changes.avatar.as_deref())
        .bind(changes.is_active)
        .bind(changes.is_verified)
        .fetch_optional(self.pool)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a profile and its catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist, or
    /// `RepositoryError::Conflict` when orders still reference it.
    pub async fn delete(&self, id: DriverId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM marketplace.driver_profile WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict("driver has orders".to_owned());
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_count(&self, id: DriverId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM marketplace.customer_order WHERE driver_id = $1")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Live drivers, newest first, optionally in one region.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_live(
        &self,
        region: Option<&str>,
    ) -> Result<Vec<DriverListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, DriverListingRow>(&format!(
            r"{LISTING_SELECT}
            WHERE {LIVE_CONDITION}
              AND ($1::text IS NULL OR d.region = $1)
            ORDER BY d.created_at DESC
            "
        ))
        .bind(region)
        .fetch_all(self.pool)
        .await?;

        self.attach_previews(rows).await
    }

    /// Every driver for the back office, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(
        &self,
        status: Option<DriverStatusFilter>,
    ) -> Result<Vec<DriverListing>, RepositoryError> {
        let condition = status.map_or("TRUE", DriverStatusFilter::condition);
        let rows = sqlx::query_as::<_, DriverListingRow>(&format!(
            "{LISTING_SELECT} WHERE {condition} ORDER BY d.created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.attach_previews(rows).await
    }

    /// Owner, full active catalog, and order count for one driver.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(&self, driver: Driver) -> Result<DriverDetail, RepositoryError> {
        let (name, email): (String, String) =
            sqlx::query_as("SELECT name, email FROM marketplace.user_account WHERE id = $1")
                .bind(driver.user_id)
                .fetch_one(self.pool)
                .await?;
        let products = list_active_for_driver(self.pool, driver.id).await?;
        let order_count = self.order_count(driver.id).await?;

        Ok(DriverDetail {
            driver,
            user: DriverOwner { name, email },
            products,
            order_count,
        })
    }

    async fn attach_previews(
        &self,
        rows: Vec<DriverListingRow>,
    ) -> Result<Vec<DriverListing>, RepositoryError> {
        let ids: Vec<DriverId> = rows.iter().map(|r| r.driver.id).collect();
        let previews = sqlx::query_as::<_, ProductSummaryRow>(
            r"
            SELECT id, driver_id, name, category, price, photo
            FROM marketplace.product
            WHERE driver_id = ANY($1) AND is_active
            ORDER BY created_at DESC
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(self.pool)
        .await?;

        let mut by_driver: HashMap<DriverId, Vec<ProductSummary>> = HashMap::new();
        for row in previews {
            by_driver.entry(row.driver_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| DriverListing {
                products: by_driver.remove(&row.driver.id).unwrap_or_default(),
                user: DriverOwner {
                    name: row.owner_name,
                    email: row.owner_email,
                },
                product_count: row.product_count,
                order_count: row.order_count,
                driver: row.driver.into(),
            })
            .collect())
    }
}

pub(crate) async fn insert_driver<'e>(
    executor: impl PgExecutor<'e>,
    new: &NewDriver,
) -> Result<Driver, RepositoryError> {
    let row = sqlx::query_as::<_, DriverRow>(&format!(
        r"
        INSERT INTO marketplace.driver_profile AS d (user_id, handle, region, bio, license)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {DRIVER_COLUMNS}
        "
    ))
    .bind(new.user_id)
    .bind(new.handle.as_str())
    .bind(&new.region)
    .bind(new.bio.as_deref())
    .bind(new.license.as_deref())
    .fetch_one(executor)
    .await
    .map_err(RepositoryError::from_write)?;

    Ok(row.into())
}
