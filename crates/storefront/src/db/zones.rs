//! Service zone repository.

use sqlx::PgPool;

use openweed_core::ZoneId;

use super::RepositoryError;
use crate::models::{NewZone, Zone, ZoneChanges};

#[derive(Debug, sqlx::FromRow)]
struct ZoneRow {
    id: ZoneId,
    key: String,
    name: String,
    zip_codes: Vec<String>,
    center_lat: f64,
    center_lng: f64,
    radius: f64,
    is_active: bool,
}

impl From<ZoneRow> for Zone {
    fn from(row: ZoneRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            name: row.name,
            zip_codes: row.zip_codes,
            center_lat: row.center_lat,
            center_lng: row.center_lng,
            radius: row.radius,
            is_active: row.is_active,
        }
    }
}

const ZONE_COLUMNS: &str = "id, key, name, zip_codes, center_lat, center_lng, radius, is_active";

pub struct ZoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ZoneRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Zone>, RepositoryError> {
        let rows = sqlx::query_as::<_, ZoneRow>(&format!(
            "SELECT {ZONE_COLUMNS} FROM marketplace.zone WHERE is_active OR NOT $1 ORDER BY id"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ZoneId) -> Result<Option<Zone>, RepositoryError> {
        let row = sqlx::query_as::<_, ZoneRow>(&format!(
            "SELECT {ZONE_COLUMNS} FROM marketplace.zone WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key is already used.
    pub async fn create(&self, new: &NewZone) -> Result<Zone, RepositoryError> {
        let row = sqlx::query_as::<_, ZoneRow>(&format!(
            r"
            INSERT INTO marketplace.zone
                (key, name, zip_codes, center_lat, center_lng, radius, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ZONE_COLUMNS}
            "
        ))
        .bind(&new.key)
        .bind(&new.name)
        .bind(&new.zip_codes)
        .bind(new.center_lat)
        .bind(new.center_lng)
        .bind(new.radius)
        .bind(new.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(row.into())
    }

    /// Insert or refresh a zone by key. Used by seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, zone: &NewZone) -> Result<Zone, RepositoryError> {
        let row = sqlx::query_as::<_, ZoneRow>(&format!(
            r"
            INSERT INTO marketplace.zone
                (key, name, zip_codes, center_lat, center_lng, radius, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (key) DO UPDATE
            SET name = EXCLUDED.name,
                zip_codes = EXCLUDED.zip_codes,
                center_lat = EXCLUDED.center_lat,
                center_lng = EXCLUDED.center_lng,
                radius = EXCLUDED.radius,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING {ZONE_COLUMNS}
            "
        ))
        .bind(&zone.key)
        .bind(&zone.name)
        .bind(&zone.zip_codes)
        .bind(zone.center_lat)
        .bind(zone.center_lng)
        .bind(zone.radius)
        .bind(zone.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the zone doesn't exist.
    pub async fn update(&self, id: ZoneId, changes: &ZoneChanges) -> Result<Zone, RepositoryError> {
        let row = sqlx::query_as::<_, ZoneRow>(&format!(
            r"
            UPDATE marketplace.zone
            SET name = COALESCE($2, name),
                zip_codes = COALESCE($3, zip_codes),
                center_lat = COALESCE($4, center_lat),
                center_lng = COALESCE($5, center_lng),
                radius = COALESCE($6, radius),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ZONE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.zip_codes.as_ref())
        .bind(changes.center_lat)
        .bind(changes.center_lng)
        .bind(changes.radius)
        .bind(changes.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the zone doesn't exist.
    pub async fn delete(&self, id: ZoneId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM marketplace.zone WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
