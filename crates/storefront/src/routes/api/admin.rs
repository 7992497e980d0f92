//! Back-office API. Every handler requires an admin session.
//!
//! ```text
//! GET    /api/admin/stats
//! GET    /api/admin/analytics
//! GET    /api/admin/drivers?status=pending|verified|active|inactive
//! GET    /api/admin/orders?status=
//! GET    /api/admin/zones
//! POST   /api/admin/zones
//! PATCH  /api/admin/zones/{id}
//! DELETE /api/admin/zones/{id}
//! GET    /api/admin/users?role=
//! PATCH  /api/admin/users/{id}/role
//! ```

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use openweed_core::geo::{Coordinates, format_zip, is_valid_zip};
use openweed_core::{OrderStatus, UserId, UserRole, ZoneId};

use super::{ApiJson, ApiPath, ApiQuery, MessageResponse, non_blank};
use crate::db::drivers::DriverStatusFilter;
use crate::db::{
    DriverRepository, OrderFilter, OrderRepository, RepositoryError, StatsRepository,
    UserRepository, ZoneRepository,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{
    Analytics, DashboardStats, DriverListing, NewZone, OrderDetail, User, Zone, ZoneChanges,
};
use crate::services::drivers::normalize_region;
use crate::state::AppState;

const ZONE_NOT_FOUND: &str = "Zone not found";

#[derive(Debug, Deserialize)]
pub struct DriverStatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

// =============================================================================
// Zone validation
// =============================================================================

fn validate_zip_codes(zips: &[String]) -> Result<Vec<String>> {
    zips.iter()
        .map(|zip| {
            let zip = zip.trim();
            if is_valid_zip(zip) {
                Ok(format_zip(zip).to_string())
            } else {
                Err(AppError::BadRequest(format!("Invalid ZIP code: {zip}")))
            }
        })
        .collect()
}

fn validate_radius(radius: f64) -> Result<f64> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(AppError::BadRequest(
            "Radius must be greater than zero".to_string(),
        ))
    }
}

fn validate_center(lat: f64, lng: f64) -> Result<()> {
    if Coordinates::new(lat, lng).is_valid() {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid coordinates".to_string()))
    }
}

fn validate_new_zone(zone: NewZone) -> Result<NewZone> {
    let name = non_blank(Some(zone.name))
        .ok_or_else(|| AppError::BadRequest("Name is required".to_string()))?;
    validate_center(zone.center_lat, zone.center_lng)?;
    Ok(NewZone {
        key: normalize_region(&zone.key)?,
        name,
        zip_codes: validate_zip_codes(&zone.zip_codes)?,
        radius: validate_radius(zone.radius)?,
        ..zone
    })
}

fn validate_zone_changes(current: &Zone, changes: ZoneChanges) -> Result<ZoneChanges> {
    validate_center(
        changes.center_lat.unwrap_or(current.center_lat),
        changes.center_lng.unwrap_or(current.center_lng),
    )?;
    Ok(ZoneChanges {
        name: non_blank(changes.name),
        zip_codes: changes
            .zip_codes
            .as_deref()
            .map(validate_zip_codes)
            .transpose()?,
        radius: changes.radius.map(validate_radius).transpose()?,
        ..changes
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    Ok(Json(StatsRepository::new(state.pool()).dashboard().await?))
}

/// GET /api/admin/analytics
pub async fn analytics(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Analytics>> {
    Ok(Json(StatsRepository::new(state.pool()).analytics().await?))
}

/// GET /api/admin/drivers
pub async fn drivers(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<DriverStatusQuery>,
) -> Result<Json<Vec<DriverListing>>> {
    let status = non_blank(query.status)
        .map(|s| s.parse::<DriverStatusFilter>())
        .transpose()
        .map_err(AppError::BadRequest)?;
    Ok(Json(
        DriverRepository::new(state.pool()).list_all(status).await?,
    ))
}

/// GET /api/admin/orders
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<OrderStatusQuery>,
) -> Result<Json<Vec<OrderDetail>>> {
    let filter = OrderFilter {
        status: query.status,
        ..OrderFilter::default()
    };
    Ok(Json(OrderRepository::new(state.pool()).list(filter).await?))
}

/// GET /api/admin/zones
pub async fn list_zones(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Zone>>> {
    Ok(Json(ZoneRepository::new(state.pool()).list(false).await?))
}

/// POST /api/admin/zones
pub async fn create_zone(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(req): ApiJson<NewZone>,
) -> Result<(StatusCode, Json<Zone>)> {
    let new = validate_new_zone(req)?;
    let zone = ZoneRepository::new(state.pool())
        .create(&new)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::BadRequest("A zone with this key already exists".to_string())
            }
            other => other.into(),
        })?;

    state.invalidate_zones().await;
    tracing::info!(zone_id = %zone.id, key = %zone.key, by = %admin.id, "zone created");
    Ok((StatusCode::CREATED, Json(zone)))
}

/// PATCH /api/admin/zones/{id}
pub async fn update_zone(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ZoneId>,
    ApiJson(req): ApiJson<ZoneChanges>,
) -> Result<Json<Zone>> {
    let zones = ZoneRepository::new(state.pool());
    let current = zones
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(ZONE_NOT_FOUND.to_string()))?;
    let changes = validate_zone_changes(&current, req)?;

    let zone = zones.update(id, &changes).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound(ZONE_NOT_FOUND.to_string()),
        other => other.into(),
    })?;

    state.invalidate_zones().await;
    tracing::info!(zone_id = %id, by = %admin.id, "zone updated");
    Ok(Json(zone))
}

/// DELETE /api/admin/zones/{id}
pub async fn delete_zone(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ZoneId>,
) -> Result<Json<MessageResponse>> {
    ZoneRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(ZONE_NOT_FOUND.to_string()),
            other => other.into(),
        })?;

    state.invalidate_zones().await;
    tracing::info!(zone_id = %id, by = %admin.id, "zone deleted");
    Ok(Json(MessageResponse {
        message: "Zone deleted successfully",
    }))
}

/// GET /api/admin/users
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(UserRepository::new(state.pool()).list(query.role).await?))
}

/// PATCH /api/admin/users/{id}/role
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<SetRoleRequest>,
) -> Result<Json<User>> {
    if id == admin.id && req.role != UserRole::Admin {
        return Err(AppError::BadRequest(
            "Admins cannot demote themselves".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .set_role(id, req.role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;
    tracing::info!(user_id = %id, role = %user.role, by = %admin.id, "role changed");
    Ok(Json(user))
}
