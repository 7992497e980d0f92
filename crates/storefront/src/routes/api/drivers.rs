//! Driver directory and profile management.
//!
//! ```text
//! GET    /api/drivers?region=&handle=
//! POST   /api/drivers
//! GET    /api/drivers/{id}
//! PATCH  /api/drivers/{id}
//! DELETE /api/drivers/{id}
//! ```

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use openweed_core::{DriverHandle, DriverId, MessageType};

use super::{ApiJson, ApiPath, ApiQuery, MessageResponse, non_blank};
use crate::db::{ChatRepository, DriverRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Driver, DriverChanges, DriverDetail, DriverListing};
use crate::services::access::ensure_can_manage_driver;
use crate::services::drivers::{
    DriverService, ProfileInput, normalize_region, validate_bio, validate_optional_link,
};
use crate::state::AppState;

pub(crate) const DRIVER_NOT_FOUND: &str = "Driver not found";

#[derive(Debug, Deserialize)]
pub struct DriverQuery {
    pub region: Option<String>,
    pub handle: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DriversResponse {
    One(Box<DriverDetail>),
    Many(Vec<DriverListing>),
}

#[derive(Debug, Deserialize)]
pub struct CreateDriverRequest {
    pub handle: String,
    pub region: String,
    pub bio: Option<String>,
    pub license: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverRequest {
    pub handle: Option<String>,
    pub region: Option<String>,
    pub service_area: Option<String>,
    pub bio: Option<String>,
    pub license: Option<String>,
    pub avatar: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl UpdateDriverRequest {
    fn into_changes(self) -> Result<DriverChanges> {
        Ok(DriverChanges {
            handle: self.handle.as_deref().map(DriverHandle::parse).transpose()?,
            region: self.region.as_deref().map(normalize_region).transpose()?,
            service_area: non_blank(self.service_area),
            bio: validate_bio(self.bio)?,
            license: validate_optional_link("License", self.license)?,
            license_type: None,
            avatar: validate_optional_link("Avatar", self.avatar)?,
            is_active: self.is_active,
            is_verified: self.is_verified,
        })
    }
}

pub(crate) async fn load_driver(state: &AppState, id: DriverId) -> Result<Driver> {
    DriverRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(DRIVER_NOT_FOUND.to_string()))
}

/// GET /api/drivers
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DriverQuery>,
) -> Result<Json<DriversResponse>> {
    let drivers = DriverRepository::new(state.pool());

    if let Some(handle) = non_blank(query.handle) {
        let driver = drivers
            .get_by_handle(&handle)
            .await?
            .ok_or_else(|| AppError::NotFound(DRIVER_NOT_FOUND.to_string()))?;
        let detail = drivers.detail(driver).await?;
        return Ok(Json(DriversResponse::One(Box::new(detail))));
    }

    let region = non_blank(query.region).map(|r| r.to_lowercase());
    let listings = drivers.list_live(region.as_deref()).await?;
    Ok(Json(DriversResponse::Many(listings)))
}

/// POST /api/drivers
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<CreateDriverRequest>,
) -> Result<(StatusCode, Json<Driver>)> {
    let input = ProfileInput {
        handle: req.handle,
        region: req.region,
        bio: non_blank(req.bio),
        license: non_blank(req.license),
    };
    let created = DriverService::new(state.pool())
        .create_profile(&user, &input, false)
        .await?;
    Ok((StatusCode::CREATED, Json(created.driver)))
}

/// GET /api/drivers/{id}
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DriverId>,
) -> Result<Json<DriverDetail>> {
    let driver = load_driver(&state, id).await?;
    let detail = DriverRepository::new(state.pool()).detail(driver).await?;
    Ok(Json(detail))
}

/// PATCH /api/drivers/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<DriverId>,
    ApiJson(req): ApiJson<UpdateDriverRequest>,
) -> Result<Json<Driver>> {
    let driver = load_driver(&state, id).await?;
    let changes = req.into_changes()?;

    if changes.touches_moderation() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can change activation or verification".to_string(),
        ));
    }
    ensure_can_manage_driver(&user, &driver)?;

    let updated = DriverService::new(state.pool())
        .update_profile(&driver, &changes)
        .await?;
    tracing::info!(driver_id = %id, by = %user.id, "driver profile updated");

    if updated.is_live() && !driver.is_live() {
        announce_live(&state, &user, &updated).await;
    }
    Ok(Json(updated))
}

/// Tell the driver's regional lounge that they started delivering.
async fn announce_live(state: &AppState, by: &CurrentUser, driver: &Driver) {
    let message = format!("@{} is now delivering in {}", driver.handle, driver.region);
    if let Err(e) = ChatRepository::new(state.pool())
        .post(by.id, &driver.region, &message, MessageType::System)
        .await
    {
        tracing::warn!(driver_id = %driver.id, error = %e, "failed to announce driver in lounge");
    }
}

/// DELETE /api/drivers/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<DriverId>,
) -> Result<Json<MessageResponse>> {
    let driver = load_driver(&state, id).await?;
    ensure_can_manage_driver(&user, &driver)?;

    DriverRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(DRIVER_NOT_FOUND.to_string()),
            RepositoryError::Conflict(_) => AppError::BadRequest(
                "Drivers with orders cannot be deleted; deactivate the profile instead"
                    .to_string(),
            ),
            other => other.into(),
        })?;

    tracing::info!(driver_id = %id, by = %user.id, "driver profile deleted");
    Ok(Json(MessageResponse {
        message: "Driver deleted successfully",
    }))
}
