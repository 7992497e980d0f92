//! Driver onboarding wizard.
//!
//! ```text
//! POST  /api/onboard/driver     profile (promotes a buyer to driver)
//! POST  /api/onboard/license    license document URL
//! PATCH /api/onboard/region     service zone
//! PATCH /api/onboard/customize  bio and avatar
//! GET   /api/onboard/status     wizard progress
//! ```
//!
//! A profile goes live only after an admin activates and verifies it.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::{ApiJson, non_blank};
use crate::db::DriverRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, refresh_current_user};
use crate::models::{CurrentUser, Driver, DriverChanges, Zone};
use crate::services::drivers::{
    DriverService, ProfileInput, normalize_region, validate_bio, validate_link,
    validate_optional_link,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DriverStepRequest {
    pub handle: String,
    pub region: String,
    pub bio: Option<String>,
    pub license: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStepRequest {
    pub license_url: String,
    pub license_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStepRequest {
    pub region: String,
    pub service_area: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomizeStepRequest {
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

/// Which wizard steps are done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    pub profile: bool,
    pub license: bool,
    pub region: bool,
    pub customize: bool,
    /// Active and verified by an admin.
    pub live: bool,
    /// First incomplete step, `None` once everything is filled in.
    pub next_step: Option<&'static str>,
}

impl OnboardingStatus {
    #[must_use]
    pub fn for_driver(driver: Option<&Driver>, zones: &[Zone]) -> Self {
        let Some(driver) = driver else {
            return Self {
                profile: false,
                license: false,
                region: false,
                customize: false,
                live: false,
                next_step: Some("driver"),
            };
        };

        let license = driver.license.is_some();
        let region = zones.iter().any(|zone| zone.key == driver.region);
        let customize = driver.bio.is_some() || driver.avatar.is_some();
        let next_step = [("license", license), ("region", region), ("customize", customize)]
            .into_iter()
            .find_map(|(step, done)| (!done).then_some(step));

        Self {
            profile: true,
            license,
            region,
            customize,
            live: driver.is_live(),
            next_step,
        }
    }
}

async fn own_profile(state: &AppState, user: &CurrentUser) -> Result<Driver> {
    DriverRepository::new(state.pool())
        .get_by_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))
}

async fn apply(state: &AppState, driver: &Driver, changes: &DriverChanges) -> Result<Driver> {
    DriverService::new(state.pool())
        .update_profile(driver, changes)
        .await
}

/// POST /api/onboard/driver
pub async fn driver(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<DriverStepRequest>,
) -> Result<(StatusCode, Json<Driver>)> {
    let input = ProfileInput {
        handle: req.handle,
        region: req.region,
        bio: req.bio,
        license: req.license,
    };
    let created = DriverService::new(state.pool())
        .create_profile(&user, &input, true)
        .await?;

    if let Some(account) = &created.promoted {
        refresh_current_user(&session, &CurrentUser::from(account)).await?;
        tracing::info!(user_id = %account.id, "buyer promoted to driver");
    }
    Ok((StatusCode::CREATED, Json(created.driver)))
}

/// POST /api/onboard/license
pub async fn license(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<LicenseStepRequest>,
) -> Result<Json<Driver>> {
    let driver = own_profile(&state, &user).await?;
    let changes = DriverChanges {
        license: Some(validate_link("License", &req.license_url)?),
        license_type: non_blank(req.license_type),
        ..DriverChanges::default()
    };
    Ok(Json(apply(&state, &driver, &changes).await?))
}

/// PATCH /api/onboard/region
pub async fn region(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<RegionStepRequest>,
) -> Result<Json<Driver>> {
    let driver = own_profile(&state, &user).await?;
    let region = normalize_region(&req.region)?;

    let zones = state.active_zones().await?;
    if !zones.iter().any(|zone| zone.key == region) {
        return Err(AppError::BadRequest("Unknown service region".to_string()));
    }

    let changes = DriverChanges {
        region: Some(region),
        service_area: non_blank(req.service_area),
        ..DriverChanges::default()
    };
    Ok(Json(apply(&state, &driver, &changes).await?))
}

/// PATCH /api/onboard/customize
pub async fn customize(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<CustomizeStepRequest>,
) -> Result<Json<Driver>> {
    let driver = own_profile(&state, &user).await?;
    let changes = DriverChanges {
        bio: validate_bio(req.bio)?,
        avatar: validate_optional_link("Avatar", req.avatar)?,
        ..DriverChanges::default()
    };
    Ok(Json(apply(&state, &driver, &changes).await?))
}

/// GET /api/onboard/status
pub async fn status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OnboardingStatus>> {
    let driver = DriverRepository::new(state.pool())
        .get_by_user(user.id)
        .await?;
    let zones = state.active_zones().await?;
    Ok(Json(OnboardingStatus::for_driver(
        driver.as_ref(),
        zones.as_slice(),
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use openweed_core::{DriverId, UserId, ZoneId};

    use super::*;

    fn driver() -> Driver {
        Driver {
            id: DriverId::new(1),
            user_id: UserId::new(1),
            handle: "atxweedog".to_string(),
            region: "austin-central".to_string(),
            service_area: None,
            bio: None,
            license: None,
            license_type: None,
            avatar: None,
            is_active: false,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn austin() -> Zone {
        Zone {
            id: ZoneId::new(1),
            key: "austin-central".to_string(),
            name: "Austin Central".to_string(),
            zip_codes: vec!["78701".to_string()],
            center_lat: 30.2672,
            center_lng: -97.7431,
            radius: 15.0,
            is_active: true,
        }
    }

    #[test]
    fn test_status_without_profile() {
        let status = OnboardingStatus::for_driver(None, &[austin()]);
        assert!(!status.profile);
        assert_eq!(status.next_step, Some("driver"));
    }

    #[test]
    fn test_status_walks_steps() {
        let mut d = driver();
        let status = OnboardingStatus::for_driver(Some(&d), &[austin()]);
        assert!(status.profile && status.region);
        assert_eq!(status.next_step, Some("license"));

        d.license = Some("https://example.com/license.pdf".to_string());
        d.bio = Some("Fast, discreet delivery across central Austin.".to_string());
        let status = OnboardingStatus::for_driver(Some(&d), &[austin()]);
        assert_eq!(status.next_step, None);
        assert!(!status.live);

        d.is_active = true;
        d.is_verified = true;
        assert!(OnboardingStatus::for_driver(Some(&d), &[austin()]).live);
    }

    #[test]
    fn test_region_step_needs_active_zone() {
        let status = OnboardingStatus::for_driver(Some(&driver()), &[]);
        assert!(!status.region);
    }
}
