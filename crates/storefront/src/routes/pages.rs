//! Driver mini-sites.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use openweed_core::geo::{DEFAULT_ZONE_KEY, DEFAULT_ZONE_NAME};

use crate::db::DriverRepository;
use crate::filters;
use crate::models::DriverDetail;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "deliveries/show.html")]
pub struct DeliveryPageTemplate {
    pub driver: DriverDetail,
    pub region_name: String,
}

/// Display name for a region key, from the active zones when configured.
async fn region_name(state: &AppState, key: &str) -> String {
    let configured = match state.active_zones().await {
        Ok(zones) => zones
            .iter()
            .find(|zone| zone.key == key)
            .map(|zone| zone.name.clone()),
        Err(e) => {
            tracing::warn!(error = %e, "zone lookup failed while rendering page");
            None
        }
    };
    configured.unwrap_or_else(|| {
        if key == DEFAULT_ZONE_KEY {
            DEFAULT_ZONE_NAME.to_string()
        } else {
            key.to_string()
        }
    })
}

/// GET /deliveries/{handle}
///
/// # Errors
///
/// 404 unless the driver exists and is live.
#[instrument(skip(state))]
pub async fn delivery_page(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let drivers = DriverRepository::new(state.pool());
    let driver = drivers
        .get_by_handle(&handle)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "driver lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .filter(|driver| driver.is_live())
        .ok_or(StatusCode::NOT_FOUND)?;

    let region_name = region_name(&state, &driver.region).await;
    let driver = drivers.detail(driver).await.map_err(|e| {
        tracing::error!(error = %e, "driver detail failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(DeliveryPageTemplate {
        driver,
        region_name,
    })
}
