//! Health checks.
//!
//! ```text
//! GET /health         liveness, no dependencies
//! GET /health/ready   200 or 503 by database reachability
//! GET /api/health     JSON status with catalog counts
//! ```

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::StatsRepository;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CatalogCounts {
    pub drivers: i64,
    pub products: i64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthReport {
    Healthy {
        timestamp: DateTime<Utc>,
        database: &'static str,
        data: CatalogCounts,
        version: &'static str,
    },
    Unhealthy {
        timestamp: DateTime<Utc>,
        error: &'static str,
    },
}

/// GET /health
pub async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/ready
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /api/health
pub async fn report(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let timestamp = Utc::now();
    match StatsRepository::new(state.pool()).catalog_counts().await {
        Ok((drivers, products)) => (
            StatusCode::OK,
            Json(HealthReport::Healthy {
                timestamp,
                database: "connected",
                data: CatalogCounts { drivers, products },
                version: env!("CARGO_PKG_VERSION"),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport::Unhealthy {
                    timestamp,
                    error: "Database connection failed",
                }),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_report_shape() {
        let healthy = serde_json::to_value(HealthReport::Healthy {
            timestamp: Utc::now(),
            database: "connected",
            data: CatalogCounts {
                drivers: 2,
                products: 9,
            },
            version: "0.1.0",
        })
        .unwrap();
        assert_eq!(healthy["status"], "healthy");
        assert_eq!(healthy["data"]["products"], 9);

        let unhealthy = serde_json::to_value(HealthReport::Unhealthy {
            timestamp: Utc::now(),
            error: "Database connection failed",
        })
        .unwrap();
        assert_eq!(unhealthy["status"], "unhealthy");
        assert_eq!(unhealthy["error"], "Database connection failed");
    }
}
