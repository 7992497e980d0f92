//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//! GET  /deliveries/{handle}             - Driver mini-site
//!
//! # Accounts (rate limited)
//! POST /auth/register
//! POST /auth/login
//! POST /auth/logout
//! GET  /auth/me
//!
//! # Public API
//! GET  /api/health
//! GET  /api/drivers, /api/drivers/{id}
//! GET  /api/products, /api/products/{id}
//! GET  /api/geo, /api/zones
//! GET  /api/chat
//!
//! # Signed-in API
//! POST|PATCH|DELETE /api/drivers...     - drivers and admins
//! POST|PATCH|DELETE /api/products...    - drivers and admins
//! *    /api/orders...                   - any session
//! POST /api/chat                        - any session (rate limited)
//! *    /api/onboard/...                 - any session
//! *    /api/admin/...                   - admins
//! ```

pub mod api;
pub mod auth;
pub mod pages;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::middleware::{auth_rate_limiter, chat_rate_limiter};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    // Register and login share one bucket per client
    let limiter = auth_rate_limiter();
    Router::new()
        .route(
            "/register",
            post(auth::register).route_layer(limiter.clone()),
        )
        .route("/login", post(auth::login).route_layer(limiter))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

pub fn driver_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api::drivers::index).post(api::drivers::create))
        .route(
            "/{id}",
            get(api::drivers::show)
                .patch(api::drivers::update)
                .delete(api::drivers::destroy),
        )
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api::products::index).post(api::products::create))
        .route(
            "/{id}",
            get(api::products::show)
                .patch(api::products::update)
                .delete(api::products::destroy),
        )
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api::orders::index).post(api::orders::create))
        .route(
            "/{id}",
            get(api::orders::show).patch(api::orders::update),
        )
}

pub fn chat_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        post(api::chat::post)
            .route_layer(chat_rate_limiter())
            .get(api::chat::history),
    )
}

pub fn onboard_routes() -> Router<AppState> {
    Router::new()
        .route("/driver", post(api::onboard::driver))
        .route("/license", post(api::onboard::license))
        .route("/region", patch(api::onboard::region))
        .route("/customize", patch(api::onboard::customize))
        .route("/status", get(api::onboard::status))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(api::admin::stats))
        .route("/analytics", get(api::admin::analytics))
        .route("/drivers", get(api::admin::drivers))
        .route("/orders", get(api::admin::orders))
        .route(
            "/zones",
            get(api::admin::list_zones).post(api::admin::create_zone),
        )
        .route(
            "/zones/{id}",
            patch(api::admin::update_zone).delete(api::admin::delete_zone),
        )
        .route("/users", get(api::admin::users))
        .route("/users/{id}/role", patch(api::admin::set_role))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(api::health::report))
        .route("/geo", get(api::geo::search))
        .route("/zones", get(api::geo::zones))
        .nest("/drivers", driver_routes())
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .nest("/chat", chat_routes())
        .nest("/onboard", onboard_routes())
        .nest("/admin", admin_routes())
}

/// Every route of the service, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(api::health::liveness))
        .route("/health/ready", get(api::health::readiness))
        .route("/deliveries/{handle}", get(pages::delivery_page))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}
