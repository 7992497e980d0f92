//! OpenWeed marketplace service.
//!
//! Cannabis delivery marketplace: driver storefronts, catalogs, orders,
//! a regional chat lounge, and service-zone lookup. The crate is a library
//! so the full router can be exercised from tests; `main.rs` only wires
//! configuration, telemetry, and the listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::Request,
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application with its full middleware stack.
///
/// The session layer must wrap the route guard, which reads the session
/// from request extensions and reloads the signed-in account.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    routes::routes()
        .layer(from_fn_with_state(
            state.clone(),
            middleware::route_guard_middleware,
        ))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
