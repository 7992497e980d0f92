//! Full-router tests through the real middleware stack.
//!
//! None of these reach the database: every path asserted here answers from
//! the route guard, an extractor, or validation that runs before any query.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, Request, StatusCode, header};
use axum::body::Body;

use openweed_integration_tests::{get, json_request, send, test_app};

#[tokio::test]
async fn test_liveness_and_response_headers() {
    let response = send(test_app(), get("/health")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(
        response.headers.get("x-content-type-options").map(|v| v.as_bytes()),
        Some(b"nosniff".as_slice())
    );
    assert!(response.headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-42")
        .body(Body::empty())
        .unwrap();
    let response = send(test_app(), request).await;

    assert_eq!(
        response.headers.get("x-request-id").map(|v| v.as_bytes()),
        Some(b"edge-42".as_slice())
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = send(test_app(), get("/api/nope")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Route guard
// ============================================================================

#[tokio::test]
async fn test_guarded_prefixes_reject_anonymous_requests() {
    let cases = [
        (Method::GET, "/api/admin/stats"),
        (Method::PATCH, "/api/admin/users/1/role"),
        (Method::GET, "/api/orders"),
        (Method::POST, "/api/orders"),
        (Method::GET, "/api/onboard/status"),
        (Method::POST, "/api/onboard/driver"),
        (Method::POST, "/api/products"),
        (Method::PATCH, "/api/products/3"),
        (Method::DELETE, "/api/drivers/2"),
        (Method::POST, "/api/chat"),
    ];

    for (method, uri) in cases {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::from("{}"))
            .unwrap();
        let response = send(test_app(), request).await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(response.error(), Some("Unauthorized"), "{method} {uri}");
    }
}

#[tokio::test]
async fn test_me_requires_session() {
    let response = send(test_app(), get("/auth/me")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), Some("Unauthorized"));
}

// ============================================================================
// Geo validation
// ============================================================================

#[tokio::test]
async fn test_geo_without_parameters() {
    let response = send(test_app(), get("/api/geo")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), Some("Missing parameters"));
}

#[tokio::test]
async fn test_geo_rejects_bad_zip_codes() {
    for zip in ["abc", "1234", "787011", "99999"] {
        let response = send(test_app(), get(&format!("/api/geo?zipCode={zip}"))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{zip}");
        assert_eq!(response.error(), Some("Invalid ZIP code"), "{zip}");
    }
}

#[tokio::test]
async fn test_geo_rejects_bad_coordinates() {
    for query in ["lat=abc&lng=-97.7", "lat=91&lng=0", "lat=30&lng=181"] {
        let response = send(test_app(), get(&format!("/api/geo?{query}"))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(response.error(), Some("Invalid coordinates"), "{query}");
    }
}

#[tokio::test]
async fn test_geo_only_latitude_is_missing_parameters() {
    let response = send(test_app(), get("/api/geo?lat=30.2")).await;
    assert_eq!(response.error(), Some("Missing parameters"));
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_register_refuses_admin_role() {
    let body = r#"{"name":"Mallory","email":"m@example.com","password":"long enough","role":"ADMIN"}"#;
    let response = send(test_app(), json_request("POST", "/auth/register", body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), Some("Cannot register as ADMIN"));
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let body = r#"{"name":"Sam","email":"sam@example.com","password":"short"}"#;
    let response = send(test_app(), json_request("POST", "/auth/register", body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error(),
        Some("Password must be at least 8 characters")
    );
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let response = send(test_app(), json_request("POST", "/auth/login", "{not json")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error().is_some());
}

#[tokio::test]
async fn test_login_is_rate_limited_per_client() {
    let app = test_app();
    let mut statuses = Vec::new();
    for _ in 0..6 {
        let response = send(app.clone(), json_request("POST", "/auth/login", "{")).await;
        statuses.push(response.status);
    }

    assert!(
        statuses
            .iter()
            .take(5)
            .all(|status| *status == StatusCode::BAD_REQUEST)
    );
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}
