//! End-to-end flows against a running server with the demo dataset.
//!
//! These tests require:
//! - A migrated and seeded database (`ow-cli migrate && ow-cli seed demo`)
//! - The server running (`cargo run -p openweed-storefront`)
//! - `OPENWEED_DATABASE_URL` pointing at the server's database for the flows
//!   that change rows directly
//!
//! Run with: cargo test -p openweed-integration-tests -- --ignored

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use openweed_core::{ChatMessageId, Email, MessageType, UserId, UserRole};
use openweed_integration_tests::{live_base_url, live_pool};
use openweed_storefront::db::{ChatRepository, UserRepository};

const DEMO_BUYER: (&str, &str) = ("buyer@openweed.dev", "demo-buyer-pass");
const DEMO_DRIVER_HANDLE: &str = "atxweedog";

/// Each client looks like its own visitor so the per-IP auth limit is not
/// shared between tests.
fn client() -> Client {
    let [a, b, ..] = *Uuid::new_v4().as_bytes();
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&format!("198.18.{a}.{b}")).expect("valid header"),
    );
    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

async fn register(client: &Client, name: &str) -> Value {
    let resp = client
        .post(format!("{}/auth/register", live_base_url()))
        .json(&json!({
            "name": name,
            "email": format!("{}@openweed.dev", Uuid::new_v4()),
            "password": "hunter2hunter2",
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("json")
}

async fn login(client: &Client, (email, password): (&str, &str)) {
    let resp = client
        .post(format!("{}/auth/login", live_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);
}

async fn demo_driver(client: &Client) -> Value {
    let resp = client
        .get(format!("{}/api/drivers?handle={DEMO_DRIVER_HANDLE}", live_base_url()))
        .send()
        .await
        .expect("Failed to look up driver");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("Failed to parse driver")
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and seeded database"]
async fn test_demo_driver_is_live_with_catalog() {
    let client = client();
    let driver = demo_driver(&client).await;

    assert_eq!(driver["handle"], DEMO_DRIVER_HANDLE);
    assert!(driver["products"].as_array().is_some_and(|p| p.len() >= 5));

    let page = client
        .get(format!("{}/deliveries/{DEMO_DRIVER_HANDLE}", live_base_url()))
        .send()
        .await
        .expect("Failed to load mini-site");
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.expect("body").contains("Blue Dream"));
}

#[tokio::test]
#[ignore = "Requires running server and seeded database"]
async fn test_zip_search_finds_demo_driver() {
    let resp = client()
        .get(format!("{}/api/geo?zipCode=78701", live_base_url()))
        .send()
        .await
        .expect("Failed to search");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["zone"]["key"], "austin-central");
    assert!(
        body["drivers"]
            .as_array()
            .is_some_and(|d| d.iter().any(|d| d["handle"] == DEMO_DRIVER_HANDLE))
    );
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and seeded database"]
async fn test_buyer_places_and_cancels_order() {
    let client = client();
    login(&client, DEMO_BUYER).await;

    let driver = demo_driver(&client).await;
    let product = driver["products"]
        .as_array()
        .and_then(|p| p.iter().find(|p| p["stock"].as_i64().unwrap_or(0) > 0))
        .cloned()
        .expect("demo driver has stock");

    let resp = client
        .post(format!("{}/api/orders", live_base_url()))
        .json(&json!({
            "driverId": driver["id"],
            "items": [{ "productId": product["id"], "quantity": 1 }],
            "deliveryAddress": "1100 Congress Ave, Austin, TX 78701",
        }))
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = resp.json().await.expect("json");
    assert_eq!(placed["status"], "PENDING");
    assert_eq!(placed["total"], product["price"]);

    // Buyers cannot advance their own order
    let resp = client
        .patch(format!("{}/api/orders/{}", live_base_url(), placed["id"]))
        .json(&json!({ "status": "ACCEPTED" }))
        .send()
        .await
        .expect("Failed to update order");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .patch(format!("{}/api/orders/{}", live_base_url(), placed["id"]))
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .expect("Failed to cancel order");
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.expect("json");
    assert_eq!(cancelled["status"], "CANCELLED");
}

// ============================================================================
// Accounts and lounge
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and seeded database"]
async fn test_register_then_post_to_lounge() {
    let client = client();
    let email = format!("lounge-{}@openweed.dev", Uuid::new_v4());

    let resp = client
        .post(format!("{}/auth/register", live_base_url()))
        .json(&json!({ "name": "Lounge Tester", "email": email, "password": "hunter2hunter2" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{}/api/chat", live_base_url()))
        .json(&json!({ "room": "austin-central", "message": "  hello from the tests  " }))
        .send()
        .await
        .expect("Failed to post");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let posted: Value = resp.json().await.expect("json");
    assert_eq!(posted["message"], "hello from the tests");

    let resp = client
        .get(format!(
            "{}/api/chat?room=austin-central&after={}",
            live_base_url(),
            posted["id"].as_i64().unwrap_or(0) - 1
        ))
        .send()
        .await
        .expect("Failed to poll");
    assert!(resp.headers().contains_key("x-poll-interval"));
    let history: Value = resp.json().await.expect("json");
    assert!(
        history
            .as_array()
            .is_some_and(|m| m.iter().any(|m| m["id"] == posted["id"]))
    );
}

#[tokio::test]
#[ignore = "Requires running server and seeded database"]
async fn test_duplicate_registration_conflicts() {
    let resp = client()
        .post(format!("{}/auth/register", live_base_url()))
        .json(&json!({ "name": "Again", "email": DEMO_BUYER.0, "password": "another-password" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and seeded database"]
async fn test_onboarding_with_taken_handle_is_rejected() {
    let client = client();
    register(&client, "Handle Squatter").await;

    let resp = client
        .post(format!("{}/api/onboard/driver", live_base_url()))
        .json(&json!({ "handle": DEMO_DRIVER_HANDLE, "region": "austin-central" }))
        .send()
        .await
        .expect("Failed to onboard");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["error"], "Handle already taken");
}

// ============================================================================
// Sessions follow the account
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server, seeded database and OPENWEED_DATABASE_URL"]
async fn test_role_change_reaches_open_session() {
    let pool = live_pool().await;
    let client = client();
    let account = register(&client, "Shift Manager").await;
    let id = UserId::new(
        account["id"]
            .as_i64()
            .and_then(|id| i32::try_from(id).ok())
            .expect("numeric id"),
    );
    let admin_users = format!("{}/api/admin/users", live_base_url());

    let resp = client.get(&admin_users).send().await.expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Promoted while signed in: the same cookie now reaches the back office
    UserRepository::new(&pool)
        .set_role(id, UserRole::Admin)
        .await
        .expect("promote");
    let resp = client.get(&admin_users).send().await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK);

    // Demoted again: the old admin session loses access immediately
    UserRepository::new(&pool)
        .set_role(id, UserRole::Buyer)
        .await
        .expect("demote");
    let resp = client.get(&admin_users).send().await.expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let me: Value = client
        .get(format!("{}/auth/me", live_base_url()))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(me["role"], "BUYER");
}

// ============================================================================
// Lounge polling
// ============================================================================

#[tokio::test]
#[ignore = "Requires migrated database and OPENWEED_DATABASE_URL"]
async fn test_polling_pages_forward_through_a_burst() {
    let pool = live_pool().await;
    let email = Email::parse(&format!("{}@openweed.dev", Uuid::new_v4())).expect("email");
    let author = UserRepository::new(&pool)
        .create("Burst Poster", &email, None, UserRole::Buyer)
        .await
        .expect("create author");
    let room = format!("burst-{}", Uuid::new_v4().simple());
    let chat = ChatRepository::new(&pool);

    let mut ids: Vec<ChatMessageId> = Vec::new();
    for n in 1..=5 {
        let posted = chat
            .post(author.id, &room, &format!("message {n}"), MessageType::Text)
            .await
            .expect("post");
        ids.push(posted.id);
    }
    let &[first, second, third, fourth, fifth] = ids.as_slice() else {
        panic!("five messages posted");
    };

    let page_ids = |page: Vec<openweed_storefront::models::ChatMessage>| {
        page.into_iter().map(|m| m.id).collect::<Vec<_>>()
    };

    // A poller that last saw the first message gets the next two, not the newest two
    let page = chat.recent(&room, 2, Some(first)).await.expect("poll");
    assert_eq!(page_ids(page), [second, third]);
    let page = chat.recent(&room, 2, Some(third)).await.expect("poll");
    assert_eq!(page_ids(page), [fourth, fifth]);
    assert!(chat.recent(&room, 2, Some(fifth)).await.expect("poll").is_empty());

    // First load still shows the latest messages, oldest first
    let page = chat.recent(&room, 2, None).await.expect("history");
    assert_eq!(page_ids(page), [fourth, fifth]);
}
