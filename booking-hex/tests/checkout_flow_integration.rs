//! End-to-end tests for the booking, checkout and reconciliation routes,
//! driven through the full middleware stack against SQLite and the
//! sandbox gateway.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use booking_hex::{CheckoutService, CheckoutSettings, inbound::HttpServer};
use booking_repo::SqliteRepo;
use checkout_gateway::SandboxGateway;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    gateway: Arc<SandboxGateway>,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
        let gateway = Arc::new(SandboxGateway::new());
        let service = CheckoutService::new(
            repo,
            gateway.clone(),
            CheckoutSettings::new("http://localhost:5173"),
        );
        let router = HttpServer::with_rate_limit(service, 1000).router();

        let (status, body) = send(
            &router,
            Method::POST,
            "/bootstrap",
            None,
            Some(json!({"name": "storefront"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = body["apiToken"].as_str().unwrap().to_string();

        Self {
            router,
            gateway,
            token,
        }
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, Method::POST, uri, Some(&self.token), Some(body)).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, Method::GET, uri, Some(&self.token), None).await
    }
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn booking_body(service_id: &str) -> Value {
    json!({
        "user": {"uid": "u-1", "name": "Nadia", "email": "nadia@example.com"},
        "service": {
            "id": service_id,
            "name": "Wedding Stage Decor",
            "price": 500,
            "image": "https://img.example.com/stage.png",
            "category": "wedding",
            "provider": {"name": "Rahim Decor", "email": "rahim@example.com"}
        },
        "location": "Dhaka"
    })
}

fn checkout_body(service_id: &str) -> Value {
    json!({
        "service": {"id": service_id, "name": "Wedding Stage Decor"},
        "totalPrice": 500,
        "user": {"name": "Nadia", "email": "nadia@example.com"}
    })
}

fn session_id(checkout: &Value) -> String {
    checkout["url"]
        .as_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_public_routes() {
    let app = TestApp::new().await;

    let index = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(index).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Hello from Server...");

    let (status, body) = send(&app.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) =
        send(&app.router, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/payment-success"].is_object());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/payment-success",
        None,
        Some(json!({"sessionId": "cs_1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/booking-data",
        Some("bk_not_a_real_token"),
        Some(booking_body("S1")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_second_bootstrap_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/bootstrap",
        None,
        Some(json!({"name": "again"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_checkout_to_ledger_flow() {
    let app = TestApp::new().await;

    let (status, booking) = app.post("/booking-data", booking_body("S1")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["service"]["status"], "requested");

    let (status, checkout) = app
        .post("/create-checkout-session", checkout_body("S1"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = session_id(&checkout);

    let requests = app.gateway.requests();
    assert_eq!(requests[0].line_items[0].unit_amount.amount(), 50000);

    // Customer abandoned the page: nothing recorded yet.
    let (status, body) = app
        .post("/payment-success", json!({"sessionId": session_id}))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "not_payable");
    assert_eq!(body["reason"], "session_not_complete");

    app.gateway.complete(&session_id, "pi_1").unwrap();

    let (status, first) = app
        .post("/payment-success", json!({"sessionId": session_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["transactionId"], "pi_1");
    assert_eq!(first["status"], "recorded");

    let (status, second) = app
        .post("/payment-success", json!({"sessionId": session_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "already_recorded");
    assert_eq!(second["orderId"], first["orderId"]);

    let (status, payment) = app.get("/payments/pi_1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["serviceId"], "S1");
    assert_eq!(payment["transactionId"], "pi_1");
    assert_eq!(payment["id"], first["orderId"]);
    assert_eq!(payment["quantity"], 1);
    assert_eq!(payment["status"], "paid");
}

#[tokio::test]
async fn test_payment_without_booking_is_not_payable() {
    let app = TestApp::new().await;

    let (_, checkout) = app
        .post("/create-checkout-session", checkout_body("S404"))
        .await;
    let session_id = session_id(&checkout);
    app.gateway.complete(&session_id, "pi_orphan").unwrap();

    let (status, body) = app
        .post("/payment-success", json!({"sessionId": session_id}))
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["reason"], "booking_not_found");
    assert_eq!(body["detail"], "service:S404");

    let (status, _) = app.get("/payments/pi_orphan").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gateway_errors_map_to_http() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/payment-success", json!({"sessionId": "cs_unknown"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    app.gateway.set_unavailable(true);
    let (status, body) = app
        .post("/create-checkout-session", checkout_body("S1"))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 502);
}

#[tokio::test]
async fn test_invalid_checkout_is_bad_request() {
    let app = TestApp::new().await;

    let mut body = checkout_body("S1");
    body["totalPrice"] = json!(0);

    let (status, response) = app.post("/create-checkout-session", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("Total price"));
    assert!(app.gateway.requests().is_empty());
}
