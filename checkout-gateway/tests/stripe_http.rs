//! Exercises `StripeGateway` against a local stand-in for the Stripe API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use booking_types::{
    CheckoutMode, Currency, GatewayError, LineItem, Money, NewCheckoutSession, PaymentGateway,
};
use checkout_gateway::StripeGateway;
use serde_json::json;

#[derive(Clone, Default)]
struct Captured {
    form: Arc<Mutex<Vec<(String, String)>>>,
    auth: Arc<Mutex<Option<String>>>,
    other_hits: Arc<Mutex<Vec<String>>>,
}

async fn create_session(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Form(form): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    *captured.auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *captured.form.lock().unwrap() = form;
    Json(json!({
        "id": "cs_test_a1",
        "url": "https://checkout.stripe.com/c/pay/cs_test_a1",
        "status": "open"
    }))
}

async fn get_session(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "cs_paid" => (
            StatusCode::OK,
            Json(json!({
                "id": "cs_paid",
                "url": null,
                "status": "complete",
                "amount_total": 50000,
                "currency": "bdt",
                "customer_email": "nadia@example.com",
                "payment_intent": "pi_1",
                "metadata": {"serviceId": "S1", "customer": "Nadia"}
            })),
        ),
        "cs_broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "upstream exploded"}})),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": "No such checkout.session"}})),
        ),
    }
}

async fn get_customer(State(captured): State<Captured>, Path(id): Path<String>) -> impl IntoResponse {
    captured.other_hits.lock().unwrap().push(format!("customers/{id}"));
    Json(json!({
        "id": id,
        "status": "complete",
        "amount_total": 1,
        "payment_intent": "pi_forged"
    }))
}

async fn spawn_stub() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v1/checkout/sessions", post(create_session))
        .route("/v1/checkout/sessions/{id}", get(get_session))
        .route("/v1/customers/{id}", get(get_customer))
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1"), captured)
}

fn request() -> NewCheckoutSession {
    NewCheckoutSession {
        line_items: vec![LineItem {
            name: "Stage Decor".into(),
            description: "No description available...!".into(),
            images: vec!["https://img.example.com/stage.png".into()],
            unit_amount: Money::new(50000, Currency::BDT).unwrap(),
            quantity: 1,
        }],
        customer_email: "nadia@example.com".into(),
        mode: CheckoutMode::Payment,
        metadata: BTreeMap::from([
            ("serviceId".to_string(), "S1".to_string()),
            ("customer".to_string(), "Nadia".to_string()),
        ]),
        success_url: "http://localhost:5173/payment-success?session_id={CHECKOUT_SESSION_ID}"
            .into(),
        cancel_url: "http://localhost:5173/dashboard/bookings".into(),
    }
}

#[tokio::test]
async fn test_create_session_posts_form_with_basic_auth() {
    let (base, captured) = spawn_stub().await;
    let gateway = StripeGateway::new("sk_test_123").with_api_base(base);

    let created = gateway.create_checkout_session(request()).await.unwrap();

    assert_eq!(created.id, "cs_test_a1");
    assert_eq!(created.url, "https://checkout.stripe.com/c/pay/cs_test_a1");

    let auth = captured.auth.lock().unwrap().clone().unwrap();
    assert!(auth.starts_with("Basic "));

    let form = captured.form.lock().unwrap().clone();
    let value = |key: &str| {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(
        value("line_items[0][price_data][unit_amount]").as_deref(),
        Some("50000")
    );
    assert_eq!(value("metadata[serviceId]").as_deref(), Some("S1"));
    assert_eq!(
        value("success_url").as_deref(),
        Some("http://localhost:5173/payment-success?session_id={CHECKOUT_SESSION_ID}")
    );
}

#[tokio::test]
async fn test_retrieve_complete_session() {
    let (base, _) = spawn_stub().await;
    let gateway = StripeGateway::new("sk_test_123").with_api_base(base);

    let session = gateway.retrieve_session("cs_paid").await.unwrap();

    assert!(session.is_complete());
    assert_eq!(session.amount_total, Some(50000));
    assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
    assert_eq!(session.metadata_value("customer"), Some("Nadia"));
}

#[tokio::test]
async fn test_retrieve_unknown_session_is_not_found() {
    let (base, _) = spawn_stub().await;
    let gateway = StripeGateway::new("sk_test_123").with_api_base(base);

    let err = gateway.retrieve_session("cs_nope").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(id) if id == "cs_nope"));
}

#[tokio::test]
async fn test_upstream_failure_surfaces_message() {
    let (base, _) = spawn_stub().await;
    let gateway = StripeGateway::new("sk_test_123").with_api_base(base);

    let err = gateway.retrieve_session("cs_broken").await.unwrap_err();
    match err {
        GatewayError::Rejected { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_session_id_cannot_leave_checkout_sessions() {
    let (base, captured) = spawn_stub().await;
    let gateway = StripeGateway::new("sk_test_123").with_api_base(base);

    let err = gateway
        .retrieve_session("../../customers/cus_1")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::NotFound(_)));
    assert!(captured.other_hits.lock().unwrap().is_empty());
}
