//! Drives the SDK against a real server bound to a local port, backed by a
//! SQLite file and the sandbox gateway.

use std::sync::Arc;

use booking_client::{BookingsClient, ClientError, PaymentResult};
use booking_hex::{CheckoutService, CheckoutSettings, inbound::HttpServer};
use booking_repo::SqliteRepo;
use booking_types::{
    BookedService, BookingStatus, BookingUser, CheckoutItem, CheckoutPayer, CheckoutRequest,
    ConfirmationStatus, CreateBookingRequest, NotPayableReason, Party,
};
use checkout_gateway::SandboxGateway;
use rust_decimal_macros::dec;
use tempfile::TempDir;

struct LiveServer {
    base_url: String,
    gateway: Arc<SandboxGateway>,
    _dir: TempDir,
}

async fn start_server() -> LiveServer {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bookings.db");
    let repo = SqliteRepo::new(&format!("sqlite://{}?mode=rwc", db_path.display()))
        .await
        .unwrap();

    let gateway = Arc::new(SandboxGateway::new());
    let service = CheckoutService::new(
        repo,
        gateway.clone(),
        CheckoutSettings::new("http://localhost:5173"),
    );
    let router = HttpServer::new(service).router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    LiveServer {
        base_url: format!("http://{}", addr),
        gateway,
        _dir: dir,
    }
}

fn booking_request() -> CreateBookingRequest {
    CreateBookingRequest {
        user: BookingUser {
            uid: "u-1".to_string(),
            name: "Nadia".to_string(),
            email: "nadia@example.com".to_string(),
        },
        service: BookedService {
            id: "S1".to_string(),
            name: "Wedding Stage Decor".to_string(),
            description: None,
            price: dec!(500),
            image: None,
            category: Some("wedding".to_string()),
            provider: Party {
                name: "Rahim Decor".to_string(),
                email: "rahim@example.com".to_string(),
            },
        },
        location: None,
    }
}

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        service: CheckoutItem {
            id: "S1".to_string(),
            name: "Wedding Stage Decor".to_string(),
            image: None,
            description: None,
            price: None,
        },
        total_price: dec!(500),
        user: CheckoutPayer {
            name: "Nadia".to_string(),
            email: "nadia@example.com".to_string(),
        },
        location: None,
        booking_id: None,
    }
}

#[tokio::test]
async fn test_sdk_checkout_round_trip() {
    let server = start_server().await;
    let anonymous = BookingsClient::new(&server.base_url);
    assert!(anonymous.health().await.unwrap());

    let token = anonymous.bootstrap("sdk-test").await.unwrap();
    let client = BookingsClient::new(&server.base_url).with_api_token(token);

    let booking = client.create_booking(&booking_request()).await.unwrap();
    assert_eq!(booking.status(), BookingStatus::Requested);

    let url = client
        .create_checkout_session(&checkout_request())
        .await
        .unwrap();
    let session_id = url.rsplit('/').next().unwrap().to_string();

    match client.confirm_payment(&session_id).await.unwrap() {
        PaymentResult::NotPayable(body) => {
            assert_eq!(body.reason, NotPayableReason::SessionNotComplete)
        }
        other => panic!("expected NotPayable, got {:?}", other),
    }

    server.gateway.complete(&session_id, "pi_1").unwrap();

    let PaymentResult::Confirmed(confirmation) = client.confirm_payment(&session_id).await.unwrap()
    else {
        panic!("payment should be confirmed");
    };
    assert_eq!(confirmation.status, ConfirmationStatus::Recorded);

    let payment = client.get_payment("pi_1").await.unwrap();
    assert_eq!(payment.id, confirmation.order_id);
    assert_eq!(payment.price, dec!(500));
    assert_eq!(payment.booking_id, Some(booking.id));
}

#[tokio::test]
async fn test_sdk_surfaces_api_errors() {
    let server = start_server().await;
    let client = BookingsClient::new(&server.base_url).with_api_token("bk_unknown");

    let err = client.get_payment("pi_1").await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API token");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}
