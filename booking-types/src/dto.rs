//! Data Transfer Objects (DTOs) for requests and responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BookingId, BookingUser, NotPayableReason, Party, PaymentId};

// ─────────────────────────────────────────────────────────────────────────────
// Booking DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Service details captured when a customer books it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookedService {
    #[schema(example = "S1")]
    pub id: String,
    #[schema(example = "Wedding Stage Decor")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in major currency units
    #[schema(value_type = f64, example = 500)]
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub provider: Party,
}

/// Request to create a booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user: BookingUser,
    pub service: BookedService,
    #[serde(default)]
    #[schema(example = "Dhaka")]
    pub location: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Checkout DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Service shown on the hosted checkout page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    #[schema(example = "S1")]
    pub id: String,
    #[schema(example = "Wedding Stage Decor")]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price, informational only
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
}

/// The customer paying for the booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutPayer {
    #[schema(example = "Nadia")]
    pub name: String,
    #[schema(example = "nadia@example.com")]
    pub email: String,
}

/// Request to open a hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub service: CheckoutItem,
    /// Amount to charge in major currency units
    #[schema(value_type = f64, example = 500)]
    pub total_price: Decimal,
    pub user: CheckoutPayer,
    #[serde(default)]
    pub location: Option<String>,
    /// Booking being paid for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<BookingId>,
}

/// Response after opening a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSessionResponse {
    /// Gateway-hosted page to redirect the customer to
    #[schema(example = "https://checkout.stripe.com/c/pay/cs_test_a1b2")]
    pub url: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciliation DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request sent by the success page after the gateway redirect.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessRequest {
    #[schema(example = "cs_test_a1b2")]
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// This call wrote the ledger entry
    Recorded,
    /// An earlier call already wrote it
    AlreadyRecorded,
}

/// Confirmation shown to the customer once the payment is on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    #[schema(example = "pi_3PqX...")]
    pub transaction_id: String,
    pub order_id: PaymentId,
    pub status: ConfirmationStatus,
}

/// Deterministic body for a reconciliation call that wrote nothing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotPayableResponse {
    /// Always `not_payable`
    #[schema(example = "not_payable")]
    pub status: String,
    pub reason: NotPayableReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl NotPayableResponse {
    pub fn new(reason: NotPayableReason, detail: Option<String>) -> Self {
        Self {
            status: "not_payable".to_string(),
            reason,
            detail,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to issue an API token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTokenRequest {
    /// Name for the token
    #[schema(example = "storefront")]
    pub name: String,
}

/// A freshly issued token. The raw value is never shown again.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[schema(example = "bk_abc123xyz...")]
    pub api_token: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_checkout_request_accepts_json_numbers() {
        let json = r#"{
            "service": {"id": "S1", "name": "Stage Decor", "image": "https://img/x.png"},
            "totalPrice": 19.99,
            "user": {"name": "Nadia", "email": "nadia@example.com"}
        }"#;

        let req: CheckoutRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.total_price, dec!(19.99));
        assert!(req.location.is_none());
        assert!(req.booking_id.is_none());
    }

    #[test]
    fn test_not_payable_shape() {
        let body = serde_json::to_value(NotPayableResponse::new(
            NotPayableReason::BookingNotFound,
            None,
        ))
        .unwrap();

        assert_eq!(body["status"], "not_payable");
        assert_eq!(body["reason"], "booking_not_found");
        assert!(body.get("detail").is_none());
    }
}
