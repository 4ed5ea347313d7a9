//! Hosted checkout session model, as exchanged with a payment gateway.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::booking::BookingKey;
use super::money::Money;

/// Metadata key carrying the service id.
pub const META_SERVICE_ID: &str = "serviceId";
/// Metadata key carrying the booking id.
pub const META_BOOKING_ID: &str = "bookingId";
/// Metadata key carrying the payer display name.
pub const META_CUSTOMER: &str = "customer";
/// Metadata key carrying the service location.
pub const META_LOCATION: &str = "location";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// One-shot payment.
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
        }
    }
}

/// A single priced line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub unit_amount: Money,
    pub quantity: u32,
}

/// Everything a gateway needs to open a checkout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCheckoutSession {
    pub line_items: Vec<LineItem>,
    pub customer_email: String,
    pub mode: CheckoutMode,
    pub metadata: BTreeMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Gateway acknowledgement of a created session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: String,
}

/// Status reported by the gateway for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionStatus {
    Open,
    Complete,
    Expired,
    Other(String),
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Complete => "complete",
            SessionStatus::Expired => "expired",
            SessionStatus::Other(s) => s,
        }
    }
}

impl From<String> for SessionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "open" => SessionStatus::Open,
            "complete" => SessionStatus::Complete,
            "expired" => SessionStatus::Expired,
            _ => SessionStatus::Other(s),
        }
    }
}

impl From<SessionStatus> for String {
    fn from(s: SessionStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authoritative session record retrieved from the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySession {
    pub id: String,
    pub status: SessionStatus,
    /// Settled amount in minor units
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    /// Gateway transaction identifier
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl GatewaySession {
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Complete
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Locates the booking this session pays for.
    pub fn booking_key(&self) -> Option<BookingKey> {
        BookingKey::resolve(
            self.metadata_value(META_BOOKING_ID),
            self.metadata_value(META_SERVICE_ID),
            self.customer_email.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: &str) -> GatewaySession {
        GatewaySession {
            id: "cs_test_1".to_string(),
            status: SessionStatus::from(status.to_string()),
            amount_total: Some(50000),
            currency: Some("bdt".to_string()),
            customer_email: Some("nadia@example.com".to_string()),
            payment_intent: Some("pi_1".to_string()),
            metadata: BTreeMap::from([(META_SERVICE_ID.to_string(), "S1".to_string())]),
        }
    }

    #[test]
    fn test_status_parsing() {
        assert!(session("complete").is_complete());
        assert!(!session("open").is_complete());
        assert_eq!(
            SessionStatus::from("canceled".to_string()),
            SessionStatus::Other("canceled".to_string())
        );
    }

    #[test]
    fn test_booking_key_from_metadata() {
        let key = session("complete").booking_key().unwrap();
        assert_eq!(
            key,
            BookingKey::Payer {
                service_id: "S1".to_string(),
                email: "nadia@example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_metadata_values_are_ignored() {
        let mut s = session("complete");
        s.metadata
            .insert(META_SERVICE_ID.to_string(), String::new());
        assert!(s.booking_key().is_none());
    }
}
