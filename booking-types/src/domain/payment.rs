//! Payment ledger domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::booking::{Booking, BookingId, Party};
use super::money::Money;

/// Unique identifier for a ledger entry, shown to the customer as the order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random PaymentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a PaymentId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A settled payment.
///
/// Ledger entries are immutable once created. `transaction_id` is unique
/// across the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Order id
    pub id: PaymentId,
    /// Gateway payment-intent id
    #[schema(example = "pi_3PqX...")]
    pub transaction_id: String,
    #[schema(example = "S1")]
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<BookingId>,
    pub payer: Party,
    pub provider: Party,
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Unit price at booking time, major units
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub quantity: u32,
    /// Settled amount reported by the gateway
    pub amount: Money,
    /// Settled amount in major units
    #[schema(value_type = f64, example = 500)]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Builds the ledger entry for a settled checkout of `booking`.
    ///
    /// The price always comes from the gateway's settled `amount`.
    pub fn settle(
        booking: &Booking,
        transaction_id: String,
        amount: Money,
        payer: Party,
        location: Option<String>,
    ) -> Self {
        let service = &booking.service;
        Self {
            id: PaymentId::new(),
            transaction_id,
            service_id: service.id.clone(),
            booking_id: Some(booking.id),
            payer,
            provider: service.provider.clone(),
            service_name: service.name.clone(),
            category: service.category.clone(),
            unit_price: service.price,
            image: service.image.clone(),
            quantity: 1,
            price: amount.major(),
            amount,
            location: location.or_else(|| booking.location.clone()),
            status: PaymentStatus::Paid,
            created_at: Utc::now(),
        }
    }
}
