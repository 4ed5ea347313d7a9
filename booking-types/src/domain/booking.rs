//! Booking domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Unique identifier for a Booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random BookingId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a BookingId from an existing UUID.
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

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BookingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle of the service embedded in a booking.
///
/// The only legal move is `Requested -> Paid`, and it happens once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Requested,
    Paid,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Paid => "paid",
        }
    }

    /// Returns true if a booking in this status may move to `next`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Requested, BookingStatus::Paid)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(BookingStatus::Requested),
            "paid" => Ok(BookingStatus::Paid),
            _ => Err(DomainError::ValidationError(format!(
                "Unknown booking status: {}",
                s
            ))),
        }
    }
}

/// A named party with an email (service provider or payer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Party {
    #[schema(example = "Rahim Decor")]
    pub name: String,
    #[schema(example = "provider@example.com")]
    pub email: String,
}

/// The customer who requested the booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookingUser {
    /// Identity provider uid
    pub uid: String,
    pub name: String,
    pub email: String,
}

/// Copy of the service taken at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    #[schema(example = "S1")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price in major currency units
    #[schema(value_type = f64, example = 500)]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub provider: Party,
    #[serde(default)]
    pub status: BookingStatus,
}

/// A booking snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub user: BookingUser,
    pub service: ServiceSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new booking in the `requested` state.
    ///
    /// # Validation
    /// - Service id, service name and user uid cannot be empty
    /// - Unit price cannot be negative
    pub fn new(
        user: BookingUser,
        mut service: ServiceSnapshot,
        location: Option<String>,
    ) -> Result<Self, DomainError> {
        if service.id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Service id cannot be empty".into(),
            ));
        }
        if service.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Service name cannot be empty".into(),
            ));
        }
        if user.uid.trim().is_empty() {
            return Err(DomainError::ValidationError("User uid cannot be empty".into()));
        }
        if service.price.is_sign_negative() && !service.price.is_zero() {
            return Err(DomainError::NegativeAmount);
        }

        service.status = BookingStatus::Requested;

        Ok(Self {
            id: BookingId::new(),
            user,
            service,
            location,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a booking from database fields.
    pub fn from_parts(
        id: BookingId,
        user: BookingUser,
        service: ServiceSnapshot,
        location: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            service,
            location,
            created_at,
        }
    }

    pub fn status(&self) -> BookingStatus {
        self.service.status
    }
}

/// How a booking is located from checkout metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookingKey {
    Id(BookingId),
    /// A booking of `service_id` placed by the customer with this email.
    Payer { service_id: String, email: String },
    ServiceId(String),
}

/// Separates the parts of a persisted `Payer` key. Never valid in an email.
const PAYER_SEPARATOR: char = '\t';

impl BookingKey {
    /// Prefers the booking id when it parses. Otherwise the service id,
    /// narrowed to the paying customer when their email is known.
    pub fn resolve(
        booking_id: Option<&str>,
        service_id: Option<&str>,
        payer_email: Option<&str>,
    ) -> Option<Self> {
        if let Some(id) = booking_id.and_then(|s| s.trim().parse::<BookingId>().ok()) {
            return Some(BookingKey::Id(id));
        }
        let service_id = service_id.map(str::trim).filter(|s| !s.is_empty())?;
        let key = match payer_email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => BookingKey::Payer {
                service_id: service_id.to_string(),
                email: email.to_string(),
            },
            None => BookingKey::ServiceId(service_id.to_string()),
        };
        Some(key)
    }

    /// Persisted discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingKey::Id(_) => "BOOKING_ID",
            BookingKey::Payer { .. } => "SERVICE_PAYER",
            BookingKey::ServiceId(_) => "SERVICE_ID",
        }
    }

    /// Persisted value.
    pub fn value(&self) -> String {
        match self {
            BookingKey::Id(id) => id.to_string(),
            BookingKey::Payer { service_id, email } => {
                format!("{email}{PAYER_SEPARATOR}{service_id}")
            }
            BookingKey::ServiceId(s) => s.clone(),
        }
    }

    /// Rebuilds a key from its persisted parts.
    pub fn from_parts(kind: &str, value: &str) -> Result<Self, DomainError> {
        match kind {
            "BOOKING_ID" => value
                .parse()
                .map(BookingKey::Id)
                .map_err(|e: uuid::Error| DomainError::ValidationError(e.to_string())),
            "SERVICE_PAYER" => value
                .split_once(PAYER_SEPARATOR)
                .map(|(email, service_id)| BookingKey::Payer {
                    service_id: service_id.to_string(),
                    email: email.to_string(),
                })
                .ok_or_else(|| {
                    DomainError::ValidationError(format!("Malformed payer key: {}", value))
                }),
            "SERVICE_ID" => Ok(BookingKey::ServiceId(value.to_string())),
            _ => Err(DomainError::ValidationError(format!(
                "Unknown booking key kind: {}",
                kind
            ))),
        }
    }
}

impl std::fmt::Display for BookingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingKey::Id(id) => write!(f, "booking:{}", id),
            BookingKey::Payer { service_id, .. } | BookingKey::ServiceId(service_id) => {
                write!(f, "service:{}", service_id)
            }
        }
    }
}
