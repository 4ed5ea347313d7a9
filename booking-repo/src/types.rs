//! Database row types shared by the SQLite and PostgreSQL adapters.
//!
//! Identifiers are read back as text (Postgres queries cast `id::text`),
//! decimal prices are stored as text, timestamps decode into `DateTime<Utc>`
//! on both backends.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use booking_types::{
    ApiToken, ApiTokenId, Booking, BookingId, BookingKey, BookingStatus, BookingUser, Currency,
    Money, Party, PaymentId, PaymentRecord, PaymentStatus, PendingReconciliation, RepoError,
    ReconciliationStatus, ServiceSnapshot,
};

// ─────────────────────────────────────────────────────────────────────────────
// Column lists
// ─────────────────────────────────────────────────────────────────────────────

pub const BOOKING_COLUMNS: &str = "user_uid, user_name, user_email, service_id, service_name, \
     service_description, service_price, service_image, service_category, provider_name, \
     provider_email, service_status, location, created_at";

pub const PAYMENT_COLUMNS: &str = "transaction_id, service_id, payer_name, payer_email, \
     provider_name, provider_email, service_name, category, unit_price, image, quantity, \
     amount_minor, currency, price, location, status, created_at";

pub const RECONCILIATION_COLUMNS: &str = "transaction_id, key_kind, key_value, target_status, \
     status, attempts, last_error, created_at, processed_at";

// ─────────────────────────────────────────────────────────────────────────────
// Row structs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
pub struct DbBooking {
    pub id: String,
    pub user_uid: String,
    pub user_name: String,
    pub user_email: String,
    pub service_id: String,
    pub service_name: String,
    pub service_description: Option<String>,
    pub service_price: String,
    pub service_image: Option<String>,
    pub service_category: Option<String>,
    pub provider_name: String,
    pub provider_email: String,
    pub service_status: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub struct DbPayment {
    pub id: String,
    pub transaction_id: String,
    pub service_id: String,
    pub booking_id: Option<String>,
    pub payer_name: String,
    pub payer_email: String,
    pub provider_name: String,
    pub provider_email: String,
    pub service_name: String,
    pub category: Option<String>,
    pub unit_price: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub amount_minor: i64,
    pub currency: String,
    pub price: String,
    pub location: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub struct DbPendingReconciliation {
    pub id: String,
    pub transaction_id: String,
    pub key_kind: String,
    pub key_value: String,
    pub target_status: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
pub struct DbApiToken {
    pub id: String,
    pub name: String,
    pub token_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

pub fn parse_decimal(s: &str) -> Result<Decimal, RepoError> {
    Decimal::from_str(s).map_err(|e| RepoError::Database(format!("Bad decimal {}: {}", s, e)))
}

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    Currency::from_str(s).map_err(|_| RepoError::Database(format!("Unknown currency: {}", s)))
}

fn parse_booking_status(s: &str) -> Result<BookingStatus, RepoError> {
    BookingStatus::from_str(s).map_err(RepoError::Domain)
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, RepoError> {
    match s {
        "paid" => Ok(PaymentStatus::Paid),
        _ => Err(RepoError::Database(format!("Unknown payment status: {}", s))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbBooking {
    pub fn into_domain(self) -> Result<Booking, RepoError> {
        let id = BookingId::from_uuid(parse_uuid(&self.id)?);
        let service = ServiceSnapshot {
            id: self.service_id,
            name: self.service_name,
            description: self.service_description,
            price: parse_decimal(&self.service_price)?,
            image: self.service_image,
            category: self.service_category,
            provider: Party {
                name: self.provider_name,
                email: self.provider_email,
            },
            status: parse_booking_status(&self.service_status)?,
        };
        let user = BookingUser {
            uid: self.user_uid,
            name: self.user_name,
            email: self.user_email,
        };

        Ok(Booking::from_parts(
            id,
            user,
            service,
            self.location,
            self.created_at,
        ))
    }
}

impl DbPayment {
    pub fn into_domain(self) -> Result<PaymentRecord, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let amount = Money::new(self.amount_minor, currency).map_err(RepoError::Domain)?;
        let booking_id = self
            .booking_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(BookingId::from_uuid);
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| RepoError::Database(format!("Bad quantity: {}", self.quantity)))?;

        Ok(PaymentRecord {
            id: PaymentId::from_uuid(parse_uuid(&self.id)?),
            transaction_id: self.transaction_id,
            service_id: self.service_id,
            booking_id,
            payer: Party {
                name: self.payer_name,
                email: self.payer_email,
            },
            provider: Party {
                name: self.provider_name,
                email: self.provider_email,
            },
            service_name: self.service_name,
            category: self.category,
            unit_price: parse_decimal(&self.unit_price)?,
            image: self.image,
            quantity,
            amount,
            price: parse_decimal(&self.price)?,
            location: self.location,
            status: parse_payment_status(&self.status)?,
            created_at: self.created_at,
        })
    }
}

impl DbPendingReconciliation {
    pub fn into_domain(self) -> Result<PendingReconciliation, RepoError> {
        let booking_key =
            BookingKey::from_parts(&self.key_kind, &self.key_value).map_err(RepoError::Domain)?;
        let status = self
            .status
            .parse::<ReconciliationStatus>()
            .unwrap_or_default();

        Ok(PendingReconciliation {
            id: parse_uuid(&self.id)?,
            transaction_id: self.transaction_id,
            booking_key,
            target_status: parse_booking_status(&self.target_status)?,
            status,
            attempts: self.attempts,
            last_error: self.last_error,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}

impl DbApiToken {
    pub fn into_domain(self) -> Result<ApiToken, RepoError> {
        Ok(ApiToken {
            id: ApiTokenId::from_uuid(parse_uuid(&self.id)?),
            name: self.name,
            token_hash: self.token_hash,
            is_active: self.is_active,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        })
    }
}

/// Maps a write failure, surfacing unique-index violations as `Conflict`.
pub fn map_write_error(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => RepoError::Database(err.to_string()),
    }
}
