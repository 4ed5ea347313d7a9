//! # Booking Types
//!
//! Domain types and port traits for the booking payment service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Booking, PaymentRecord, checkout sessions)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    ApiToken, ApiTokenId, Booking, BookingId, BookingKey, BookingStatus, BookingUser,
    CheckoutMode, CreatedCheckoutSession, Currency, GatewaySession, LineItem, META_BOOKING_ID,
    META_CUSTOMER, META_LOCATION, META_SERVICE_ID, Money, NewCheckoutSession, NotPayableReason,
    Party, PaymentId, PaymentRecord, PaymentStatus, PendingReconciliation, ReconciliationOutcome,
    ReconciliationStatus, ServiceSnapshot, SessionStatus,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::{
    BookingStore, GatewayError, PaymentGateway, PaymentLedger, ReconciliationQueue, Repository,
    TokenStore,
};
