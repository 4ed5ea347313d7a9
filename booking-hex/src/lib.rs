//! # Booking Hex
//!
//! Application service layer and HTTP adapter for the booking payment
//! service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (checkout and reconciliation)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `openapi/` - OpenAPI document served at `/api-docs/openapi.json`
//!
//! The service is generic over `R: Repository` and `G: PaymentGateway`,
//! allowing different store and gateway adapters to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;


pub use service::{CheckoutService, CheckoutSettings, DEFAULT_DESCRIPTION};
