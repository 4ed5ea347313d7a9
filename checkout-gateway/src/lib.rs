//! # Checkout Gateway
//!
//! Adapters implementing the `PaymentGateway` port:
//! - `StripeGateway` talks to the Stripe Checkout Sessions API over HTTPS
//! - `SandboxGateway` keeps sessions in memory for local development and tests

pub mod sandbox;
pub mod stripe;

pub use sandbox::SandboxGateway;
pub use stripe::{STRIPE_API_BASE, StripeGateway, encode_checkout_form};
