//! Payment gateway port.
//!
//! This trait defines the interface for hosted-checkout providers.
//! Implementations can be HTTP clients, in-memory sandboxes, etc.

use crate::domain::{CreatedCheckoutSession, GatewaySession, NewCheckoutSession};

/// Error type for payment gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Request(String),

    #[error("Gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unreadable gateway response: {0}")]
    Decode(String),

    #[error("Checkout session not found: {0}")]
    NotFound(String),
}

/// Port trait for hosted-checkout payment gateways.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Opens a hosted checkout session and returns its redirect URL.
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CreatedCheckoutSession, GatewayError>;

    /// Fetches the authoritative state of a session.
    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError>;
}

#[async_trait::async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for std::sync::Arc<T> {
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CreatedCheckoutSession, GatewayError> {
        (**self).create_checkout_session(session).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError> {
        (**self).retrieve_session(session_id).await
    }
}

#[async_trait::async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Box<T> {
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CreatedCheckoutSession, GatewayError> {
        (**self).create_checkout_session(session).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError> {
        (**self).retrieve_session(session_id).await
    }
}
