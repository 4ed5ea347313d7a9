//! In-memory gateway for local development and tests.
//!
//! Sessions live in a `DashMap`. Tests drive them to a terminal state with
//! [`SandboxGateway::complete`] and [`SandboxGateway::expire`]; a gateway
//! built with [`SandboxGateway::auto_completing`] marks every session paid
//! as soon as it is created, which is handy when running the server locally.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use booking_types::{
    CreatedCheckoutSession, GatewayError, GatewaySession, NewCheckoutSession, PaymentGateway,
    SessionStatus,
};

pub const SANDBOX_CHECKOUT_BASE: &str = "https://sandbox.checkout.local/pay";

pub struct SandboxGateway {
    sessions: DashMap<String, GatewaySession>,
    requests: Mutex<Vec<NewCheckoutSession>>,
    auto_complete: bool,
    unavailable: AtomicBool,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            requests: Mutex::new(Vec::new()),
            auto_complete: false,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn auto_completing() -> Self {
        Self {
            auto_complete: true,
            ..Self::new()
        }
    }

    /// Checkout requests received so far, oldest first.
    pub fn requests(&self) -> Vec<NewCheckoutSession> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Seeds a session as if the gateway had produced it.
    pub fn insert_session(&self, session: GatewaySession) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Marks a session paid under the given transaction id.
    pub fn complete(
        &self,
        session_id: &str,
        payment_intent: &str,
    ) -> Result<GatewaySession, GatewayError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| GatewayError::NotFound(session_id.to_string()))?;
        entry.status = SessionStatus::Complete;
        entry.payment_intent = Some(payment_intent.to_string());
        Ok(entry.clone())
    }

    pub fn expire(&self, session_id: &str) -> Result<GatewaySession, GatewayError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| GatewayError::NotFound(session_id.to_string()))?;
        entry.status = SessionStatus::Expired;
        Ok(entry.clone())
    }

    /// Makes every call fail with a transport error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Request("sandbox gateway unavailable".into()));
        }
        Ok(())
    }
}

impl Default for SandboxGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_checkout_session(
        &self,
        request: NewCheckoutSession,
    ) -> Result<CreatedCheckoutSession, GatewayError> {
        self.check_available()?;

        let id = format!("cs_sandbox_{}", Uuid::new_v4().simple());
        let amount_total: i64 = request
            .line_items
            .iter()
            .map(|item| item.unit_amount.amount() * i64::from(item.quantity))
            .sum();
        let currency = request
            .line_items
            .first()
            .map(|item| item.unit_amount.currency().gateway_code());

        let (status, payment_intent) = if self.auto_complete {
            (
                SessionStatus::Complete,
                Some(format!("pi_sandbox_{}", Uuid::new_v4().simple())),
            )
        } else {
            (SessionStatus::Open, None)
        };

        let session = GatewaySession {
            id: id.clone(),
            status,
            amount_total: Some(amount_total),
            currency,
            customer_email: Some(request.customer_email.clone()),
            payment_intent,
            metadata: request.metadata.clone(),
        };
        self.sessions.insert(id.clone(), session);

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        info!(session_id = %id, amount_total, "Sandbox checkout session created");

        Ok(CreatedCheckoutSession {
            url: format!("{SANDBOX_CHECKOUT_BASE}/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError> {
        self.check_available()?;
        debug!(session_id, "Sandbox session lookup");
        self.sessions
            .get(session_id)
            .map(|s| s.clone())
            .ok_or_else(|| GatewayError::NotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_types::{CheckoutMode, Currency, LineItem, Money};
    use std::collections::BTreeMap;

    fn request() -> NewCheckoutSession {
        NewCheckoutSession {
            line_items: vec![LineItem {
                name: "Stage Decor".into(),
                description: "No description available...!".into(),
                images: vec![],
                unit_amount: Money::new(50000, Currency::BDT).unwrap(),
                quantity: 1,
            }],
            customer_email: "nadia@example.com".into(),
            mode: CheckoutMode::Payment,
            metadata: BTreeMap::from([("serviceId".to_string(), "S1".to_string())]),
            success_url: "https://shop.example.com/payment-success".into(),
            cancel_url: "https://shop.example.com/dashboard/bookings".into(),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let gateway = SandboxGateway::new();
        let created = gateway.create_checkout_session(request()).await.unwrap();
        assert!(created.url.ends_with(&created.id));

        let open = gateway.retrieve_session(&created.id).await.unwrap();
        assert_eq!(open.status, SessionStatus::Open);
        assert_eq!(open.amount_total, Some(50000));
        assert_eq!(open.currency.as_deref(), Some("bdt"));
        assert!(open.payment_intent.is_none());

        gateway.complete(&created.id, "pi_1").unwrap();
        let paid = gateway.retrieve_session(&created.id).await.unwrap();
        assert!(paid.is_complete());
        assert_eq!(paid.payment_intent.as_deref(), Some("pi_1"));
        assert_eq!(paid.metadata_value("serviceId"), Some("S1"));
    }

    #[tokio::test]
    async fn test_auto_completing_sessions_are_paid() {
        let gateway = SandboxGateway::auto_completing();
        let created = gateway.create_checkout_session(request()).await.unwrap();

        let session = gateway.retrieve_session(&created.id).await.unwrap();
        assert!(session.is_complete());
        assert!(session.payment_intent.unwrap().starts_with("pi_sandbox_"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let gateway = SandboxGateway::new();
        let err = gateway.retrieve_session("cs_missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unavailable_gateway_fails_requests() {
        let gateway = SandboxGateway::new();
        gateway.set_unavailable(true);

        let err = gateway.create_checkout_session(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Request(_)));
        assert!(gateway.requests().is_empty());
    }
}
