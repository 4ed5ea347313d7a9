//! Stripe Checkout adapter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, instrument, warn};

use booking_types::{
    CreatedCheckoutSession, GatewayError, GatewaySession, NewCheckoutSession, PaymentGateway,
    SessionStatus,
};

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe hosted-checkout gateway.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    /// Points the adapter at a different API root (proxies, test doubles).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn read_error(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);
        error!(status = %status, message = %message, "Stripe API error");
        GatewayError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// Stripe object ids are ASCII alphanumerics and underscores. Anything else
/// would change the request path.
fn is_session_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Flattens a checkout request into Stripe's bracketed form encoding.
pub fn encode_checkout_form(session: &NewCheckoutSession) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = Vec::new();

    for (i, item) in session.line_items.iter().enumerate() {
        let price = format!("line_items[{i}][price_data]");
        form.push((
            format!("{price}[currency]"),
            item.unit_amount.currency().gateway_code(),
        ));
        form.push((
            format!("{price}[unit_amount]"),
            item.unit_amount.amount().to_string(),
        ));
        form.push((format!("{price}[product_data][name]"), item.name.clone()));
        form.push((
            format!("{price}[product_data][description]"),
            item.description.clone(),
        ));
        for (j, image) in item.images.iter().enumerate() {
            form.push((format!("{price}[product_data][images][{j}]"), image.clone()));
        }
        form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    form.push(("customer_email".into(), session.customer_email.clone()));
    form.push(("mode".into(), session.mode.as_str().into()));
    for (key, value) in &session.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form.push(("success_url".into(), session.success_url.clone()));
    form.push(("cancel_url".into(), session.cancel_url.clone()));

    form
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
    status: Option<String>,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<StripeCustomerDetails>,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl From<StripeCheckoutSession> for GatewaySession {
    fn from(s: StripeCheckoutSession) -> Self {
        let customer_email = s
            .customer_email
            .or_else(|| s.customer_details.and_then(|d| d.email));
        GatewaySession {
            id: s.id,
            status: s
                .status
                .map(SessionStatus::from)
                .unwrap_or_else(|| SessionStatus::Other("unknown".into())),
            amount_total: s.amount_total,
            currency: s.currency,
            customer_email,
            payment_intent: s.payment_intent,
            metadata: s.metadata,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, session), fields(customer = %session.customer_email))]
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CreatedCheckoutSession, GatewayError> {
        let form = encode_checkout_form(&session);
        debug!(fields = form.len(), "Creating Stripe checkout session");

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Stripe API request failed");
                GatewayError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let created: StripeCheckoutSession = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let url = created
            .url
            .ok_or_else(|| GatewayError::Decode("checkout session has no url".into()))?;

        Ok(CreatedCheckoutSession {
            id: created.id,
            url,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError> {
        if !is_session_id(session_id) {
            warn!("Rejecting malformed checkout session id");
            return Err(GatewayError::NotFound(session_id.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.api_base, session_id))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Stripe API request failed");
                GatewayError::Request(e.to_string())
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(session_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let session: StripeCheckoutSession = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(session.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_types::{CheckoutMode, Currency, LineItem, Money};

    fn request() -> NewCheckoutSession {
        NewCheckoutSession {
            line_items: vec![LineItem {
                name: "Wedding Stage Decor".into(),
                description: "Full stage setup".into(),
                images: vec!["https://img.example.com/stage.png".into()],
                unit_amount: Money::new(50000, Currency::BDT).unwrap(),
                quantity: 1,
            }],
            customer_email: "nadia@example.com".into(),
            mode: CheckoutMode::Payment,
            metadata: BTreeMap::from([
                ("serviceId".to_string(), "S1".to_string()),
                ("customer".to_string(), "Nadia".to_string()),
            ]),
            success_url: "https://shop.example.com/payment-success?session_id={CHECKOUT_SESSION_ID}"
                .into(),
            cancel_url: "https://shop.example.com/dashboard/bookings".into(),
        }
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_carries_line_item() {
        let form = encode_checkout_form(&request());

        assert_eq!(
            field(&form, "line_items[0][price_data][unit_amount]"),
            Some("50000")
        );
        assert_eq!(
            field(&form, "line_items[0][price_data][currency]"),
            Some("bdt")
        );
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("1"));
        assert_eq!(
            field(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://img.example.com/stage.png")
        );
    }

    #[test]
    fn test_form_carries_metadata_and_mode() {
        let form = encode_checkout_form(&request());

        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(field(&form, "metadata[serviceId]"), Some("S1"));
        assert_eq!(field(&form, "metadata[customer]"), Some("Nadia"));
        assert_eq!(field(&form, "customer_email"), Some("nadia@example.com"));
    }

    #[test]
    fn test_session_falls_back_to_customer_details_email() {
        let raw = r#"{
            "id": "cs_test_1",
            "url": null,
            "status": "complete",
            "amount_total": 50000,
            "currency": "bdt",
            "customer_email": null,
            "customer_details": {"email": "nadia@example.com"},
            "payment_intent": "pi_1",
            "metadata": {"serviceId": "S1"}
        }"#;
        let parsed: StripeCheckoutSession = serde_json::from_str(raw).unwrap();
        let session = GatewaySession::from(parsed);

        assert!(session.is_complete());
        assert_eq!(session.customer_email.as_deref(), Some("nadia@example.com"));
        assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
    }

    #[test]
    fn test_session_id_shape() {
        assert!(is_session_id("cs_test_a1B2"));
        assert!(!is_session_id(""));
        assert!(!is_session_id("../../customers/cus_1"));
        assert!(!is_session_id("cs_1?expand[]=customer"));
        assert!(!is_session_id("cs_1%2F"));
    }
}
