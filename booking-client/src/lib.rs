//! # Booking Client SDK
//!
//! A typed Rust client for the booking payment API.

use booking_types::{
    Booking, CheckoutRequest, CheckoutSessionResponse, CreateBookingRequest, CreateTokenRequest,
    NotPayableResponse, PaymentConfirmation, PaymentRecord, PaymentSuccessRequest, TokenResponse,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the server did with a returning checkout session.
#[derive(Debug, Clone)]
pub enum PaymentResult {
    /// The payment is on the ledger (recorded now or earlier).
    Confirmed(PaymentConfirmation),
    /// Nothing was recorded; the reason says why.
    NotPayable(NotPayableResponse),
}

/// Booking API client.
pub struct BookingsClient {
    base_url: String,
    api_token: Option<String>,
    http: Client,
}

impl BookingsClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            http: Client::new(),
        }
    }

    /// Sets the API token for authentication.
    pub fn with_api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Issues the first API token. Returns the raw token.
    pub async fn bootstrap(&self, name: &str) -> Result<String, ClientError> {
        let req = CreateTokenRequest {
            name: name.to_string(),
        };
        let resp: TokenResponse = self.post("/bootstrap", &req).await?;
        Ok(resp.api_token)
    }

    /// Records a booking request.
    pub async fn create_booking(&self, req: &CreateBookingRequest) -> Result<Booking, ClientError> {
        self.post("/booking-data", req).await
    }

    /// Opens a hosted checkout session and returns its redirect URL.
    pub async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> Result<String, ClientError> {
        let resp: CheckoutSessionResponse = self.post("/create-checkout-session", req).await?;
        Ok(resp.url)
    }

    /// Reports a returning checkout session so the payment gets recorded.
    pub async fn confirm_payment(&self, session_id: &str) -> Result<PaymentResult, ClientError> {
        let req = PaymentSuccessRequest {
            session_id: session_id.to_string(),
        };
        let resp = self
            .authorize(self.http.post(self.url("/payment-success")).json(&req))
            .send()
            .await?;

        if resp.status() == StatusCode::ACCEPTED {
            let body = resp.text().await?;
            return Ok(PaymentResult::NotPayable(serde_json::from_str(&body)?));
        }
        self.handle_response(resp).await.map(PaymentResult::Confirmed)
    }

    /// Gets a ledger entry by transaction id.
    pub async fn get_payment(&self, transaction_id: &str) -> Result<PaymentRecord, ClientError> {
        self.get(&format!("/payments/{}", transaction_id)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.authorize(self.http.get(self.url(path))).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .authorize(self.http.post(self.url(path)).json(body))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = BookingsClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = BookingsClient::new("http://localhost:3000/");
        assert_eq!(client.url("/health"), "http://localhost:3000/health");
    }

    #[test]
    fn test_client_with_api_token() {
        let client = BookingsClient::new("http://localhost:3000").with_api_token("bk_test");
        assert_eq!(client.api_token, Some("bk_test".to_string()));
    }
}
