//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use booking_types::{
    AppError, CheckoutRequest, ConfirmationStatus, CreateBookingRequest, CreateTokenRequest,
    NotPayableResponse, PaymentConfirmation, PaymentGateway, PaymentSuccessRequest,
    ReconciliationOutcome, Repository,
};

use crate::CheckoutService;

/// Application state shared across handlers.
pub struct AppState<R: Repository, G: PaymentGateway> {
    pub service: CheckoutService<R, G>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Gateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Root greeting.
pub async fn index() -> &'static str {
    "Hello from Server..."
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Bootstrap endpoint - issues the first API token.
///
/// Only works while no token exists. The raw token is returned once.
#[tracing::instrument(skip(state, req))]
pub async fn bootstrap<R: Repository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<CreateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.service.bootstrap_token(req).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// Record a booking request.
#[tracing::instrument(skip(state, req), fields(service_id = %req.service.id))]
pub async fn create_booking<R: Repository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.service.create_booking(req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Open a hosted checkout session.
#[tracing::instrument(skip(state, req), fields(service_id = %req.service.id))]
pub async fn create_checkout_session<R: Repository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.service.create_checkout_session(req).await?;
    Ok(Json(session))
}

/// Reconcile a checkout session after the customer returns from the gateway.
///
/// 200 when the payment is on the ledger (now or earlier), 202 when the
/// session cannot be recorded.
#[tracing::instrument(skip(state, req), fields(session_id = %req.session_id))]
pub async fn payment_success<R: Repository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<PaymentSuccessRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.service.complete_payment(&req.session_id).await?;

    let response = match outcome {
        ReconciliationOutcome::Recorded {
            transaction_id,
            order_id,
        } => Json(PaymentConfirmation {
            transaction_id,
            order_id,
            status: ConfirmationStatus::Recorded,
        })
        .into_response(),
        ReconciliationOutcome::AlreadyRecorded {
            transaction_id,
            order_id,
        } => Json(PaymentConfirmation {
            transaction_id,
            order_id,
            status: ConfirmationStatus::AlreadyRecorded,
        })
        .into_response(),
        ReconciliationOutcome::NotPayable { reason, detail } => (
            StatusCode::ACCEPTED,
            Json(NotPayableResponse::new(reason, detail)),
        )
            .into_response(),
    };

    Ok(response)
}

/// Get a ledger entry by transaction id.
#[tracing::instrument(skip(state))]
pub async fn get_payment<R: Repository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state
        .service
        .get_payment_by_transaction(&transaction_id)
        .await?;
    Ok(Json(payment))
}
