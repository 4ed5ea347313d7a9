//! Authentication middleware for API token validation.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use booking_types::{ApiTokenId, PaymentGateway, Repository};

use super::handlers::AppState;

/// Token that authenticated the current request. Inserted as a request
/// extension; absent on public routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedToken(pub ApiTokenId);

/// Extracts the API token from the Authorization header.
/// Expected format: "Bearer <token>" or just "<token>"
fn extract_token(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    Some(header.strip_prefix("Bearer ").unwrap_or(header).trim())
}

/// Paths served without a token.
fn is_public(method: &Method, path: &str) -> bool {
    match path {
        "/" | "/health" => true,
        "/bootstrap" => method == Method::POST,
        _ => path.starts_with("/swagger-ui") || path.starts_with("/api-docs"),
    }
}

/// Authentication middleware that validates API tokens.
///
/// This middleware:
/// 1. Extracts the token from the Authorization header
/// 2. Hashes it using SHA-256
/// 3. Verifies the hash against the token store
/// 4. Returns 401 Unauthorized if validation fails
///
/// Endpoints that bypass authentication:
/// - `/` and `/health`
/// - `POST /bootstrap` - issues the first token (only works when none exist)
/// - API docs
pub async fn auth_middleware<R: Repository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let token = match extract_token(auth_header) {
        Some(token) if !token.is_empty() => token,
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let token_hash = booking_repo::security::hash_token(token);

    match state.service.repo().verify_token_hash(&token_hash).await {
        Ok(Some(api_token)) => {
            request
                .extensions_mut()
                .insert(AuthenticatedToken(api_token.id));
            next.run(request).await
        }
        Ok(None) => unauthorized_response("Invalid API token"),
        Err(e) => {
            tracing::error!("API token verification failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Internal server error",
                    "code": 500
                })),
            )
                .into_response()
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}
