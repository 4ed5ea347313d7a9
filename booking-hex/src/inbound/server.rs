//! HTTP Server configuration and startup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use booking_types::{PaymentGateway, Repository};

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::CheckoutService;
use crate::openapi::ApiDoc;

/// Storefront origins allowed when none are configured.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:5174"];

/// HTTP Server for the Booking API.
pub struct HttpServer<R: Repository, G: PaymentGateway> {
    state: Arc<AppState<R, G>>,
    rate_limiter: Arc<RateLimiterState>,
    cors_origins: Vec<HeaderValue>,
}

impl<R: Repository, G: PaymentGateway> HttpServer<R, G> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: CheckoutService<R, G>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()),
            cors_origins: DEFAULT_CORS_ORIGINS
                .into_iter()
                .map(HeaderValue::from_static)
                .collect(),
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: CheckoutService<R, G>, requests_per_minute: u32) -> Self {
        let mut server = Self::new(service);
        server.rate_limiter = Arc::new(RateLimiterState::new(
            requests_per_minute,
            Duration::from_secs(60),
        ));
        server
    }

    /// Replaces the allowed browser origins. Unparseable entries are skipped.
    pub fn with_cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cors_origins = origins
            .into_iter()
            .filter_map(|o| {
                let origin = o.as_ref().trim();
                match HeaderValue::from_str(origin) {
                    Ok(value) if !origin.is_empty() => Some(value),
                    _ => {
                        tracing::warn!(origin, "Ignoring invalid CORS origin");
                        None
                    }
                }
            })
            .collect();
        self
    }

    fn cors(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.cors_origins.clone()))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Uses the globally set MeterProvider
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let api = Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route("/bootstrap", post(handlers::bootstrap::<R, G>))
            .route("/booking-data", post(handlers::create_booking::<R, G>))
            .route(
                "/create-checkout-session",
                post(handlers::create_checkout_session::<R, G>),
            )
            .route("/payment-success", post(handlers::payment_success::<R, G>))
            .route(
                "/payments/{transaction_id}",
                get(handlers::get_payment::<R, G>),
            )
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R, G>,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(self.cors())
            .with_state(self.state.clone());

        api.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
