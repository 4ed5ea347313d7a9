//! # Booking Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter and the payment gateway
//! - Create the checkout service
//! - Start the reconciliation sweeper and the HTTP server

mod config;

use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_hex::{CheckoutService, CheckoutSettings, inbound::HttpServer};
use booking_repo::{ReconciliationSweeper, build_repo};
use booking_types::PaymentGateway;
use checkout_gateway::{SandboxGateway, StripeGateway};

use config::{Config, GatewayConfig};

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("booking-service"), provider))
}

/// Global meter provider read by the HTTP metrics layer.
fn init_meter() -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

fn build_gateway(config: &GatewayConfig) -> Box<dyn PaymentGateway> {
    match config {
        GatewayConfig::Stripe {
            secret_key,
            api_base,
        } => {
            let gateway = StripeGateway::new(secret_key.clone());
            match api_base {
                Some(base) => Box::new(gateway.with_api_base(base.clone())),
                None => Box::new(gateway),
            }
        }
        GatewayConfig::Sandbox => {
            tracing::warn!("Using the sandbox payment gateway; no real payments are taken");
            Box::new(SandboxGateway::auto_completing())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing and metrics
    let (otel_tracer, otel_provider) = init_tracer()?;
    let meter_provider = init_meter()?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking_app=debug,booking_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting booking server on port {}", config.port);
    tracing::info!("Storefront: {}", config.site_domain);

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    let gateway = build_gateway(&config.gateway);

    let settings = CheckoutSettings::new(config.site_domain.clone())
        .with_currency(config.currency)
        .with_default_location(config.default_location.clone());
    let service = CheckoutService::new(repo, gateway, settings);

    // Finishes booking updates that failed after a ledger write
    let sweeper = ReconciliationSweeper::new(
        service.shared_repo(),
        config.sweep_interval,
        config.sweep_max_attempts,
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    let server = HttpServer::with_rate_limit(service, config.rate_limit_per_minute)
        .with_cors_origins(&config.cors_origins);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    sweeper_handle.abort();

    // Ensure telemetry is flushed before exit
    let _ = otel_provider.shutdown();
    let _ = meter_provider.shutdown();
    Ok(())
}
