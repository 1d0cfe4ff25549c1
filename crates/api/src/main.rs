//! Hearthglow API server.
//!
//! REST backend for the storefront and admin panel: catalog, cart
//! checkout, blog, accounts with marketing profiles, fulfillment and
//! payment integrations.

// main() is the one place where failing loudly at startup is correct.
#![allow(clippy::expect_used)]

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

use axum::Router;
use axum::http::HeaderValue;
use secrecy::ExposeSecret;
use sentry::integrations::tracing::EventFilter;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::ApiConfig;
use crate::state::AppState;

/// Initialize Sentry error tracking if a DSN is configured.
///
/// Must be called before the tokio runtime starts so the panic handler
/// is installed on the main thread. The returned guard flushes pending
/// events on drop.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                traces_sample_rate: 0.1,
                ..Default::default()
            },
        ))
    })
}

/// Route tracing events into Sentry: errors and warnings become events,
/// everything else becomes a breadcrumb.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
        _ => EventFilter::Breadcrumb,
    }
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        warn!("HEARTHGLOW_ALLOWED_ORIGINS not set; allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn main() {
    let config = ApiConfig::from_env().expect("Failed to load configuration");
    let _sentry_guard = init_sentry(&config);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
        .block_on(run(config));
}

async fn run(config: ApiConfig) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearthglow_api=info,tower_http=debug".into()),
        )
        .with(fmt::layer())
        .with(sentry::integrations::tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(config.database_url.expose_secret())
        .await
        .expect("Failed to connect to database");

    // Migrations are applied via the hearthglow CLI, not on startup.
    let addr = config.socket_addr();
    let cors = cors_layer(&config);
    let uploads_dir = config.uploads_dir.clone();
    let state = AppState::new(config, pool).expect("Failed to initialize integration clients");

    let app = Router::new()
        .merge(routes::router())
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
        .layer(sentry_tower::NewSentryLayer::new_from_top());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    info!("Hearthglow API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for SIGINT or SIGTERM so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
