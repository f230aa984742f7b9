//! Leafline marketplace API server.
//!
//! Serves the B2B marketplace JSON API on port 8080.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` document store (in-memory when no database is configured)
//! - State licensing authority over HTTP, with retries, a circuit breaker,
//!   and a short-lived verification cache
//! - Bearer JWTs for authenticated endpoints

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use leafline_api::config::MarketplaceConfig;
use leafline_api::db::{self, DocumentStore, MemoryStore, PgDocumentStore};
use leafline_api::routes;
use leafline_api::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &MarketplaceConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Open the configured document store, applying migrations for `PostgreSQL`.
async fn open_store(config: &MarketplaceConfig) -> Arc<dyn DocumentStore> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("No database configured; using in-memory document store");
        return Arc::new(MemoryStore::new());
    };

    let pool = db::create_pool(database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let store = PgDocumentStore::new(pool);
    store.migrate().await.expect("Failed to run migrations");
    Arc::new(store)
}

#[tokio::main]
async fn main() {
    let config = MarketplaceConfig::from_env().expect("Failed to load configuration");

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "leafline_api=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let store = open_store(&config).await;
    let addr = config.socket_addr();
    let state = AppState::new(config, store).expect("Failed to initialize application state");

    let app = routes::router(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("leafline-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
