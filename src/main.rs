//! nest-pricing-gateway server entry point.
//!
//! Starts the Axum HTTP server and the background flush and sync tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use nest_pricing_gateway::api;
use nest_pricing_gateway::app_state::{AppState, Backends};
use nest_pricing_gateway::config::GatewayConfig;
use nest_pricing_gateway::domain::SystemClock;
use nest_pricing_gateway::service::background::{spawn_flush_task, spawn_sync_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting nest-pricing-gateway");

    // Connect backends and build the service layer
    let backends = Backends::connect(&config)
        .await
        .context("failed to connect backends")?;
    let app_state = AppState::new(
        backends,
        config.pricing_cache_ttl(),
        config.auth.clone(),
        Arc::new(SystemClock),
    );

    if config.auth.cron_secret.is_none() && config.auth.admin_password.is_none() {
        tracing::warn!("neither CRON_SECRET nor ADMIN_PASSWORD set, admin endpoints reject every request");
    }

    // Background jobs
    if config.analytics_flush_interval_secs > 0 {
        let _flush = spawn_flush_task(
            Arc::clone(&app_state.analytics),
            Duration::from_secs(config.analytics_flush_interval_secs),
        );
    }
    if config.pricing_sync_interval_secs > 0 {
        let _sync = spawn_sync_task(
            Arc::clone(&app_state.sync),
            Duration::from_secs(config.pricing_sync_interval_secs),
        );
    }

    // Build router
    let app = Router::new().merge(api::build_router());
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
