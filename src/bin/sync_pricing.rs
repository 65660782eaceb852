//! One-shot pricing sync.
//!
//! Reads the spreadsheet, writes a snapshot if anything changed and prints
//! the report as JSON. Exits non-zero if the sync fails.
//!
//! ```text
//! sync-pricing [--force]
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use nest_pricing_gateway::app_state::{AppState, Backends};
use nest_pricing_gateway::config::GatewayConfig;
use nest_pricing_gateway::domain::SystemClock;

/// `triggered_by` label of command-line runs.
const CLI_TRIGGER: &str = "cli";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let force_refresh = std::env::args().skip(1).any(|arg| arg == "--force");

    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;
    if config.sheets.is_none() {
        anyhow::bail!("PRICING_SPREADSHEET_ID is not set");
    }

    let backends = Backends::connect(&config)
        .await
        .context("failed to connect backends")?;
    let state = AppState::new(
        backends,
        config.pricing_cache_ttl(),
        config.auth.clone(),
        Arc::new(SystemClock),
    );

    let report = state
        .sync
        .sync_pricing(force_refresh, CLI_TRIGGER)
        .await
        .context("pricing sync failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
