//! # Wallet Runtime
//!
//! Boots the wallet controllers and keeps them running until interrupted.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install logging
//! 3. Load the delegation manifest (file or built-in)
//! 4. Construct controllers, resolve grants, run init
//! 5. Log the wiring summary and signal ready
//!
//! Any wiring error exits non-zero before step 5.

use anyhow::{Context, Result};
use tracing::info;

use wallet_runtime::telemetry::init_logging;
use wallet_runtime::{RuntimeConfig, WalletRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();
    config.validate().context("invalid runtime configuration")?;
    init_logging(&config.logging)?;

    info!(
        manifest = ?config.wiring.manifest_path,
        strict = config.wiring.strict,
        "Starting wallet runtime"
    );

    let runtime = WalletRuntime::boot(&config)
        .await
        .context("failed to wire wallet controllers")?;

    let summary = serde_json::to_string(&runtime.summary()).context("failed to encode wiring summary")?;
    info!(summary = %summary, "Wallet runtime ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    runtime.shutdown();
    Ok(())
}
