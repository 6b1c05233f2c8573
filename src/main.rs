//! Add-on entry point: load options, run the bridge until it stops.

use commax_bridge::config::DEFAULT_OPTIONS_PATH;
use commax_bridge::{Bridge, BridgeConfig};

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!("commax-bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = BridgeConfig::load_or_default(DEFAULT_OPTIONS_PATH);
    let bridge = Bridge::builder().config(config).start().await;

    if let Err(e) = bridge.run().await {
        tracing::error!("Bridge stopped: {}", e);
        std::process::exit(1);
    }
}
