use anyhow::Context;
use clap::Parser;
use tracing::info;

use gridflow::api;
use gridflow::config::{Cli, ServerConfig};
use gridflow::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from(Cli::parse());
    telemetry::init_tracing(config.debug);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        debug = config.debug,
        "starting gridflow"
    );
    api::serve(&config)
        .await
        .with_context(|| format!("server on {} failed", config.socket_addr()))?;
    Ok(())
}
