//! RPS Online Player Runner - composition root binary

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rpsonline_player::ClientConfig;
use rpsonline_player_runner::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Loads .env files, so it runs before the filter reads RUST_LOG
    let config = ClientConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rpsonline_player=debug,rpsonline_player_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(environment = ?config.environment, "Starting RPS Online Player");

    rpsonline_player_runner::run(cli, config).await
}
