//! flatload CLI
//!
//! Command-line interface for loading flat files into a warehouse

use clap::Parser;
use flatload::cli::{Cli, Runner};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Ctrl-C stops dispatch; files already running finish
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, no further files will be dispatched");
                shutdown.cancel();
            }
        }
    });

    let status = Runner::new(cli).with_shutdown(shutdown).run().await;
    std::process::exit(status.code());
}
