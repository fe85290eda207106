//! # TRR Workflow Server
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! trr server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! trr create -a alice --title "Validate SIEM ingestion"
//! trr transition 1 pending -a alice
//! trr approve 1 product-owner -a bob
//! trr dor 1
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trr::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // TRR_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TRR_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trr=info,trr_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
