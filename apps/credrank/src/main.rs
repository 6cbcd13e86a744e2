//! # Credrank - Contribution-Credit Scoring
//!
//! The main binary for the credrank engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/credrank (THE BINARY)        │
//! │                                              │
//! │   ┌─────────────┐        ┌──────────────┐    │
//! │   │    CLI      │        │   Config     │    │
//! │   │   (clap)    │        │   (toml)     │    │
//! │   └──────┬──────┘        └──────┬───────┘    │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │ credrank-core │               │
//! │              │  (THE ENGINE) │               │
//! │              └───────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! credrank check -i graph.json -p plugins.json
//! credrank score -i graph.json -p plugins.json -o cred.json
//! credrank pack -i graph.json -o graph.cred
//! ```

use clap::Parser;
use credrank::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // CREDRANK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CREDRANK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "credrank=debug,credrank_core=debug"
    } else {
        "credrank=info,credrank_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr; stdout carries command output only.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    match cli::execute(cli).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(cli::exit_code(e.kind()));
        }
    }
}
