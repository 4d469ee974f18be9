//! CLI module for the Titan retrieval service
//!
//! Provides subcommands:
//! - `serve`: HTTP API with background cache warm-up
//! - `search`: one-off search from the terminal

pub mod search;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Titan retrieval - semantic search over the company document library
#[derive(Parser)]
#[command(name = "titan-retrieval")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Load the cache and print the context block for one question
    Search(search::SearchArgs),
}

/// Load `.env` and layered configuration, then install logging
pub(crate) fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    logging::init_logging(&config.logging);

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_arguments() {
        let cli = Cli::try_parse_from([
            "titan-retrieval",
            "search",
            "how many leave days?",
            "--top-k",
            "5",
            "--threshold",
            "0.4",
        ])
        .unwrap();

        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "how many leave days?");
                assert_eq!(args.top_k, Some(5));
                assert_eq!(args.threshold, Some(0.4));
            }
            Command::Serve => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["titan-retrieval", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));
    }
}
