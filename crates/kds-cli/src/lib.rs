//! # kds-cli
//!
//! Command-line interface for the KDS kitchen order service.
//!
//! ## Commands
//!
//! - `kds watch` - Live terminal kitchen dashboard (streaming updates)
//! - `kds orders` - List recent kitchen orders
//! - `kds advance` - Cycle an order's kitchen status
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `KDS_API_URL` - API endpoint (default: `http://localhost:8080`)
//! - `KDS_API_TOKEN` - API authentication token

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod client;
pub mod commands;
pub mod dashboard;
pub mod reconnect;
pub mod sse;

use clap::{Parser, Subcommand};

/// KDS CLI - kitchen dashboard command-line interface.
#[derive(Debug, Parser)]
#[command(name = "kds")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API server URL.
    #[arg(long, env = "KDS_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// API authentication token.
    #[arg(long, env = "KDS_API_TOKEN")]
    pub api_token: Option<String>,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            format: self.format.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Live terminal kitchen dashboard.
    Watch(commands::watch::WatchArgs),
    /// List recent kitchen orders.
    Orders(commands::orders::OrdersArgs),
    /// Cycle an order's kitchen status.
    Advance(commands::advance::AdvanceArgs),
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// API server URL.
    pub api_url: String,
    /// API authentication token.
    pub api_token: Option<String>,
    /// Output format.
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "kds",
            "--api-url",
            "https://kds.example.com",
            "--api-token",
            "token-abc",
            "--format",
            "json",
            "orders",
        ]);

        let config = cli.config();
        assert_eq!(config.api_url, "https://kds.example.com");
        assert_eq!(config.api_token.as_deref(), Some("token-abc"));
        assert!(matches!(config.format, OutputFormat::Json));
    }

    #[test]
    fn test_advance_requires_order_id() {
        let result = Cli::try_parse_from(["kds", "advance"]);
        assert!(result.is_err());

        let cli = Cli::parse_from(["kds", "advance", "order-1"]);
        let Commands::Advance(args) = cli.command else {
            panic!("expected advance command");
        };
        assert_eq!(args.order_id, "order-1");
    }
}
