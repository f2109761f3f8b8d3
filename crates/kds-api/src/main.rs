//! `kds-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use kds_api::config::Config;
use kds_api::server::Server;
use kds_core::observability::{init_logging, LogFormat};
use kds_core::store::{MemoryAccountDirectory, MemoryOrderStore};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    if !config.debug {
        tracing::warn!(
            "no relational order store is wired in this build; orders live in process memory"
        );
    }

    let server = Server::builder()
        .config(config)
        .order_store(Arc::new(MemoryOrderStore::new()))
        .account_directory(Arc::new(MemoryAccountDirectory::new()))
        .build();

    server.serve().await?;
    Ok(())
}
