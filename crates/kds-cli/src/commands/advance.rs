//! Advance command - cycle an order through the kitchen status sequence.

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;

use crate::client::ApiClient;
use crate::Config;

/// Arguments for the advance command.
#[derive(Debug, Args)]
pub struct AdvanceArgs {
    /// Order ID to advance.
    #[arg()]
    pub order_id: String,
}

/// Execute the advance command.
///
/// Cycles `Pending → In Progress → Done → Pending`. The new status is
/// computed from the order's current state, applied optimistically on the
/// console, and rolled back to the authoritative state if the server
/// rejects the update.
///
/// # Errors
///
/// Returns an error if the order does not exist or the update fails.
pub async fn execute(args: AdvanceArgs, config: &Config) -> Result<()> {
    let client = ApiClient::new(config)?;

    let listing = client.kitchen_orders().await?;
    let ticket = listing
        .orders
        .iter()
        .find(|t| t.order_id == args.order_id)
        .with_context(|| format!("Order not found: {}", args.order_id))?;

    let current = ticket.status;
    let next = current.advanced();
    println!("{}: {current} -> {}", args.order_id, next.green());

    match client.update_status(&args.order_id, next).await {
        Ok(response) => {
            tracing::debug!(message = %response.message, "status update accepted");
            Ok(())
        }
        Err(err) => {
            // The optimistic line above is stale; show what the server
            // actually holds before failing.
            let actual = client
                .kitchen_orders()
                .await
                .ok()
                .and_then(|listing| {
                    listing
                        .orders
                        .into_iter()
                        .find(|t| t.order_id == args.order_id)
                })
                .map(|t| t.status);
            if let Some(actual) = actual {
                eprintln!(
                    "{} update failed; server still has {actual}",
                    args.order_id.red()
                );
            }
            Err(err).context("Failed to update order status")
        }
    }
}
