//! Watch command - live terminal kitchen dashboard.
//!
//! Seeds the local list from the authoritative fetch, then keeps it current
//! from the event stream. The fetch and the stream are redundant by design:
//! streaming delivers low-latency updates, the fetch guarantees a correct
//! baseline on mount and after every reconnect.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use futures::StreamExt;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tokio::time::sleep;

use kds_core::order::KitchenStatus;

use crate::client::ApiClient;
use crate::dashboard::{Connection, DashboardState, FADE_WINDOW_MS};
use crate::reconnect::ReconnectPolicy;
use crate::sse::FrameDecoder;
use crate::Config;

/// Arguments for the watch command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Do not clear the screen between redraws.
    #[arg(long)]
    pub no_clear: bool,
}

/// How the inner stream loop ended.
enum StreamEnd {
    /// Transport error or server-side close; eligible for reconnect.
    Lost,
    /// Operator quit (Ctrl-C); tear everything down.
    Quit,
}

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed. Transport
/// failures are handled by the reconnect policy, not surfaced as errors.
pub async fn execute(args: WatchArgs, config: &Config) -> Result<()> {
    let client = ApiClient::new(config)?;
    let mut state = DashboardState::new();

    // Fade timers funnel through a channel so the event loop stays flat and
    // every pending timer dies with it on teardown.
    let (fade_tx, mut fade_rx) = mpsc::unbounded_channel::<String>();

    // Initial authoritative fetch, independent of the stream's fate.
    match client.kitchen_orders().await {
        Ok(response) => state.load(response.orders),
        Err(err) => {
            state.connection_error = Some(format!("Failed to load orders: {err}"));
        }
    }
    render(&state, args.no_clear);

    let mut policy = ReconnectPolicy::new();

    'session: loop {
        let response = match client.subscribe().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(error = %err, "stream connection failed");
                if wait_before_retry(&mut state, &mut policy, args.no_clear).await {
                    continue 'session;
                }
                break 'session;
            }
        };

        policy.reset();
        state.set_connected();
        // Events published while disconnected are gone for good; only the
        // authoritative list closes the gap.
        if let Ok(listing) = client.kitchen_orders().await {
            state.load(listing.orders);
        }
        render(&state, args.no_clear);

        let mut decoder = FrameDecoder::new();
        let mut stream = response.bytes_stream();

        let end = loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for event in decoder.push(&bytes) {
                            if let Some(order_id) = state.apply(event) {
                                schedule_fade(&fade_tx, order_id);
                            }
                        }
                        render(&state, args.no_clear);
                    }
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "stream transport error");
                        break StreamEnd::Lost;
                    }
                    None => break StreamEnd::Lost,
                },
                Some(order_id) = fade_rx.recv() => {
                    state.mark_faded(&order_id);
                    render(&state, args.no_clear);
                }
                _ = tokio::signal::ctrl_c() => break StreamEnd::Quit,
            }
        };

        // Close the failed transport before scheduling the retry.
        drop(stream);

        match end {
            StreamEnd::Quit => break 'session,
            StreamEnd::Lost => {
                if !wait_before_retry(&mut state, &mut policy, args.no_clear).await {
                    break 'session;
                }
            }
        }
    }

    Ok(())
}

/// Waits out the backoff delay before the next reconnect attempt.
///
/// Returns `false` when no further attempt may run: the policy is exhausted
/// (terminal failure is rendered) or the operator quit during the wait.
async fn wait_before_retry(
    state: &mut DashboardState,
    policy: &mut ReconnectPolicy,
    no_clear: bool,
) -> bool {
    let Some(delay) = policy.next_delay() else {
        state.set_failed();
        render(state, no_clear);
        return false;
    };

    state.set_reconnecting(policy.attempt());
    render(state, no_clear);
    tracing::debug!(
        attempt = policy.attempt(),
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        "scheduling reconnect"
    );

    tokio::select! {
        () = sleep(delay) => true,
        _ = tokio::signal::ctrl_c() => false,
    }
}

/// Schedules the fade-out of a completed order.
fn schedule_fade(fade_tx: &mpsc::UnboundedSender<String>, order_id: String) {
    let fade_tx = fade_tx.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(FADE_WINDOW_MS)).await;
        // The receiver is gone once the dashboard shut down; nothing to do.
        let _ = fade_tx.send(order_id);
    });
}

/// Redraws the full dashboard.
fn render(state: &DashboardState, no_clear: bool) {
    if !no_clear {
        // Move cursor to top-left and clear screen
        print!("\x1B[H\x1B[2J");
    }

    let connection = match state.connection {
        Connection::Connected => "Connected".green().to_string(),
        Connection::Disconnected => "Disconnected".yellow().to_string(),
        Connection::Reconnecting { attempt } => {
            format!("Reconnecting ({attempt}/5)").yellow().to_string()
        }
        Connection::Failed => "Disconnected".red().to_string(),
    };
    println!("Kitchen Dashboard  [{connection}]");

    if let Some(error) = &state.connection_error {
        println!("{}", error.red());
    }
    println!();

    let active = state.active_orders();
    if active.is_empty() {
        println!("No active orders.");
    } else {
        println!(
            "{:<8} {:>5} {:>9} {:>8}  {:<12} Items",
            "Order", "Table", "Placed", "Total", "Status"
        );
        for ticket in &active {
            let items = ticket
                .items
                .iter()
                .map(|item| format!("{}x {}", item.quantity, item.name))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "#{:<7} {:>5} {:>9} {:>8.2}  {:<12} {}",
                ticket.order_number,
                ticket.table_number,
                ticket.time_placed,
                ticket.total,
                status_colored(ticket.status),
                items
            );
        }
    }

    println!();
    println!(
        "Active: {} | Pending: {} | In Progress: {}",
        active.len(),
        state.count_with_status(KitchenStatus::Pending),
        state.count_with_status(KitchenStatus::InProgress),
    );

    let _ = io::stdout().flush();
}

fn status_colored(status: KitchenStatus) -> String {
    match status {
        KitchenStatus::Pending => status.to_string().yellow().to_string(),
        KitchenStatus::InProgress => status.to_string().blue().to_string(),
        KitchenStatus::Done => status.to_string().green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_smoke_test() {
        let mut state = DashboardState::new();
        render(&state, true);

        state.set_failed();
        render(&state, true);
    }
}
