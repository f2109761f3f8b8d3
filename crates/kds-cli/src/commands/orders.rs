//! Orders command - list recent kitchen orders.

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use kds_core::order::KitchenStatus;

use crate::client::ApiClient;
use crate::{Config, OutputFormat};

/// Arguments for the orders command.
#[derive(Debug, Args)]
pub struct OrdersArgs {
    /// Include completed orders.
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Execute the orders command.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn execute(args: OrdersArgs, config: &Config) -> Result<()> {
    let client = ApiClient::new(config)?;
    let response = client.kitchen_orders().await?;

    let orders: Vec<_> = response
        .orders
        .into_iter()
        .filter(|ticket| args.all || ticket.status != KitchenStatus::Done)
        .collect();

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&orders)?);
        }
        OutputFormat::Text => {
            if orders.is_empty() {
                println!("No orders found");
                return Ok(());
            }

            println!("Kitchen orders:");
            println!();
            for ticket in &orders {
                let items = ticket
                    .items
                    .iter()
                    .map(|item| format!("{}x {}", item.quantity, item.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "  {} table {} at {} [{}] {} ({:.2})",
                    ticket.order_id,
                    ticket.table_number,
                    ticket.time_placed,
                    format_status_colored(ticket.status),
                    items,
                    ticket.total
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct OrderRow {
                #[tabled(rename = "Order ID")]
                order_id: String,
                #[tabled(rename = "Table")]
                table: u32,
                #[tabled(rename = "Placed")]
                placed: String,
                #[tabled(rename = "Status")]
                status: String,
                #[tabled(rename = "Items")]
                items: usize,
                #[tabled(rename = "Total")]
                total: String,
            }

            let rows: Vec<_> = orders
                .iter()
                .map(|t| OrderRow {
                    order_id: t.order_id.clone(),
                    table: t.table_number,
                    placed: t.time_placed.clone(),
                    status: t.status.to_string(),
                    items: t.items.len(),
                    total: format!("{:.2}", t.total),
                })
                .collect();

            if rows.is_empty() {
                println!("No orders found");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}

fn format_status_colored(status: KitchenStatus) -> String {
    match status {
        KitchenStatus::Pending => status.to_string().yellow().to_string(),
        KitchenStatus::InProgress => status.to_string().blue().to_string(),
        KitchenStatus::Done => status.to_string().green().to_string(),
    }
}
