//! HTTP client for the KDS API.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use kds_core::order::KitchenStatus;
use kds_core::ticket::Ticket;

use crate::Config;

/// API client for KDS kitchen endpoints.
pub struct ApiClient {
    client: Client,
    stream_client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a new API client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // The streaming client must not carry a total request timeout: the
        // subscription response body stays open indefinitely.
        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
            base_url: config.api_url.clone(),
            token: config.api_token.clone(),
        })
    }

    /// Fetches the authoritative kitchen order list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn kitchen_orders(&self) -> Result<KitchenOrdersResponse> {
        let url = format!("{}/api/v1/kitchen/orders", self.base_url);

        let mut req = self.client.get(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.context("Failed to send request")?;

        if response.status().is_success() {
            response.json().await.context("Failed to parse response")
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({status}): {body}")
        }
    }

    /// Persists a kitchen status change for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects the
    /// update.
    pub async fn update_status(
        &self,
        order_id: &str,
        status: KitchenStatus,
    ) -> Result<StatusUpdateResponse> {
        let url = format!("{}/api/v1/kitchen/orders/{order_id}/status", self.base_url);

        let mut req = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "status": status }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.context("Failed to send request")?;

        if response.status().is_success() {
            response.json().await.context("Failed to parse response")
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({status}): {body}")
        }
    }

    /// Opens the kitchen event stream.
    ///
    /// The credential travels as a `token` query parameter: the streaming
    /// transport used by browser dashboards cannot set headers, and the
    /// server honors the same fallback for every client.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the server rejects the
    /// subscription.
    pub async fn subscribe(&self) -> Result<reqwest::Response> {
        let url = format!("{}/api/v1/kitchen/updates", self.base_url);

        let mut req = self.stream_client.get(&url);
        if let Some(token) = &self.token {
            req = req.query(&[("token", token.as_str())]);
        }

        let response = req.send().await.context("Failed to open event stream")?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({status}): {body}")
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

/// Kitchen order listing response.
#[derive(Debug, Deserialize)]
pub struct KitchenOrdersResponse {
    /// Projected tickets, newest first.
    pub orders: Vec<Ticket>,
    /// Number of tickets returned.
    pub total: usize,
}

/// Response after a successful status update.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateResponse {
    /// Human-readable confirmation.
    pub message: String,
}
