//! Read-only Nostr relay client wrapper.

use anyhow::{Context, Result};
use nostr_sdk::prelude::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a cancellable fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    Events(Vec<Event>),
    Cancelled,
}

/// A simplified, signer-less relay client used for searching.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    relays: Vec<String>,
}

impl RelayClient {
    /// Create a client for the given relay URLs and connect to them.
    pub async fn new(relay_urls: Vec<String>) -> Result<Self> {
        let client = Client::default();

        for relay_url in &relay_urls {
            client
                .add_relay(relay_url.as_str())
                .await
                .with_context(|| format!("Failed to add relay: {relay_url}"))?;
        }

        client.connect().await;
        info!(relays = relay_urls.len(), "Relay client connected");

        Ok(Self {
            client,
            relays: relay_urls,
        })
    }

    /// Fetch events matching the given filter with a timeout.
    pub async fn fetch_events(&self, filter: Filter, timeout: Duration) -> Result<Vec<Event>> {
        let events = tokio::time::timeout(timeout, self.client.fetch_events(filter, timeout))
            .await
            .context("Timeout fetching events")?
            .context("Failed to fetch events")?;
        Ok(events.into_iter().collect())
    }

    /// Like [`fetch_events`](Self::fetch_events) but gives up as soon as
    /// `cancel` fires. Cancellation wins over a result that is ready at
    /// the same time.
    pub async fn fetch_events_cancellable(
        &self,
        filter: Filter,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Relay fetch cancelled");
                Ok(FetchOutcome::Cancelled)
            }
            events = self.fetch_events(filter, timeout) => events.map(FetchOutcome::Events),
        }
    }

    /// Get relay URLs.
    pub fn relays(&self) -> &[String] {
        &self.relays
    }

    /// True when at least one relay answers a trivial query in time.
    pub async fn is_reachable(&self, timeout: Duration) -> bool {
        match self.fetch_events(Filter::new().limit(1), timeout).await {
            Ok(_) => true,
            Err(e) => {
                warn!(relays = self.relays.len(), "Relay reachability check failed: {e:#}");
                false
            }
        }
    }
}
