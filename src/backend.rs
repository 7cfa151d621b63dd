//! The relay query primitive the orchestrator dispatches through.

use async_trait::async_trait;
use nostr_core::filter::QueryFilter;
use nostr_core::relay::FetchOutcome;
use nostr_core::RelayClient;
use nostr_sdk::{Event, EventId};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::QueryError;

/// One concrete query ready for the relays.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The flat query string the filter was derived from.
    pub query: String,
    pub filter: QueryFilter,
    /// Result-count ceiling.
    pub limit: usize,
    /// Ids already on screen from an earlier stage of the same search.
    pub hint: Vec<EventId>,
}

#[async_trait]
pub trait RelayQuery: Send + Sync {
    /// Fetch matching events. Must return [`QueryError::Aborted`] once
    /// `cancel` fires rather than a generic failure.
    async fn query(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event>, QueryError>;
}

/// [`RelayQuery`] over real relays via nostr-sdk.
pub struct NostrRelayBackend {
    relay: RelayClient,
    timeout: Duration,
}

impl NostrRelayBackend {
    pub fn new(relay: RelayClient, timeout: Duration) -> Self {
        Self { relay, timeout }
    }
}

#[async_trait]
impl RelayQuery for NostrRelayBackend {
    async fn query(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event>, QueryError> {
        let filter = request.filter.to_filter(request.limit);
        debug!(
            query = %request.query,
            known = request.hint.len(),
            relays = self.relay.relays().len(),
            "Dispatching relay query"
        );
        match self
            .relay
            .fetch_events_cancellable(filter, self.timeout, cancel)
            .await?
        {
            FetchOutcome::Events(events) => Ok(events),
            FetchOutcome::Cancelled => Err(QueryError::Aborted),
        }
    }
}
