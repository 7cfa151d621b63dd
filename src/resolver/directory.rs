//! Display-name lookups through a relay profile search.

use anyhow::Result;
use async_trait::async_trait;
use nostr_core::RelayClient;
use nostr_sdk::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ProfileDirectory;

const PROFILE_SEARCH_LIMIT: usize = 20;

/// The subset of kind 0 metadata used for name matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
}

impl Profile {
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind != Kind::Metadata {
            return None;
        }
        serde_json::from_str(&event.content).ok()
    }

    fn matches(&self, name: &str) -> bool {
        [&self.name, &self.display_name]
            .into_iter()
            .flatten()
            .any(|n| n.trim().eq_ignore_ascii_case(name))
    }
}

/// Pick the author whose profile name matches exactly, else the first
/// parseable profile in relay order.
pub fn best_profile_match(name: &str, events: &[Event]) -> Option<PublicKey> {
    let profiles: Vec<(PublicKey, Profile)> = events
        .iter()
        .filter_map(|e| Profile::from_event(e).map(|p| (e.pubkey, p)))
        .collect();

    profiles
        .iter()
        .find(|(_, p)| p.matches(name))
        .or_else(|| profiles.first())
        .map(|(pk, _)| *pk)
}

/// NIP-50 kind 0 search over the configured relays.
pub struct RelayProfileDirectory {
    relay: RelayClient,
    timeout: Duration,
}

impl RelayProfileDirectory {
    pub fn new(relay: RelayClient, timeout: Duration) -> Self {
        Self { relay, timeout }
    }
}

#[async_trait]
impl ProfileDirectory for RelayProfileDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<PublicKey>> {
        let filter = Filter::new()
            .kind(Kind::Metadata)
            .search(name)
            .limit(PROFILE_SEARCH_LIMIT);
        let events = self.relay.fetch_events(filter, self.timeout).await?;
        Ok(best_profile_match(name, &events))
    }
}
