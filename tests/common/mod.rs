//! In-process collaborators for orchestrator and resolver tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use nostr_sdk::prelude::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use nostr_search::backend::{QueryRequest, RelayQuery};
use nostr_search::error::QueryError;
use nostr_search::replacements::ReplacementStore;
use nostr_search::resolver::{AuthorResolver, IdentityService, ProfileDirectory};
use nostr_search::search::{SearchOrchestrator, SearchSettings};

/// Scripted relay: per-query events, delays and failures.
#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<HashMap<String, Vec<Event>>>,
    delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<Vec<String>>,
    /// When false the backend keeps running after cancellation, like a
    /// relay that answers anyway.
    pub honor_cancel: bool,
    calls: Mutex<Vec<QueryRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            honor_cancel: true,
            ..Self::default()
        }
    }

    pub fn ignoring_cancel() -> Self {
        Self {
            honor_cancel: false,
            ..Self::default()
        }
    }

    pub fn respond(self, query: &str, events: Vec<Event>) -> Self {
        self.responses.lock().insert(query.to_string(), events);
        self
    }

    pub fn delay(self, query: &str, delay: Duration) -> Self {
        self.delays.lock().insert(query.to_string(), delay);
        self
    }

    pub fn fail(self, query: &str) -> Self {
        self.failing.lock().push(query.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().iter().map(|r| r.query.clone()).collect()
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RelayQuery for MockBackend {
    async fn query(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event>, QueryError> {
        self.calls.lock().push(request.clone());
        let delay = self.delays.lock().get(&request.query).copied();
        if let Some(delay) = delay {
            if self.honor_cancel {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(QueryError::Aborted),
                    _ = tokio::time::sleep(delay) => {}
                }
            } else {
                tokio::time::sleep(delay).await;
            }
        }
        if self.failing.lock().contains(&request.query) {
            return Err(QueryError::Backend(anyhow::anyhow!("relay unreachable")));
        }
        Ok(self
            .responses
            .lock()
            .get(&request.query)
            .cloned()
            .unwrap_or_default())
    }
}

/// Identity service with a fixed table and a call counter.
#[derive(Default)]
pub struct MockIdentity {
    names: HashMap<String, PublicKey>,
    delay: Option<Duration>,
    lookups: AtomicUsize,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identifier: &str, pubkey: PublicKey) -> Self {
        self.names.insert(identifier.to_string(), pubkey);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn lookup(&self, identifier: &str) -> Result<Option<PublicKey>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.names.get(identifier).copied())
    }

    async fn verify(&self, pubkey: &PublicKey, identifier: &str) -> Result<bool> {
        Ok(self.lookup(identifier).await? == Some(*pubkey))
    }
}

/// Display-name directory with a fixed table.
#[derive(Default)]
pub struct MockDirectory {
    names: HashMap<String, PublicKey>,
    delay: Option<Duration>,
    lookups: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, pubkey: PublicKey) -> Self {
        self.names.insert(name.to_string(), pubkey);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileDirectory for MockDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<PublicKey>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.names.get(name).copied())
    }
}

pub fn note(keys: &Keys, content: &str, created_at: u64) -> Event {
    EventBuilder::text_note(content)
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .unwrap()
}

pub fn profile(keys: &Keys, name: &str, created_at: u64) -> Event {
    EventBuilder::new(Kind::Metadata, format!(r#"{{"name":"{name}"}}"#))
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .unwrap()
}

pub fn npub(pubkey: &PublicKey) -> String {
    pubkey.to_bech32().unwrap()
}

pub fn settings(immediate_results: bool) -> SearchSettings {
    SearchSettings {
        immediate_results,
        ..SearchSettings::default()
    }
}

pub fn orchestrator(
    backend: Arc<MockBackend>,
    resolver: AuthorResolver,
    settings: SearchSettings,
) -> SearchOrchestrator {
    SearchOrchestrator::new(
        backend,
        Arc::new(resolver),
        Arc::new(ReplacementStore::disabled()),
        settings,
    )
}
