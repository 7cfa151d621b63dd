//! Author token resolution.
//!
//! Turns what a user types after `by:` into a public key:
//!
//! - keys in any encoding (`npub`, hex, `nprofile`, `nostr:` URIs) decode
//!   locally with no network call;
//! - `name@domain` / `domain.tld` go to an [`IdentityService`] (NIP-05);
//! - anything else is a display name for the [`ProfileDirectory`].
//!
//! Network lookups are bounded by a timeout and memoized per session.

pub mod cache;
pub mod directory;
pub mod nip05;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;
use nostr_core::pointer::{normalize_pubkey, to_npub};
use nostr_sdk::PublicKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use cache::{AuthorCache, CacheStats};
pub use directory::{best_profile_match, Profile, RelayProfileDirectory};
pub use nip05::Nip05Client;

use crate::error::ResolveError;

/// Default budget for one resolution.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Domain-style identity verification (NIP-05).
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve `name@domain` to a public key, `None` when unknown.
    async fn lookup(&self, identifier: &str) -> Result<Option<PublicKey>>;

    /// Check that `identifier` maps to `pubkey`.
    async fn verify(&self, pubkey: &PublicKey, identifier: &str) -> Result<bool>;
}

/// Broader lookup for partial / display names.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<PublicKey>>;
}

/// How a token will be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorToken {
    Key(PublicKey),
    Identity(String),
    Name(String),
}

impl AuthorToken {
    pub fn classify(token: &str) -> Self {
        if let Some(pk) = normalize_pubkey(token) {
            return Self::Key(pk);
        }
        let token = token.trim();
        let looks_like_domain = token.contains('@')
            || (token.contains('.') && !token.starts_with('.') && !token.ends_with('.'));
        if looks_like_domain {
            Self::Identity(token.to_string())
        } else {
            Self::Name(token.to_string())
        }
    }

    pub fn needs_network(&self) -> bool {
        !matches!(self, Self::Key(_))
    }
}

pub struct AuthorResolver {
    identity: Arc<dyn IdentityService>,
    directory: Option<Arc<dyn ProfileDirectory>>,
    cache: Arc<AuthorCache>,
    timeout: Duration,
}

impl AuthorResolver {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self {
            identity,
            directory: None,
            cache: Arc::new(AuthorCache::new()),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn ProfileDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_cache(mut self, cache: Arc<AuthorCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &AuthorCache {
        &self.cache
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a token to its `npub`, or `None` when it cannot be resolved
    /// within the time budget.
    pub async fn resolve_author_to_npub(&self, token: &str) -> Option<String> {
        match self.resolve(token).await {
            Ok(pk) => Some(to_npub(&pk)),
            Err(e) => {
                debug!(token, "Author not resolved: {e}");
                None
            }
        }
    }

    /// Typed resolution. Successful network lookups are cached under the
    /// token exactly as given.
    pub async fn resolve(&self, token: &str) -> Result<PublicKey, ResolveError> {
        let kind = AuthorToken::classify(token);
        if let AuthorToken::Key(pk) = kind {
            return Ok(pk);
        }
        if let Some(pk) = self.cache.get(token) {
            return Ok(pk);
        }

        let lookup = async {
            match &kind {
                AuthorToken::Identity(id) => self.identity.lookup(id).await,
                AuthorToken::Name(name) => match &self.directory {
                    Some(directory) => directory.find_by_name(name).await,
                    None => Ok(None),
                },
                AuthorToken::Key(pk) => Ok(Some(*pk)),
            }
        };

        let found = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!(token, "Author lookup failed: {e:#}");
                return Err(ResolveError::Service(e));
            }
            Err(_) => {
                warn!(token, timeout_ms = self.timeout.as_millis() as u64, "Author lookup timed out");
                return Err(ResolveError::Timeout {
                    token: token.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        match found {
            Some(pk) => {
                self.cache.set(token, pk);
                debug!(token, npub = %to_npub(&pk), "Author resolved");
                Ok(pk)
            }
            None => Err(ResolveError::NotFound(token.to_string())),
        }
    }

    /// Resolve several distinct tokens concurrently. The whole batch is
    /// bounded by one timeout since every lookup runs in parallel.
    pub async fn resolve_many(&self, tokens: &[String]) -> HashMap<String, Option<PublicKey>> {
        let lookups = tokens.iter().map(|token| async move {
            let pk = self.resolve(token).await.ok();
            (token.clone(), pk)
        });
        join_all(lookups).await.into_iter().collect()
    }

    /// Check a NIP-05 identity against a key, false on any failure.
    pub async fn verify_identity(&self, pubkey: &PublicKey, identifier: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.identity.verify(pubkey, identifier)).await {
            Ok(Ok(verified)) => verified,
            Ok(Err(e)) => {
                warn!(identifier, "NIP-05 verification failed: {e:#}");
                false
            }
            Err(_) => false,
        }
    }
}
