//! Search orchestration.
//!
//! One [`SearchOrchestrator`] serves one search box. Each call to
//! [`SearchOrchestrator::handle_search`] is an invocation with its own
//! generation number and cancellation token; starting a new one cancels
//! the previous and only the newest may write [`SearchState`].
//!
//! Pipeline per invocation:
//!
//! 1. shortcut replacement (rule table loaded on first use)
//! 2. OR expansion and pointer normalization ([`QueryPlan`])
//! 3. author resolution for every distinct `by:` token, bounded by the
//!    resolver timeout; outside a profile view unresolved branches may be
//!    shown meanwhile
//! 4. profile-scope check, which can end in a [`Redirect`]
//! 5. one relay query per branch, merged and committed

pub mod merge;
pub mod plan;
pub mod state;

use anyhow::Result;
use futures_util::future::join_all;
use nostr_core::filter::QueryFilter;
use nostr_core::pointer::to_npub;
use nostr_core::RelayClient;
use nostr_sdk::{Event, EventId, PublicKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use merge::merge_results;
pub use plan::{QueryPlan, ResolvedPlan};
pub use state::{HitKind, Redirect, ResultFilter, SearchState, Stage};

use crate::backend::{NostrRelayBackend, QueryRequest, RelayQuery};
use crate::config::Config;
use crate::error::QueryError;
use crate::replacements::ReplacementStore;
use crate::resolver::{AuthorCache, AuthorResolver, Nip05Client, RelayProfileDirectory};

/// Search knobs taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub limit: usize,
    pub default_kinds: Vec<u16>,
    pub immediate_results: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limit: config.search.limit,
            default_kinds: config.search.default_kinds.clone(),
            immediate_results: config.search.immediate_results,
        }
    }
}

/// Where the search box currently lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchContext {
    /// Set when the user is searching inside a profile view.
    pub profile_scope: Option<PublicKey>,
}

impl SearchContext {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn profile(pubkey: PublicKey) -> Self {
        Self {
            profile_scope: Some(pubkey),
        }
    }
}

/// One user-triggered search attempt.
#[derive(Debug, Clone)]
pub struct SearchInvocation {
    pub generation: u64,
    pub token: CancellationToken,
    pub query: String,
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Empty query, state reset.
    Cleared,
    /// Results written to state.
    Committed { stage: Stage, results: usize },
    /// The query names another author than the current profile scope.
    Redirected(Redirect),
    /// A newer search started first. Nothing was written.
    Superseded,
}

pub struct SearchOrchestrator {
    backend: Arc<dyn RelayQuery>,
    resolver: Arc<AuthorResolver>,
    replacements: Arc<ReplacementStore>,
    settings: SearchSettings,
    generation: AtomicU64,
    inflight: Mutex<Option<CancellationToken>>,
    state: watch::Sender<SearchState>,
}

impl SearchOrchestrator {
    pub fn new(
        backend: Arc<dyn RelayQuery>,
        resolver: Arc<AuthorResolver>,
        replacements: Arc<ReplacementStore>,
        settings: SearchSettings,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            backend,
            resolver,
            replacements,
            settings,
            generation: AtomicU64::new(0),
            inflight: Mutex::new(None),
            state,
        }
    }

    /// Wire up relays, NIP-05, the profile directory and shortcut rules
    /// from configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        let relay = RelayClient::new(config.relays.urls.clone()).await?;
        let backend = Arc::new(NostrRelayBackend::new(relay.clone(), config.fetch_timeout()));

        let mut resolver = AuthorResolver::new(Arc::new(Nip05Client::new()))
            .with_cache(Arc::new(AuthorCache::with_capacity(config.resolver.cache_capacity)))
            .with_timeout(config.resolver_timeout());
        if config.resolver.profile_lookup {
            resolver = resolver.with_directory(Arc::new(RelayProfileDirectory::new(
                relay,
                config.resolver_timeout(),
            )));
        }

        let replacements = Arc::new(ReplacementStore::new(config.rule_source()));
        Ok(Self::new(
            backend,
            Arc::new(resolver),
            replacements,
            SearchSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &AuthorResolver {
        &self.resolver
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Change notifications for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// The generation of the newest invocation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Narrow the visible results without querying again.
    pub fn set_result_filter(&self, filter: ResultFilter) {
        self.state.send_modify(|state| {
            state.filter = filter;
            state.results = filter.apply(&state.base_results);
        });
    }

    /// Cancel whatever is in flight and clear the results.
    pub fn clear(&self) {
        self.begin("");
    }

    /// Run one search to completion. Never fails: backend and resolution
    /// errors degrade to empty or unresolved results.
    pub async fn handle_search(&self, query: &str, context: &SearchContext) -> SearchOutcome {
        let query = query.trim();
        let invocation = self.begin(query);
        if query.is_empty() {
            debug!(generation = invocation.generation, "Empty query, results cleared");
            return SearchOutcome::Cleared;
        }
        info!(generation = invocation.generation, query, "Search started");

        let replaced = tokio::select! {
            replaced = self.replacements.apply(query) => replaced,
            () = invocation.token.cancelled() => return self.superseded(&invocation),
        };
        if !self.is_current(&invocation) {
            return self.superseded(&invocation);
        }

        let plan = QueryPlan::build(&replaced);
        debug!(
            generation = invocation.generation,
            branches = plan.branches.len(),
            authors = plan.author_tokens.len(),
            "Query planned"
        );

        let resolved = if plan.needs_resolution() {
            match self.resolve_authors(&invocation, &plan, context).await {
                Some(resolved) => resolved,
                None => return self.superseded(&invocation),
            }
        } else {
            plan.resolve(&HashMap::new())
        };

        if let Some(redirect) = self.check_context(&resolved, context) {
            info!(
                generation = invocation.generation,
                npub = %redirect.npub,
                "Query targets another profile, redirecting"
            );
            let committed = self.update_if_current(&invocation, |state| {
                state.loading = false;
                state.resolving_author = false;
                state.stage = None;
                state.base_results.clear();
                state.results.clear();
                state.redirect = Some(redirect.clone());
            });
            return if committed {
                SearchOutcome::Redirected(redirect)
            } else {
                self.superseded(&invocation)
            };
        }

        let hint: Vec<EventId> = self.state.borrow().base_results.iter().map(|e| e.id).collect();
        match self.dispatch(&invocation, &resolved.branches, &hint).await {
            Ok(events) => self.commit(&invocation, Stage::Final, events),
            Err(_) => self.superseded(&invocation),
        }
    }

    /// Bump the generation, cancel the previous invocation and reset the
    /// visible state, all under the state lock so commits and new
    /// searches are strictly ordered.
    fn begin(&self, query: &str) -> SearchInvocation {
        let token = CancellationToken::new();
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(previous) = self.inflight.lock().replace(token.clone()) {
                previous.cancel();
            }
            *state = SearchState {
                generation,
                query: query.to_string(),
                loading: !query.is_empty(),
                filter: state.filter,
                ..SearchState::default()
            };
        });
        SearchInvocation {
            generation,
            token,
            query: query.to_string(),
        }
    }

    fn is_current(&self, invocation: &SearchInvocation) -> bool {
        self.generation.load(Ordering::SeqCst) == invocation.generation
            && !invocation.token.is_cancelled()
    }

    fn superseded(&self, invocation: &SearchInvocation) -> SearchOutcome {
        debug!(
            generation = invocation.generation,
            current = self.generation(),
            "Search superseded, discarding"
        );
        SearchOutcome::Superseded
    }

    /// Apply `update` only if `invocation` is still the newest.
    fn update_if_current(
        &self,
        invocation: &SearchInvocation,
        update: impl FnOnce(&mut SearchState),
    ) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(invocation) {
                return false;
            }
            update(state);
            true
        })
    }

    /// Resolve every author token, showing unresolved results meanwhile
    /// when enabled. Inside a profile scope nothing runs before the
    /// redirect check. `None` when superseded.
    async fn resolve_authors(
        &self,
        invocation: &SearchInvocation,
        plan: &QueryPlan,
        context: &SearchContext,
    ) -> Option<ResolvedPlan> {
        self.update_if_current(invocation, |state| state.resolving_author = true);

        let show_unresolved = self.settings.immediate_results && context.profile_scope.is_none();
        let immediate = async {
            if !show_unresolved {
                return;
            }
            if let Ok(events) = self.dispatch(invocation, &plan.branches, &[]).await {
                self.commit(invocation, Stage::Immediate, events);
            }
        };
        let resolution = self.resolver.resolve_many(&plan.author_tokens);
        tokio::pin!(immediate, resolution);

        // The unresolved view is abandoned once resolution wins the race.
        let finished_first = tokio::select! {
            resolved = &mut resolution => Some(resolved),
            () = &mut immediate => None,
        };
        let resolved = match finished_first {
            Some(resolved) => resolved,
            None => resolution.await,
        };

        let unresolved: Vec<&String> = resolved
            .iter()
            .filter(|(_, pk)| pk.is_none())
            .map(|(token, _)| token)
            .collect();
        if !unresolved.is_empty() {
            debug!(
                generation = invocation.generation,
                ?unresolved,
                "Continuing with unresolved author tokens"
            );
        }

        if !self.update_if_current(invocation, |state| state.resolving_author = false) {
            return None;
        }
        Some(plan.resolve(&resolved))
    }

    fn check_context(&self, resolved: &ResolvedPlan, context: &SearchContext) -> Option<Redirect> {
        let scope = context.profile_scope?;
        let author = resolved.sole_author()?;
        if author == scope {
            return None;
        }
        Some(Redirect {
            author,
            npub: to_npub(&author),
            query: resolved.query.clone(),
        })
    }

    /// One relay query per branch, merged. Failed branches contribute
    /// nothing; only cancellation is an error.
    async fn dispatch(
        &self,
        invocation: &SearchInvocation,
        branches: &[String],
        hint: &[EventId],
    ) -> Result<Vec<Event>, QueryError> {
        let queries = branches.iter().map(|branch| {
            let request = QueryRequest {
                query: branch.clone(),
                filter: QueryFilter::from_query(branch, &self.settings.default_kinds),
                limit: self.settings.limit,
                hint: hint.to_vec(),
            };
            self.backend.query(request, &invocation.token)
        });
        let outcomes = join_all(queries).await;

        if invocation.token.is_cancelled() {
            return Err(QueryError::Aborted);
        }
        let mut batches = Vec::with_capacity(outcomes.len());
        for (branch, outcome) in branches.iter().zip(outcomes) {
            match outcome {
                Ok(events) => batches.push(events),
                Err(QueryError::Aborted) => return Err(QueryError::Aborted),
                Err(e) => warn!(
                    generation = invocation.generation,
                    branch = %branch,
                    "Relay query failed, branch yields no results: {e}"
                ),
            }
        }
        Ok(merge_results(batches, self.settings.limit))
    }

    fn commit(&self, invocation: &SearchInvocation, stage: Stage, events: Vec<Event>) -> SearchOutcome {
        let count = events.len();
        let committed = self.update_if_current(invocation, |state| {
            state.results = state.filter.apply(&events);
            state.base_results = events;
            state.stage = Some(stage);
            state.loading = stage == Stage::Immediate;
        });
        if !committed {
            return self.superseded(invocation);
        }
        info!(generation = invocation.generation, ?stage, results = count, "Results committed");
        SearchOutcome::Committed {
            stage,
            results: count,
        }
    }
}
