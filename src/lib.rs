//! Nostr search client core.
//!
//! Turns what a user types into relay filters and runs searches against
//! NIP-50 relays: shortcut replacement, boolean OR expansion, author
//! resolution (keys, NIP-05, display names), cancellation of superseded
//! searches and staged result commits. The pure query-language pieces
//! live in `nostr-core`; this crate adds the async orchestration.

pub mod backend;
pub mod config;
pub mod error;
pub mod replacements;
pub mod resolver;
pub mod search;

pub use backend::{NostrRelayBackend, QueryRequest, RelayQuery};
pub use config::Config;
pub use error::{QueryError, ResolveError};
pub use replacements::{ReplacementStore, RuleSource};
pub use resolver::{AuthorCache, AuthorResolver, IdentityService, ProfileDirectory};
pub use search::{
    HitKind, Redirect, ResultFilter, SearchContext, SearchOrchestrator, SearchOutcome,
    SearchSettings, SearchState, Stage,
};

pub use nostr_core;
