//! Shared Nostr query-language functionality for nostr-search.
//!
//! Everything here is synchronous and network-free except [`RelayClient`]:
//! tokenizing, boolean expansion, shortcut rules, pointer normalization
//! and the translation of a flat query into a relay filter.

pub mod expand;
pub mod filter;
pub mod pointer;
pub mod relay;
pub mod replacements;
pub mod scan;
pub mod text;

// Re-export commonly used types
pub use expand::{expand_parenthesized_or, expand_query, parse_or_query, MAX_EXPANSIONS};
pub use filter::{QueryFilter, DEFAULT_KINDS};
pub use pointer::{normalize_profile_pointers, normalize_pubkey, to_npub};
pub use relay::{FetchOutcome, RelayClient};
pub use replacements::{ReplacementRule, ReplacementRules};
pub use text::{extract_hashtags, extract_identifiers, is_hashtag_only, parse_identifier, Pointer};

// Re-export nostr-sdk for convenience
pub use nostr_sdk;
