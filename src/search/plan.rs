//! Offline query planning: everything between the raw query and the
//! relay requests that needs no network.

use nostr_core::expand::expand_query;
use nostr_core::pointer::{normalize_profile_pointers, normalize_pubkey, to_npub};
use nostr_core::text::{directives_with_key, splice};
use nostr_sdk::PublicKey;
use std::collections::HashMap;

use crate::resolver::AuthorToken;

const AUTHOR_DIRECTIVE: &str = "by";

/// An expanded query whose author tokens may still need resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// The query after shortcut replacement and pointer normalization.
    pub query: String,
    /// OR-expanded branches of `query`.
    pub branches: Vec<String>,
    /// Distinct `by:` values that need a network lookup, first-seen order.
    pub author_tokens: Vec<String>,
}

/// A plan with resolved authors spliced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub query: String,
    pub branches: Vec<String>,
    /// Distinct authors named by `by:` across all branches.
    pub authors: Vec<PublicKey>,
}

impl QueryPlan {
    pub fn build(query: &str) -> Self {
        let query = normalize_profile_pointers(query.trim());
        let mut branches: Vec<String> = expand_query(&query)
            .iter()
            .map(|b| normalize_profile_pointers(b))
            .collect();
        if branches.is_empty() && !query.is_empty() {
            branches.push(query.clone());
        }

        let mut author_tokens: Vec<String> = Vec::new();
        for branch in &branches {
            for directive in directives_with_key(branch, AUTHOR_DIRECTIVE) {
                if AuthorToken::classify(&directive.value).needs_network()
                    && !author_tokens.contains(&directive.value)
                {
                    author_tokens.push(directive.value);
                }
            }
        }

        Self {
            query,
            branches,
            author_tokens,
        }
    }

    pub fn needs_resolution(&self) -> bool {
        !self.author_tokens.is_empty()
    }

    /// Splice resolved keys into every branch at the exact token spans.
    /// Tokens mapped to `None` (or missing) are left as typed.
    pub fn resolve(&self, resolved: &HashMap<String, Option<PublicKey>>) -> ResolvedPlan {
        let query = substitute_authors(&self.query, resolved);
        let branches: Vec<String> = self
            .branches
            .iter()
            .map(|b| substitute_authors(b, resolved))
            .collect();

        let mut authors = Vec::new();
        for branch in &branches {
            for directive in directives_with_key(branch, AUTHOR_DIRECTIVE) {
                if let Some(pk) = normalize_pubkey(&directive.value) {
                    if !authors.contains(&pk) {
                        authors.push(pk);
                    }
                }
            }
        }

        ResolvedPlan {
            query,
            branches,
            authors,
        }
    }
}

impl ResolvedPlan {
    /// The single author every branch is scoped to, if there is exactly one.
    pub fn sole_author(&self) -> Option<PublicKey> {
        match self.authors.as_slice() {
            [pk] => Some(*pk),
            _ => None,
        }
    }
}

/// Replace resolvable `by:` values in `query` with their `npub`.
pub fn substitute_authors(query: &str, resolved: &HashMap<String, Option<PublicKey>>) -> String {
    let edits: Vec<(usize, usize, String)> = directives_with_key(query, AUTHOR_DIRECTIVE)
        .into_iter()
        .filter_map(|d| {
            let pk = resolved.get(&d.value)?.as_ref()?;
            Some((d.value_start, d.end, to_npub(pk)))
        })
        .collect();
    if edits.is_empty() {
        return query.to_string();
    }
    splice(query, edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_sdk::Keys;

    #[test]
    fn collects_tokens_from_every_branch() {
        let plan = QueryPlan::build("by:(alice OR bob) rust");
        assert_eq!(plan.branches, vec!["by:alice rust", "by:bob rust"]);
        assert_eq!(plan.author_tokens, vec!["alice", "bob"]);
    }

    #[test]
    fn keys_need_no_resolution() {
        let hex = Keys::generate().public_key().to_hex();
        let plan = QueryPlan::build(&format!("by:{hex} rust"));
        assert!(!plan.needs_resolution());
        assert!(plan.query.starts_with("by:npub1"));
    }

    #[test]
    fn resolved_tokens_are_spliced_into_each_branch() {
        let pk = Keys::generate().public_key();
        let npub = to_npub(&pk);
        let plan = QueryPlan::build("by:alice (cats OR dogs)");
        assert_eq!(plan.author_tokens, vec!["alice"]);

        let resolved = HashMap::from([("alice".to_string(), Some(pk))]);
        let out = plan.resolve(&resolved);
        assert_eq!(
            out.branches,
            vec![format!("by:{npub} cats"), format!("by:{npub} dogs")]
        );
        assert_eq!(out.sole_author(), Some(pk));
    }

    #[test]
    fn unresolved_tokens_stay_as_typed() {
        let plan = QueryPlan::build("by:nobody rust");
        let resolved = HashMap::from([("nobody".to_string(), None)]);
        let out = plan.resolve(&resolved);
        assert_eq!(out.branches, vec!["by:nobody rust"]);
        assert!(out.authors.is_empty());
        assert_eq!(out.sole_author(), None);
    }

    #[test]
    fn substitution_only_touches_the_value_span() {
        let pk = Keys::generate().public_key();
        let resolved = HashMap::from([("al".to_string(), Some(pk))]);
        let out = substitute_authors("al by:al \"by:al\"", &resolved);
        assert_eq!(out, format!("al by:{} \"by:al\"", to_npub(&pk)));
    }

    #[test]
    fn two_authors_have_no_sole_author() {
        let a = Keys::generate().public_key();
        let b = Keys::generate().public_key();
        let plan = QueryPlan::build("by:(alice OR bob)");
        let resolved = HashMap::from([
            ("alice".to_string(), Some(a)),
            ("bob".to_string(), Some(b)),
        ]);
        assert_eq!(plan.resolve(&resolved).sole_author(), None);
    }
}
