//! Boolean expansion of search queries.
//!
//! Relays only understand flat queries, so `pets (cats OR dogs)` is
//! distributed into `pets cats` and `pets dogs`, and a top-level
//! `foo OR bar` becomes two sibling queries. Output order always follows
//! the left-to-right order of the OR branches in the source.

use crate::scan::{tokenize, top_level_ors, Token, TokenKind};
use std::collections::HashSet;

/// Upper bound on the number of branches a single query may expand into.
pub const MAX_EXPANSIONS: usize = 64;

/// Distribute every parenthesized OR group across the query.
///
/// The leftmost outermost group whose content has a top-level `OR` is
/// split into its alternatives; each alternative is substituted for the
/// whole group and the result is expanded again. A query without such a
/// group comes back as `[query]`. Unbalanced parens are literal text.
pub fn expand_parenthesized_or(query: &str) -> Vec<String> {
    let mut out = Vec::new();
    expand_into(query, &mut out);
    out
}

fn expand_into(query: &str, out: &mut Vec<String>) {
    if out.len() >= MAX_EXPANSIONS {
        return;
    }

    let tokens = tokenize(query);
    let Some((open, close, ors)) = first_or_group(query, &tokens) else {
        out.push(query.to_string());
        return;
    };

    let alternatives = split_at(query, &tokens, open + 1, close, &ors);
    if alternatives.is_empty() {
        // `( OR )` has nothing to distribute.
        out.push(query.to_string());
        return;
    }

    let before = &query[..tokens[open].start];
    let after = &query[tokens[close].end..];

    for alternative in alternatives {
        if out.len() >= MAX_EXPANSIONS {
            tracing::warn!(max = MAX_EXPANSIONS, "Query expansion truncated");
            return;
        }
        let candidate = format!("{before}{alternative}{after}");
        expand_into(candidate.trim(), out);
    }
}

/// Find the first balanced group (by opening position) with a top-level OR.
///
/// One pass: each OR is credited to the innermost open group around it.
/// Groups close inner-first, so the scan stops once an outermost group
/// closes with a candidate in hand.
fn first_or_group(query: &str, tokens: &[Token]) -> Option<(usize, usize, Vec<usize>)> {
    let mut open: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut found: Option<(usize, usize, Vec<usize>)> = None;

    for (idx, tok) in tokens.iter().enumerate() {
        match (tok.kind, tok.partner) {
            (TokenKind::Open, Some(_)) => open.push((idx, Vec::new())),
            (TokenKind::Close, Some(_)) => {
                let Some((start, ors)) = open.pop() else {
                    continue;
                };
                let earlier = found.as_ref().is_none_or(|(best, _, _)| start < *best);
                if !ors.is_empty() && earlier {
                    found = Some((start, idx, ors));
                }
                if open.is_empty() && found.is_some() {
                    break;
                }
            }
            _ if tok.is_or(query) => {
                if let Some((_, ors)) = open.last_mut() {
                    ors.push(idx);
                }
            }
            _ => {}
        }
    }
    found
}

/// Cut `tokens[from..to]` at the given OR tokens, returning the trimmed,
/// non-empty source slices between them.
fn split_at<'a>(
    query: &'a str,
    tokens: &[Token],
    from: usize,
    to: usize,
    ors: &[usize],
) -> Vec<&'a str> {
    let mut pieces = Vec::with_capacity(ors.len() + 1);
    let mut seg_start = from;
    for &or in ors.iter().chain(std::iter::once(&to)) {
        if seg_start < or {
            let text = &query[tokens[seg_start].start..tokens[or - 1].end];
            let text = text.trim();
            if !text.is_empty() {
                pieces.push(text);
            }
        }
        seg_start = or + 1;
    }
    pieces
}

/// Split a query on `OR` tokens that are outside parens and quotes.
///
/// `foo OR bar` → `["foo", "bar"]`; a query without a top-level OR (or
/// with nothing but ORs) comes back as `[query]`.
pub fn parse_or_query(query: &str) -> Vec<String> {
    let tokens = tokenize(query);
    let ors = top_level_ors(query, &tokens, 0, tokens.len());
    if ors.is_empty() {
        return vec![query.to_string()];
    }

    let pieces: Vec<String> = split_at(query, &tokens, 0, tokens.len(), &ors)
        .into_iter()
        .map(str::to_string)
        .collect();
    if pieces.is_empty() {
        vec![query.to_string()]
    } else {
        pieces
    }
}

/// Full expansion: parenthesized groups first, then the top-level OR split
/// of every branch. Duplicates are dropped keeping first-seen order.
pub fn expand_query(query: &str) -> Vec<String> {
    let query = query.trim();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for branch in expand_parenthesized_or(query) {
        for alternative in parse_or_query(&branch) {
            if out.len() >= MAX_EXPANSIONS {
                return out;
            }
            let alternative = alternative.trim().to_string();
            if alternative.is_empty() {
                continue;
            }
            if seen.insert(alternative.clone()) {
                out.push(alternative);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_single_group_in_order() {
        assert_eq!(
            expand_parenthesized_or("pets (cats OR dogs OR birds)"),
            vec!["pets cats", "pets dogs", "pets birds"]
        );
    }

    #[test]
    fn no_group_returns_query_unchanged() {
        assert_eq!(expand_parenthesized_or("just words"), vec!["just words"]);
        assert_eq!(expand_parenthesized_or("(no alternatives)"), vec!["(no alternatives)"]);
    }

    #[test]
    fn group_in_the_middle_keeps_both_sides() {
        assert_eq!(
            expand_parenthesized_or("a (b OR c) d"),
            vec!["a b d", "a c d"]
        );
    }

    #[test]
    fn multiple_groups_are_combined() {
        assert_eq!(
            expand_parenthesized_or("(a OR b) (c OR d)"),
            vec!["a c", "a d", "b c", "b d"]
        );
    }

    #[test]
    fn nested_groups_expand_recursively() {
        assert_eq!(
            expand_parenthesized_or("x ((a OR b) OR c)"),
            vec!["x a", "x b", "x c"]
        );
        assert_eq!(
            expand_parenthesized_or("x ((a OR b) y)"),
            vec!["x (a y)", "x (b y)"]
        );
    }

    #[test]
    fn innermost_or_group_is_found_under_plain_groups() {
        assert_eq!(
            expand_parenthesized_or("((((a OR b) c) d) e)"),
            vec!["(((a c) d) e)", "(((b c) d) e)"]
        );
        assert_eq!(
            expand_parenthesized_or("(x) (y (a OR b))"),
            vec!["(x) (y a)", "(x) (y b)"]
        );
    }

    #[test]
    fn deep_plain_nesting_comes_back_unchanged() {
        let query = format!("{}x{}", "(".repeat(5000), ")".repeat(5000));
        assert_eq!(expand_parenthesized_or(&query), vec![query.clone()]);
    }

    #[test]
    fn directive_group_expands_without_spaces() {
        assert_eq!(
            expand_parenthesized_or("by:(alice OR bob) rust"),
            vec!["by:alice rust", "by:bob rust"]
        );
    }

    #[test]
    fn unbalanced_parens_are_literal() {
        assert_eq!(expand_parenthesized_or("(a OR b"), vec!["(a OR b"]);
        assert_eq!(expand_parenthesized_or("a OR b)"), vec!["a OR b)"]);
        assert_eq!(
            expand_parenthesized_or("((a OR b)"),
            vec!["(a", "(b"]
        );
    }

    #[test]
    fn empty_group_stays_literal() {
        assert_eq!(expand_parenthesized_or("rust ( OR )"), vec!["rust ( OR )"]);
        assert_eq!(expand_query("rust ( OR )"), vec!["rust ( OR )"]);
    }

    #[test]
    fn quoted_or_is_opaque() {
        assert_eq!(
            expand_parenthesized_or(r#"x ("a OR b" OR c)"#),
            vec![r#"x "a OR b""#, "x c"]
        );
        assert_eq!(parse_or_query(r#""this OR that""#), vec![r#""this OR that""#]);
    }

    #[test]
    fn parse_or_splits_top_level() {
        assert_eq!(parse_or_query("foo OR bar OR baz"), vec!["foo", "bar", "baz"]);
        assert_eq!(parse_or_query("foo bar"), vec!["foo bar"]);
        assert_eq!(parse_or_query("foo or bar"), vec!["foo", "bar"]);
    }

    #[test]
    fn parse_or_ignores_parenthesized_or() {
        assert_eq!(parse_or_query("a (b OR c)"), vec!["a (b OR c)"]);
        assert_eq!(parse_or_query("a OR (b OR c)"), vec!["a", "(b OR c)"]);
    }

    #[test]
    fn parse_or_of_only_operators_is_unchanged() {
        assert_eq!(parse_or_query("OR"), vec!["OR"]);
        assert_eq!(parse_or_query("OR foo"), vec!["foo"]);
    }

    #[test]
    fn full_expansion_combines_both_stages() {
        assert_eq!(
            expand_query("rust (async OR tokio) OR #nostr"),
            vec!["rust async", "#nostr", "rust tokio"]
        );
    }

    #[test]
    fn full_expansion_dedupes_in_first_seen_order() {
        assert_eq!(expand_query("(a OR a OR b)"), vec!["a", "b"]);
    }

    #[test]
    fn expansion_is_capped() {
        let query = "(a OR b) (c OR d) (e OR f) (g OR h) (i OR j) (k OR l) (m OR n)";
        assert_eq!(expand_query(query).len(), MAX_EXPANSIONS);
    }
}
