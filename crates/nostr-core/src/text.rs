//! Text normalization helpers: hashtags, NIP-19 identifiers and
//! `key:value` directives.

use nostr_sdk::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::scan::{tokenize, TokenKind};

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\p{L}\p{N}_&/#])#([\p{L}\p{N}_]+)").unwrap());
static HASHTAG_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[\p{L}\p{N}_]+$").unwrap());
static NIP19_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:nostr:)?((?:npub|nprofile|note|nevent|naddr)1[02-9ac-hj-np-z]+)").unwrap()
});
static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*):(.+)$").unwrap());

/// Extract lower-cased hashtags from free text, first-seen order, no repeats.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// True when every term of the query is a hashtag (`#rust #nostr`).
///
/// OR operators and parens are ignored so `(#a OR #b)` also counts.
pub fn is_hashtag_only(query: &str) -> bool {
    let tokens = tokenize(query);
    let mut terms = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Word && !t.is_or(query))
        .peekable();
    if terms.peek().is_none() {
        return false;
    }
    terms.all(|t| HASHTAG_TOKEN_RE.is_match(t.text(query)))
}

/// A decoded NIP-19 reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointer {
    /// `npub` / `nprofile`
    Profile(PublicKey),
    /// `note` / `nevent`
    Event(EventId),
    /// `naddr`, kept in its bech32 form.
    Address(String),
}

/// Find every bech32 NIP-19 identifier in `text`, with any `nostr:`
/// prefix stripped.
pub fn extract_identifiers(text: &str) -> Vec<String> {
    NIP19_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Decode a single identifier (`npub1…`, `nostr:nevent1…`, …).
///
/// Secret keys and anything that fails bech32 decoding yield `None`.
pub fn parse_identifier(raw: &str) -> Option<Pointer> {
    let raw = raw.trim();
    let bech = raw.strip_prefix("nostr:").unwrap_or(raw);
    match Nip19::from_bech32(bech).ok()? {
        Nip19::Pubkey(pk) => Some(Pointer::Profile(pk)),
        Nip19::Profile(profile) => Some(Pointer::Profile(profile.public_key)),
        Nip19::EventId(id) => Some(Pointer::Event(id)),
        Nip19::Event(event) => Some(Pointer::Event(event.event_id)),
        Nip19::Coordinate(_) => Some(Pointer::Address(bech.to_string())),
        _ => None,
    }
}

/// A `key:value` token found in a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Lower-cased key without the colon.
    pub key: String,
    pub value: String,
    /// Byte span of the whole token in the query.
    pub start: usize,
    pub end: usize,
    /// Byte offset where the value begins.
    pub value_start: usize,
}

/// All directives in the query, left to right. Quoted text is never
/// inspected and a directive whose value opens a quote is skipped.
pub fn find_directives(query: &str) -> Vec<Directive> {
    tokenize(query)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Word)
        .filter_map(|t| {
            let text = t.text(query);
            if text.starts_with('"') {
                return None;
            }
            let caps = DIRECTIVE_RE.captures(text)?;
            let key = caps.get(1)?;
            let value = caps.get(2)?;
            if value.as_str().starts_with('"') || value.as_str().starts_with("//") {
                return None;
            }
            Some(Directive {
                key: key.as_str().to_ascii_lowercase(),
                value: value.as_str().to_string(),
                start: t.start,
                end: t.end,
                value_start: t.start + value.start(),
            })
        })
        .collect()
}

/// Directives with the given key, e.g. `directives_with_key(q, "by")`.
pub fn directives_with_key(query: &str, key: &str) -> Vec<Directive> {
    find_directives(query)
        .into_iter()
        .filter(|d| d.key == key)
        .collect()
}

/// Replace byte spans of `source`, leaving everything else untouched.
///
/// Edits are `(start, end, replacement)`; overlapping edits are skipped.
pub fn splice(source: &str, mut edits: Vec<(usize, usize, String)>) -> String {
    edits.sort_by_key(|(start, _, _)| *start);
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        if start < cursor || end > source.len() {
            continue;
        }
        out.push_str(&source[cursor..start]);
        out.push_str(&replacement);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}
