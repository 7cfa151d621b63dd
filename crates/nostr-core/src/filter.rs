//! Translate one concrete query string into a relay filter.
//!
//! The input is a flat query (already expanded, resolved and normalized).
//! Directives the relay can express natively become filter fields; every
//! other term is handed to the relay as NIP-50 search text.

use chrono::{NaiveDate, NaiveTime};
use nostr_sdk::prelude::*;
use serde::Serialize;

use crate::pointer::normalize_pubkey;
use crate::scan::{tokenize, TokenKind};
use crate::text::{extract_hashtags, parse_identifier, Pointer};

/// Kinds searched when a query carries no `kind:` directive: profiles,
/// notes, file metadata and highlights.
pub const DEFAULT_KINDS: [u16; 4] = [0, 1, 1063, 9802];

/// Structured form of a concrete query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryFilter {
    pub authors: Vec<PublicKey>,
    pub mentions: Vec<PublicKey>,
    pub ids: Vec<EventId>,
    pub kinds: Vec<u16>,
    pub hashtags: Vec<String>,
    pub since: Option<u64>,
    pub until: Option<u64>,
    pub search: Option<String>,
}

impl QueryFilter {
    /// Parse `query`, falling back to `default_kinds` when no `kind:` is
    /// given and the query is not a plain id lookup.
    pub fn from_query(query: &str, default_kinds: &[u16]) -> Self {
        let mut filter = Self::default();
        let mut text: Vec<&str> = Vec::new();

        for token in tokenize(query) {
            let word = token.text(query);
            if token.kind != TokenKind::Word {
                text.push(word);
                continue;
            }
            if !filter.absorb(word) {
                text.push(word);
            }
        }

        if filter.kinds.is_empty() && filter.ids.is_empty() {
            filter.kinds = default_kinds.to_vec();
        }
        let joined = text.join(" ");
        let joined = joined.trim();
        if !joined.is_empty() {
            filter.search = Some(joined.to_string());
        }
        filter
    }

    /// Try to interpret one word as a structured term.
    fn absorb(&mut self, word: &str) -> bool {
        if let Some((key, value)) = word.split_once(':') {
            match key.to_ascii_lowercase().as_str() {
                "by" => return push_key(&mut self.authors, value),
                "p" => return push_key(&mut self.mentions, value),
                "kind" => {
                    return match value.parse::<u16>() {
                        Ok(kind) => {
                            if !self.kinds.contains(&kind) {
                                self.kinds.push(kind);
                            }
                            true
                        }
                        Err(_) => false,
                    };
                }
                "since" => {
                    return parse_day(value, NaiveTime::MIN)
                        .map(|ts| self.since = Some(ts))
                        .is_some();
                }
                "until" => {
                    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
                    return parse_day(value, end_of_day)
                        .map(|ts| self.until = Some(ts))
                        .is_some();
                }
                _ => {}
            }
        }

        if word.starts_with('#') {
            let tags = extract_hashtags(word);
            if tags.len() == 1 && word.len() == tags[0].len() + 1 {
                if !self.hashtags.contains(&tags[0]) {
                    self.hashtags.extend(tags);
                }
                return true;
            }
        }

        match parse_identifier(word) {
            Some(Pointer::Event(id)) => {
                if !self.ids.contains(&id) {
                    self.ids.push(id);
                }
                true
            }
            Some(Pointer::Profile(pk)) => {
                if !self.authors.contains(&pk) {
                    self.authors.push(pk);
                }
                true
            }
            _ => false,
        }
    }

    /// True when the query is only hashtags (no free-text search).
    pub fn is_tag_only(&self) -> bool {
        self.search.is_none() && !self.hashtags.is_empty()
    }

    /// Build the relay filter with a result ceiling.
    pub fn to_filter(&self, limit: usize) -> Filter {
        let mut filter = Filter::new().limit(limit);
        if !self.ids.is_empty() {
            filter = filter.ids(self.ids.iter().copied());
        }
        if !self.authors.is_empty() {
            filter = filter.authors(self.authors.iter().copied());
        }
        if !self.mentions.is_empty() {
            filter = filter.pubkeys(self.mentions.iter().copied());
        }
        if !self.kinds.is_empty() {
            filter = filter.kinds(self.kinds.iter().map(|k| Kind::from(*k)));
        }
        if !self.hashtags.is_empty() {
            filter = filter.hashtags(self.hashtags.iter().cloned());
        }
        if let Some(since) = self.since {
            filter = filter.since(Timestamp::from(since));
        }
        if let Some(until) = self.until {
            filter = filter.until(Timestamp::from(until));
        }
        if let Some(search) = &self.search {
            filter = filter.search(search.clone());
        }
        filter
    }
}

fn push_key(into: &mut Vec<PublicKey>, value: &str) -> bool {
    match normalize_pubkey(value) {
        Some(pk) => {
            if !into.contains(&pk) {
                into.push(pk);
            }
            true
        }
        None => false,
    }
}

fn parse_day(value: &str, time: NaiveTime) -> Option<u64> {
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let ts = day.and_time(time).and_utc().timestamp();
    u64::try_from(ts).ok()
}
