//! Profile-pointer normalization for `by:` and `p:` directives.
//!
//! Users paste keys in whatever shape their client gave them. Everything
//! that decodes to a public key without a network call is rewritten to
//! `npub` so the rest of the pipeline only sees one encoding.

use nostr_sdk::prelude::*;

use crate::text::{find_directives, parse_identifier, splice, Pointer};

/// Directive keys that scope a query to a profile.
pub const PROFILE_DIRECTIVES: [&str; 2] = ["by", "p"];

/// Decode a hex key, `npub`, `nprofile` or `nostr:` URI into a public key.
pub fn normalize_pubkey(raw: &str) -> Option<PublicKey> {
    let raw = raw.trim();
    if raw.len() == 64 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return PublicKey::from_hex(&raw.to_ascii_lowercase()).ok();
    }
    match parse_identifier(raw)? {
        Pointer::Profile(pk) => Some(pk),
        _ => None,
    }
}

/// True when `raw` is already a bare `npub` that decodes.
pub fn is_canonical_npub(raw: &str) -> bool {
    raw.starts_with("npub1") && PublicKey::from_bech32(raw).is_ok()
}

/// Encode a public key as `npub`, falling back to hex.
pub fn to_npub(pk: &PublicKey) -> String {
    pk.to_bech32().unwrap_or_else(|_| pk.to_hex())
}

/// Rewrite every decodable value after `by:` / `p:` to its `npub` form.
///
/// Values that are not keys (names, NIP-05 identities) are left alone.
pub fn normalize_profile_pointers(query: &str) -> String {
    let edits: Vec<(usize, usize, String)> = find_directives(query)
        .into_iter()
        .filter(|d| PROFILE_DIRECTIVES.contains(&d.key.as_str()))
        .filter(|d| !is_canonical_npub(&d.value))
        .filter_map(|d| {
            let pk = normalize_pubkey(&d.value)?;
            Some((d.value_start, d.end, to_npub(&pk)))
        })
        .collect();

    if edits.is_empty() {
        return query.to_string();
    }
    splice(query, edits)
}
