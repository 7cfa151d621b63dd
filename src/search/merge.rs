//! Combining per-branch relay results into one ranked list.

use nostr_sdk::{Event, EventId, Kind, PublicKey};
use std::collections::{HashMap, HashSet};

/// Merge result batches: drop duplicate ids, keep only the newest
/// profile (kind 0) per author, newest first, at most `limit` events.
pub fn merge_results<I>(batches: I, limit: usize) -> Vec<Event>
where
    I: IntoIterator<Item = Vec<Event>>,
{
    let mut seen: HashSet<EventId> = HashSet::new();
    let mut profiles: HashMap<PublicKey, Event> = HashMap::new();
    let mut merged: Vec<Event> = Vec::new();

    for event in batches.into_iter().flatten() {
        if !seen.insert(event.id) {
            continue;
        }
        if event.kind == Kind::Metadata {
            match profiles.get(&event.pubkey) {
                Some(current) if !is_newer(&event, current) => {}
                _ => {
                    profiles.insert(event.pubkey, event);
                }
            }
            continue;
        }
        merged.push(event);
    }

    merged.extend(profiles.into_values());
    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(limit);
    merged
}

fn is_newer(candidate: &Event, current: &Event) -> bool {
    (candidate.created_at, current.id) > (current.created_at, candidate.id)
}
