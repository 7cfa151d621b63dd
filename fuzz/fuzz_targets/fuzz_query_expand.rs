#![no_main]
use libfuzzer_sys::fuzz_target;
use nostr_core::expand::{expand_query, MAX_EXPANSIONS};
use nostr_core::filter::{QueryFilter, DEFAULT_KINDS};
use nostr_search::search::QueryPlan;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let branches = expand_query(s);
        assert!(s.trim().is_empty() || !branches.is_empty());
        assert!(branches.len() <= MAX_EXPANSIONS);

        let plan = QueryPlan::build(s);
        for branch in &plan.branches {
            let _ = QueryFilter::from_query(branch, &DEFAULT_KINDS);
        }
    }
});
