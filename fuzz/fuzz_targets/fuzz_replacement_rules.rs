#![no_main]
use libfuzzer_sys::fuzz_target;
use nostr_core::replacements::ReplacementRules;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let (rules, query) = s.split_once('\0').unwrap_or((s, "is:code rust"));
        let table = ReplacementRules::parse(rules);
        let _ = table.apply(query);
    }
});
