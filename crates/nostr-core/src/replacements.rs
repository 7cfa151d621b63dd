//! Textual shortcut rules such as `is:code => kind:1337`.
//!
//! The rule file is line oriented:
//!
//! ```text
//! # comment
//! is:code      => kind:1337
//! is:highlight => kind:9802
//! ```
//!
//! Only rules whose pattern starts with a recognized directive prefix are
//! kept; anything else is skipped silently.

use std::collections::HashMap;

use crate::scan::{tokenize, TokenKind};
use crate::text::splice;

/// Directive prefixes a rule pattern may start with.
pub const RULE_PREFIXES: [&str; 2] = ["is:", "has:"];

const ARROW: &str = "=>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
    pub pattern: String,
    pub substitution: String,
}

/// An immutable, indexed rule table.
#[derive(Debug, Clone, Default)]
pub struct ReplacementRules {
    rules: Vec<ReplacementRule>,
    index: HashMap<String, usize>,
}

impl ReplacementRules {
    /// A table with no rules; `apply` is then the identity.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a rule file. Never fails: malformed lines are dropped and the
    /// first rule for a given pattern wins.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            let Some((lhs, rhs)) = line.split_once(ARROW) else {
                continue;
            };
            let pattern = lhs.trim();
            let substitution = rhs.trim();
            if pattern.is_empty()
                || pattern.contains(char::is_whitespace)
                || !RULE_PREFIXES.iter().any(|p| pattern.starts_with(p))
            {
                continue;
            }
            if table.index.contains_key(pattern) {
                continue;
            }
            table.index.insert(pattern.to_string(), table.rules.len());
            table.rules.push(ReplacementRule {
                pattern: pattern.to_string(),
                substitution: substitution.to_string(),
            });
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in file order.
    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }

    pub fn substitution_for(&self, pattern: &str) -> Option<&str> {
        self.index
            .get(pattern)
            .map(|&i| self.rules[i].substitution.as_str())
    }

    /// Replace every whole token equal to a rule pattern, in one pass.
    ///
    /// Substituted text is not rescanned and quoted phrases are opaque.
    pub fn apply(&self, query: &str) -> String {
        if self.rules.is_empty() {
            return query.to_string();
        }

        let edits: Vec<(usize, usize, String)> = tokenize(query)
            .into_iter()
            .filter(|t| t.kind == TokenKind::Word)
            .filter_map(|t| {
                let sub = self.substitution_for(t.text(query))?;
                Some((t.start, t.end, sub.to_string()))
            })
            .collect();

        if edits.is_empty() {
            return query.to_string();
        }
        splice(query, edits)
    }
}
