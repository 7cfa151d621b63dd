//! Reactive state shared with the presentation layer.

use nostr_sdk::{Event, Kind, PublicKey};
use serde::Serialize;

/// Which phase of a search produced the visible results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Author tokens not resolved yet.
    Immediate,
    /// Fully resolved query.
    Final,
}

/// Coarse content class of a result, used for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Profile,
    Note,
    Article,
    File,
    Highlight,
    Other,
}

impl HitKind {
    pub fn of(event: &Event) -> Self {
        match event.kind {
            Kind::Metadata => Self::Profile,
            Kind::TextNote => Self::Note,
            Kind::LongFormTextNote => Self::Article,
            Kind::FileMetadata => Self::File,
            k if k.as_u16() == 9802 => Self::Highlight,
            _ => Self::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Note => "note",
            Self::Article => "article",
            Self::File => "file",
            Self::Highlight => "highlight",
            Self::Other => "event",
        }
    }
}

/// Presentation-side narrowing of the base result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ResultFilter {
    #[default]
    All,
    Only(HitKind),
}

impl ResultFilter {
    pub fn apply(self, events: &[Event]) -> Vec<Event> {
        match self {
            Self::All => events.to_vec(),
            Self::Only(kind) => events
                .iter()
                .filter(|e| HitKind::of(e) == kind)
                .cloned()
                .collect(),
        }
    }
}

/// A request to re-home the search into another author's profile scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub author: PublicKey,
    pub npub: String,
    /// The query with author tokens resolved.
    pub query: String,
}

/// Everything the UI renders from. Updated only by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Generation of the invocation that last touched this state.
    pub generation: u64,
    pub query: String,
    pub loading: bool,
    pub resolving_author: bool,
    pub stage: Option<Stage>,
    /// Unfiltered merged results.
    pub base_results: Vec<Event>,
    /// `base_results` after `filter`.
    pub results: Vec<Event>,
    pub filter: ResultFilter,
    pub redirect: Option<Redirect>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_sdk::{EventBuilder, Keys};

    fn event(kind: Kind) -> Event {
        EventBuilder::new(kind, "x")
            .sign_with_keys(&Keys::generate())
            .unwrap()
    }

    #[test]
    fn classifies_kinds() {
        assert_eq!(HitKind::of(&event(Kind::Metadata)), HitKind::Profile);
        assert_eq!(HitKind::of(&event(Kind::TextNote)), HitKind::Note);
        assert_eq!(HitKind::of(&event(Kind::from(1063))), HitKind::File);
        assert_eq!(HitKind::of(&event(Kind::from(9802))), HitKind::Highlight);
        assert_eq!(HitKind::of(&event(Kind::from(30023))), HitKind::Article);
        assert_eq!(HitKind::of(&event(Kind::from(7))), HitKind::Other);
    }

    #[test]
    fn filter_narrows_results() {
        let events = vec![event(Kind::Metadata), event(Kind::TextNote), event(Kind::TextNote)];
        assert_eq!(ResultFilter::All.apply(&events).len(), 3);
        assert_eq!(ResultFilter::Only(HitKind::Note).apply(&events).len(), 2);
        assert_eq!(ResultFilter::Only(HitKind::File).apply(&events).len(), 0);
    }
}
