//! Typed errors for the search pipeline.
//!
//! None of these reach the presentation layer: the orchestrator turns
//! them into "continue with the unresolved token" or "commit nothing".

use thiserror::Error;

/// Failure of the relay query primitive.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The invocation was superseded. Not a failure.
    #[error("query aborted")]
    Aborted,
    #[error("relay backend failed: {0}")]
    Backend(#[from] anyhow::Error),
}

impl QueryError {
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Failure to turn an author token into a public key.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolution of {token:?} exceeded {timeout_ms}ms")]
    Timeout { token: String, timeout_ms: u64 },
    #[error("no profile found for {0:?}")]
    NotFound(String),
    #[error("identity service error: {0}")]
    Service(#[from] anyhow::Error),
}
