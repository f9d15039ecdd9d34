//! Error types for the reconciliation engine.

use thiserror::Error;

/// Errors produced by the reconciliation engine.
///
/// There are no automatic retries anywhere in the engine; every variant
/// aborts the current run and the next scheduled run re-evaluates from
/// scratch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required configuration value is absent. Raised before any
    /// remote call is made.
    #[error("required configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    /// The signer roster could not be read or is malformed. Raised
    /// before verification begins.
    #[error("signer roster unavailable: {0}")]
    RosterUnavailable(String),

    /// A listing, label, patch, or comment call against the hosting
    /// provider failed. Aborts the remainder of the run.
    #[error("pull request source unavailable: {context}")]
    SourceUnavailable { context: String },

    /// A PR's patch text has no parsable `From: Name <email>` line.
    /// Aborts the run; the behavior is deliberately strict rather than
    /// skipping the PR.
    #[error("no author email found in patch for PR #{number}")]
    EmailNotFound { number: u64 },
}

impl EngineError {
    /// Wrap a provider-side failure with request context.
    pub fn source(context: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            context: context.into(),
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        Self::SourceUnavailable {
            context: err.to_string(),
        }
    }
}
