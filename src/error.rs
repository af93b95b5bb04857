// src/error.rs
//! Error surfaces. Only [`SearchError`] reaches the caller; everything a
//! source can fail with is classified as a [`SourceError`], logged, and
//! converted to an empty result inside the aggregator wrapper.

use thiserror::Error;

/// Caller-facing failures of `Aggregator::search`.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query was empty after trimming; no adapters were dispatched.
    #[error("search query must not be empty")]
    InvalidInput,
}

/// Adapter-internal failure classification. These never propagate past the
/// per-source wrapper; they exist so diagnostics name the failure kind.
#[derive(Debug, Error)]
pub enum SourceError {
    /// DNS, TCP, TLS, or client-side timeout.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The per-call deadline elapsed before the response arrived.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Non-2xx status, missing expected field, or an anti-bot interstitial.
    #[error("protocol failure: {0}")]
    Protocol(String),

    /// The shared browser session failed to initialize or was closed.
    #[error("browser session unavailable")]
    BrowserUnavailable,

    /// The global deadline cancelled this source mid-flight.
    #[error("cancelled by deadline")]
    Cancelled,
}

impl SourceError {
    /// Short tag for metrics labels and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Transport(_) => "transport",
            SourceError::Timeout(_) => "transport",
            SourceError::Protocol(_) => "protocol",
            SourceError::BrowserUnavailable => "browser_unavailable",
            SourceError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_survive_anyhow_wrapping() {
        // Adapters hand errors to the aggregator as anyhow::Error; the
        // metrics label is recovered by downcast.
        let err: anyhow::Error = SourceError::Protocol("HTTP 500".into()).into();
        let kind = err
            .downcast_ref::<SourceError>()
            .map(SourceError::kind)
            .unwrap_or("other");
        assert_eq!(kind, "protocol");

        let timeout = SourceError::Timeout(std::time::Duration::from_secs(30));
        assert_eq!(timeout.kind(), "transport");
        assert_eq!(SourceError::BrowserUnavailable.kind(), "browser_unavailable");
        assert_eq!(SourceError::Cancelled.kind(), "cancelled");
    }
}
