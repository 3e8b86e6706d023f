// ABOUTME: Error types for the pagelens engine: PageError from page backends and FetchError for callers.
// ABOUTME: FetchError carries the retry guidance computed by the classifier alongside its source.

use std::fmt;
use std::time::Duration;

use crate::classify::{ErrorClassification, ErrorKind};

/// Failure reported by a page backend.
///
/// Backends normalise whatever their driver throws into one of these variants
/// before returning. Drivers that only hand back a message (the DevTools
/// protocol does) use `Other`, which the classifier inspects textually.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("navigation timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),
    #[error("net::{0}")]
    Network(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("HTTP status {status}")]
    Http { status: u16 },
    #[error("blocked: {0}")]
    Blocked(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("{0}")]
    Other(String),
}

impl PageError {
    /// Wrap an arbitrary driver error as an untyped failure.
    pub fn other(err: impl fmt::Display) -> Self {
        PageError::Other(err.to_string())
    }

    /// Returns true if this is a navigation timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PageError::Timeout(_))
    }
}

/// The error returned by a fetch: the page failure plus how the caller should react.
#[derive(Debug, Clone, thiserror::Error)]
pub struct FetchError {
    pub url: String,
    pub attempt: u32,
    pub classification: ErrorClassification,
    #[source]
    pub source: PageError,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pagelens: fetch {}: {}: {}",
            self.url, self.classification.kind, self.source
        )
    }
}

impl FetchError {
    /// Classify `source` for the given attempt and wrap it.
    pub fn new(url: impl Into<String>, attempt: u32, source: PageError) -> Self {
        let classification = ErrorClassification::classify(&source, attempt);
        Self {
            url: url.into(),
            attempt,
            classification,
            source,
        }
    }

    /// The classified failure kind.
    pub fn kind(&self) -> ErrorKind {
        self.classification.kind
    }

    /// Returns true if the classifier suggests another attempt.
    pub fn should_retry(&self) -> bool {
        self.classification.should_retry
    }

    /// Suggested pause before the next attempt.
    pub fn retry_delay(&self) -> Duration {
        self.classification.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FallbackStrategy;

    #[test]
    fn display_includes_url_kind_and_source() {
        let err = FetchError::new(
            "https://example.com/a",
            1,
            PageError::Timeout(Duration::from_millis(30_000)),
        );
        assert_eq!(
            err.to_string(),
            "pagelens: fetch https://example.com/a: timeout: navigation timeout of 30000ms exceeded"
        );
    }

    #[test]
    fn new_attaches_classification() {
        let err = FetchError::new("https://example.com", 1, PageError::Http { status: 403 });
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(!err.should_retry());
        assert_eq!(err.retry_delay(), Duration::ZERO);
        assert_eq!(err.classification.fallback_strategy, FallbackStrategy::None);
    }

    #[test]
    fn network_display_keeps_net_prefix() {
        let err = PageError::Network("ERR_CONNECTION_REFUSED".into());
        assert_eq!(err.to_string(), "net::ERR_CONNECTION_REFUSED");
    }
}
