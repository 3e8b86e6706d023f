// ABOUTME: Closed failure taxonomy with retry guidance for failed fetches.
// ABOUTME: Maps PageError values (typed or message-only) to ErrorClassification; never retries itself.

//! Error classification.
//!
//! Every failure caught while driving a page is normalised into an
//! [`ErrorClassification`] before any further branching. The classification
//! only annotates the error; executing a retry is the caller's business.
//!
//! | kind       | retry         | delay           | fallback             |
//! |------------|---------------|-----------------|----------------------|
//! | timeout    | attempt < 3   | 2000ms × attempt| simplified-selectors |
//! | network    | attempt < 2   | 5000ms          | cached-content       |
//! | navigation | always        | 1000ms          | direct-fetch         |
//! | forbidden  | never         | 0               | none                 |
//! | extraction | never         | 0               | basic-selectors      |
//! | unknown    | never         | 0               | none                 |
//!
//! HTTP statuses: 401 and 403 are `forbidden`; 408, 429 and 5xx are transient
//! and count as `navigation`; any other status is permanent and `unknown`, as
//! is a URL that cannot be fetched at all.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PageError;

/// Failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Timeout,
    Network,
    Navigation,
    Forbidden,
    Extraction,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::Navigation => "navigation",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// What a caller can try instead of repeating the same request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
    SimplifiedSelectors,
    CachedContent,
    DirectFetch,
    BasicSelectors,
    None,
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FallbackStrategy::SimplifiedSelectors => "simplified-selectors",
            FallbackStrategy::CachedContent => "cached-content",
            FallbackStrategy::DirectFetch => "direct-fetch",
            FallbackStrategy::BasicSelectors => "basic-selectors",
            FallbackStrategy::None => "none",
        };
        write!(f, "{}", s)
    }
}

/// Retry guidance derived from a caught failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorClassification {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub should_retry: bool,
    #[serde(rename = "delayMs", with = "crate::duration_ms")]
    pub delay: Duration,
    pub fallback_strategy: FallbackStrategy,
}

impl ErrorClassification {
    /// Classify a page failure observed on the given 1-based attempt.
    pub fn classify(err: &PageError, attempt: u32) -> Self {
        Self::for_kind(kind_of(err), attempt)
    }

    /// The table row for `kind` at `attempt`.
    pub fn for_kind(kind: ErrorKind, attempt: u32) -> Self {
        let (should_retry, delay, fallback_strategy) = match kind {
            ErrorKind::Timeout => (
                attempt < 3,
                Duration::from_millis(2000 * u64::from(attempt)),
                FallbackStrategy::SimplifiedSelectors,
            ),
            ErrorKind::Network => (
                attempt < 2,
                Duration::from_millis(5000),
                FallbackStrategy::CachedContent,
            ),
            ErrorKind::Navigation => (
                true,
                Duration::from_millis(1000),
                FallbackStrategy::DirectFetch,
            ),
            ErrorKind::Forbidden => (false, Duration::ZERO, FallbackStrategy::None),
            ErrorKind::Extraction => (false, Duration::ZERO, FallbackStrategy::BasicSelectors),
            ErrorKind::Unknown => (false, Duration::ZERO, FallbackStrategy::None),
        };
        Self {
            kind,
            should_retry,
            delay,
            fallback_strategy,
        }
    }
}

fn kind_of(err: &PageError) -> ErrorKind {
    match err {
        PageError::Timeout(_) => ErrorKind::Timeout,
        PageError::Network(_) => ErrorKind::Network,
        PageError::Http { status: 401 | 403 } | PageError::Blocked(_) => ErrorKind::Forbidden,
        PageError::Http {
            status: 408 | 429 | 500..=599,
        }
        | PageError::Navigation(_) => ErrorKind::Navigation,
        PageError::Http { .. } | PageError::InvalidUrl(_) => ErrorKind::Unknown,
        PageError::Extraction(_) => ErrorKind::Extraction,
        PageError::Other(message) => kind_from_message(message),
    }
}

/// Message heuristics for drivers that only report text.
fn kind_from_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        ErrorKind::Timeout
    } else if lower.contains("net::") {
        ErrorKind::Network
    } else if lower.contains("forbidden") || lower.contains("403") {
        ErrorKind::Forbidden
    } else if lower.contains("navigat") {
        ErrorKind::Navigation
    } else if lower.contains("extract") || lower.contains("selector") {
        ErrorKind::Extraction
    } else {
        ErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn timeout_retries_until_third_attempt() {
        let err = PageError::Timeout(ms(30_000));
        let first = ErrorClassification::classify(&err, 1);
        assert_eq!(first.kind, ErrorKind::Timeout);
        assert!(first.should_retry);
        assert_eq!(first.delay, ms(2000));
        assert_eq!(first.fallback_strategy, FallbackStrategy::SimplifiedSelectors);

        let second = ErrorClassification::classify(&err, 2);
        assert!(second.should_retry);
        assert_eq!(second.delay, ms(4000));

        let third = ErrorClassification::classify(&err, 3);
        assert!(!third.should_retry);
        assert_eq!(third.delay, ms(6000));
    }

    #[test]
    fn network_retries_only_once() {
        let err = PageError::Network("ERR_CONNECTION_RESET".into());
        let first = ErrorClassification::classify(&err, 1);
        assert_eq!(first.kind, ErrorKind::Network);
        assert!(first.should_retry);
        assert_eq!(first.delay, ms(5000));
        assert_eq!(first.fallback_strategy, FallbackStrategy::CachedContent);
        assert!(!ErrorClassification::classify(&err, 2).should_retry);
    }

    #[test]
    fn navigation_always_retries() {
        let err = PageError::Navigation("frame detached".into());
        for attempt in 1..=5 {
            let c = ErrorClassification::classify(&err, attempt);
            assert_eq!(c.kind, ErrorKind::Navigation);
            assert!(c.should_retry);
            assert_eq!(c.delay, ms(1000));
            assert_eq!(c.fallback_strategy, FallbackStrategy::DirectFetch);
        }
    }

    #[test]
    fn forbidden_is_terminal() {
        for err in [
            PageError::Http { status: 403 },
            PageError::Http { status: 401 },
            PageError::Blocked("private address".into()),
            PageError::Other("Request forbidden by policy".into()),
        ] {
            let c = ErrorClassification::classify(&err, 1);
            assert_eq!(c.kind, ErrorKind::Forbidden, "{err}");
            assert!(!c.should_retry);
            assert_eq!(c.delay, Duration::ZERO);
            assert_eq!(c.fallback_strategy, FallbackStrategy::None);
        }
    }

    #[test]
    fn transient_http_status_is_navigation() {
        for status in [408, 429, 500, 502, 503] {
            let c = ErrorClassification::classify(&PageError::Http { status }, 1);
            assert_eq!(c.kind, ErrorKind::Navigation, "{status}");
            assert!(c.should_retry);
        }
    }

    #[test]
    fn permanent_failures_stop_retrying() {
        for err in [
            PageError::Http { status: 400 },
            PageError::Http { status: 404 },
            PageError::Http { status: 410 },
            PageError::InvalidUrl("not a url".into()),
        ] {
            let c = ErrorClassification::classify(&err, 1);
            assert_eq!(c.kind, ErrorKind::Unknown, "{err}");
            assert!(!c.should_retry);
            assert_eq!(c.delay, Duration::ZERO);
            assert_eq!(c.fallback_strategy, FallbackStrategy::None);
        }
    }

    #[test]
    fn extraction_suggests_basic_selectors() {
        let c = ErrorClassification::classify(&PageError::Extraction("no body".into()), 1);
        assert_eq!(c.kind, ErrorKind::Extraction);
        assert!(!c.should_retry);
        assert_eq!(c.fallback_strategy, FallbackStrategy::BasicSelectors);
    }

    #[test]
    fn message_heuristics() {
        let cases = [
            ("Navigation timeout of 30000 ms exceeded", ErrorKind::Timeout),
            ("net::ERR_NAME_NOT_RESOLVED at https://x.test", ErrorKind::Network),
            ("HTTP 403", ErrorKind::Forbidden),
            ("Navigating frame was detached", ErrorKind::Navigation),
            ("failed to extract title", ErrorKind::Extraction),
            ("something odd happened", ErrorKind::Unknown),
        ];
        for (message, expected) in cases {
            let c = ErrorClassification::classify(&PageError::Other(message.into()), 1);
            assert_eq!(c.kind, expected, "{message}");
        }
    }

    #[test]
    fn unknown_is_terminal() {
        let c = ErrorClassification::for_kind(ErrorKind::Unknown, 1);
        assert!(!c.should_retry);
        assert_eq!(c.fallback_strategy, FallbackStrategy::None);
    }

    #[test]
    fn serializes_with_wire_names() {
        let c = ErrorClassification::for_kind(ErrorKind::Timeout, 2);
        let json = serde_json::to_value(c).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "timeout",
                "shouldRetry": true,
                "delayMs": 4000,
                "fallbackStrategy": "simplified-selectors"
            })
        );
    }
}
