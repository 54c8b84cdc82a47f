//! Error types for the calendar sync pipeline.
//!
//! Fetch and parse failures are expected (feeds are run by third parties)
//! and are recorded on the connection. Store failures come from our own
//! database and carry the underlying `anyhow` chain.

use thiserror::Error;

/// Why a calendar feed could not be retrieved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request exceeded the fetch time budget
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status
    #[error("HTTP {status}: feed server returned an error status")]
    Status { status: u16 },

    /// DNS, TLS, connection or body read failure
    #[error("network error: {0}")]
    Network(String),
}

/// Why a feed body was not recognised as a calendar at all.
///
/// Individual malformed events are never reported here; they are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("not an iCalendar feed: missing BEGIN:VCALENDAR")]
    NotACalendar,
}

/// Failure of a single connection's sync
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl SyncError {
    /// Fetch and parse failures are recorded on the connection record.
    pub fn is_feed_error(&self) -> bool {
        matches!(self, SyncError::Fetch(_) | SyncError::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_is_distinct() {
        assert_eq!(FetchError::Timeout.to_string(), "request timed out");
        assert_ne!(
            FetchError::Network("connection refused".to_string()).to_string(),
            FetchError::Timeout.to_string()
        );
    }

    #[test]
    fn test_status_message_embeds_code() {
        let message = FetchError::Status { status: 503 }.to_string();
        assert!(message.contains("503"), "{}", message);
    }

    #[test]
    fn test_sync_error_classification() {
        assert!(SyncError::from(FetchError::Timeout).is_feed_error());
        assert!(SyncError::from(ParseError::NotACalendar).is_feed_error());
        assert!(!SyncError::from(anyhow::anyhow!("pool exhausted")).is_feed_error());
    }

    #[test]
    fn test_sync_error_passes_through_feed_message() {
        let err = SyncError::from(FetchError::Timeout);
        assert_eq!(err.to_string(), "request timed out");
    }
}
