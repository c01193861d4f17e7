//! Error types for usenet-indexer
//!
//! This module provides the error taxonomy for the library:
//! - Domain-specific error types (database, scanning)
//! - Machine-readable error codes for log correlation
//! - Context information (group, article range, binary name)

use thiserror::Error;

/// Result type alias for usenet-indexer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for usenet-indexer
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues and re-run the failed unit of work.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "scan.update_threads")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// NNTP protocol or connection error
    #[error("NNTP error: {0}")]
    Nntp(#[from] nntp_rs::NntpError),

    /// Overview scanning error
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Index artifact could not be built or stored
    #[error("index artifact error: {0}")]
    Artifact(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - no new cycles are started
    #[error("shutdown in progress: not starting new cycles")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Overview scanning errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// The server does not carry the group or refused to select it
    #[error("group {group} is unavailable: {reason}")]
    GroupUnavailable {
        /// Newsgroup name
        group: String,
        /// Server-supplied reason
        reason: String,
    },

    /// An overview block could not be fetched after all retries
    #[error("overview block {start}-{end} of {group} failed: {reason}")]
    BlockFailed {
        /// Newsgroup name
        group: String,
        /// First article number of the block
        start: u64,
        /// Last article number of the block
        end: u64,
        /// Last error seen for the block
        reason: String,
    },

    /// No article carries a usable date, so the bisection has nothing to probe
    #[error("no dated articles available in {group}")]
    DateUnavailable {
        /// Newsgroup name
        group: String,
    },
}

impl Error {
    /// Machine-readable error code, suitable for structured log fields
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Nntp(_) => "nntp_error",
            Error::Scan(e) => match e {
                ScanError::GroupUnavailable { .. } => "group_unavailable",
                ScanError::BlockFailed { .. } => "block_failed",
                ScanError::DateUnavailable { .. } => "date_unavailable",
            },
            Error::Artifact(_) => "artifact_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether the error came from the local store rather than the news server
    ///
    /// Store failures abort the phase they occur in; server failures are
    /// confined to the group or block that hit them.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Sqlx(_))
    }

    /// Shorthand for a configuration error tied to a key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Shorthand for a query failure with context
    pub(crate) fn query(context: &str, e: impl std::fmt::Display) -> Self {
        Error::Database(DatabaseError::QueryFailed(format!("{}: {}", context, e)))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_for_every_variant() {
        let cases: Vec<(Error, &str)> = vec![
            (Error::config("scan.update_threads", "must be > 0"), "config_error"),
            (
                Error::Database(DatabaseError::QueryFailed("locked".into())),
                "database_error",
            ),
            (Error::Nntp(nntp_rs::NntpError::Timeout), "nntp_error"),
            (
                Error::Scan(ScanError::GroupUnavailable {
                    group: "alt.binaries.test".into(),
                    reason: "411".into(),
                }),
                "group_unavailable",
            ),
            (
                Error::Scan(ScanError::BlockFailed {
                    group: "alt.binaries.test".into(),
                    start: 1,
                    end: 100,
                    reason: "timeout".into(),
                }),
                "block_failed",
            ),
            (
                Error::Scan(ScanError::DateUnavailable {
                    group: "alt.binaries.test".into(),
                }),
                "date_unavailable",
            ),
            (Error::Artifact("disk full".into()), "artifact_error"),
            (Error::NotFound("release abc".into()), "not_found"),
            (Error::ShuttingDown, "shutting_down"),
            (Error::Other("boom".into()), "internal_error"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.code(), expected, "wrong code for {error:?}");
        }
    }

    #[test]
    fn block_failure_message_carries_rerun_context() {
        let err = Error::Scan(ScanError::BlockFailed {
            group: "alt.binaries.teevee".into(),
            start: 1000,
            end: 2999,
            reason: "connection reset".into(),
        });

        let msg = err.to_string();
        assert!(msg.contains("alt.binaries.teevee"));
        assert!(msg.contains("1000-2999"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn only_store_errors_are_store_failures() {
        assert!(Error::query("Failed to upsert part", "disk I/O error").is_store_failure());
        assert!(Error::Sqlx(sqlx::Error::PoolClosed).is_store_failure());
        assert!(!Error::Nntp(nntp_rs::NntpError::Timeout).is_store_failure());
        assert!(
            !Error::Scan(ScanError::GroupUnavailable {
                group: "alt.binaries.test".into(),
                reason: "411".into(),
            })
            .is_store_failure()
        );
    }

    #[test]
    fn config_helper_records_key() {
        match Error::config("postprocess.min_completion", "out of range") {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("postprocess.min_completion"));
                assert_eq!(message, "out of range");
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }
}
