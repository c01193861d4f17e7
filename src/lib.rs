//! # usenet-indexer
//!
//! Usenet binary indexer: scans newsgroup overviews over NNTP, reassembles
//! multi-part binary postings, classifies them into a category tree and
//! publishes searchable releases with NZB index files.
//!
//! ## Pipeline
//!
//! 1. **Scan** - per-group workers read overview blocks and turn every
//!    `(n/total)` subject into a segment of a Part
//! 2. **Assemble** - ordered regex rules give each Part a Binary name and part
//!    number; Parts sharing a name merge into one Binary
//! 3. **Promote** - complete Binaries with enough archive volumes get an NZB,
//!    a category and a Release row
//! 4. **Sweep** - Binaries and Parts idle for too long are dropped
//!
//! ## Design Philosophy
//!
//! usenet-indexer is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Re-runnable** - Every phase is idempotent; an interrupted cycle is simply run again
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use usenet_indexer::{Config, Indexer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         servers: vec![ServerConfig {
//!             host: "news.example.com".to_string(),
//!             port: 563,
//!             tls: true,
//!             username: Some("user".to_string()),
//!             password: Some("pass".to_string()),
//!         }],
//!         groups: vec!["alt.binaries.teevee".to_string()],
//!         ..Default::default()
//!     };
//!
//!     let indexer = Indexer::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = indexer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let stats = indexer.run_cycle().await?;
//!     println!("{} releases created", stats.promotion.created);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Index artifact (NZB) construction and storage
pub mod artifact;
/// Part to Binary assembly
pub mod assembler;
/// Category taxonomy and classifier
pub mod categories;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Indexer orchestration
pub mod indexer;
/// Nested map merging
pub mod merge;
/// News server sessions and date bisection
pub mod nntp;
/// Completion detection and release promotion
pub mod releases;
/// Retry logic with exponential backoff
pub mod retry;
/// Overview scanning
pub mod scanner;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use artifact::{ArtifactStore, FsArtifactStore, IndexArtifact};
pub use assembler::Assembler;
pub use categories::{CategoryRules, Classifier};
pub use config::{Config, ServerConfig};
pub use db::Database;
pub use error::{DatabaseError, Error, Result, ScanError};
pub use indexer::{Indexer, ScanMode};
pub use nntp::{MemoryNewsServer, NewsSource, NntpSessionFactory, SessionFactory};
pub use releases::Promoter;
pub use scanner::Scanner;
pub use types::{
    Binary, CategoryId, CycleStats, Event, Part, ReleaseId, ReleaseStatus, ScanStats, Segment,
};

/// Helper function to run the indexer with graceful signal handling.
///
/// Runs indexing cycles until a termination signal arrives, then lets the
/// current cycle finish and calls the indexer's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use usenet_indexer::{Config, Indexer, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_file(std::path::Path::new("indexer.json"))?;
///     let indexer = Indexer::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(indexer).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(indexer: Indexer) -> Result<()> {
    let cancel = tokio_util::sync::CancellationToken::new();
    let runner = {
        let indexer = indexer.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { indexer.run(cancel).await })
    };

    wait_for_signal().await;
    cancel.cancel();

    let result = runner
        .await
        .map_err(|e| Error::Other(format!("indexer run loop panicked: {}", e)))?;
    indexer.shutdown().await?;
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
