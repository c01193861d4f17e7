//! News server access
//!
//! The scanner and the bisection only ever talk to a [`NewsSource`]: one
//! stateful connection with a selected group. [`NntpSession`] is the production
//! implementation on top of `nntp-rs`; [`MemoryNewsServer`] serves articles from
//! memory for replaying captured overviews.

mod bisect;
mod memory;
mod session;

pub use bisect::date_to_article_number;
pub use memory::{MemoryNewsServer, MemorySession};
pub use session::{NntpSession, NntpSessionFactory};

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article range of the selected group as reported by GROUP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRange {
    /// Estimated number of articles
    pub count: u64,
    /// Lowest article number
    pub first: u64,
    /// Highest article number
    pub last: u64,
}

impl GroupRange {
    /// Whether the group holds no articles
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.last < self.first
    }
}

/// One overview (OVER/XOVER) row with headers already decoded
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverviewRow {
    /// Article number within the group
    pub article_number: u64,
    /// Decoded subject
    pub subject: String,
    /// Decoded From header
    pub poster: String,
    /// Parsed Date header, if it could be parsed
    pub date: Option<DateTime<Utc>>,
    /// Message-ID including angle brackets
    pub message_id: String,
    /// Article size in bytes (0 when the server omitted it)
    pub bytes: u64,
}

/// A single connection to a news server
///
/// Implementations keep one live connection and remember the selected group.
/// Reconnection after a dropped connection is the implementation's business;
/// retry and backoff belong to the caller.
#[async_trait::async_trait]
pub trait NewsSource: Send {
    /// Select a group and return its article range
    async fn select_group(&mut self, group: &str) -> Result<GroupRange>;

    /// Fetch overview rows for the inclusive range `start..=end` of the selected group
    async fn fetch_overview(&mut self, start: u64, end: u64) -> Result<Vec<OverviewRow>>;

    /// Post date of one article; `None` when the article is missing or undated
    async fn article_date(&mut self, article_number: u64) -> Result<Option<DateTime<Utc>>>;

    /// Current time on the server (DATE); defaults to the local clock
    async fn server_time(&mut self) -> Result<DateTime<Utc>> {
        Ok(Utc::now())
    }
}

/// Opens [`NewsSource`] connections, one per scan worker
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open and authenticate a new connection
    async fn open(&self) -> Result<Box<dyn NewsSource>>;
}
