//! Core types for usenet-indexer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::merge::Merge;

/// Identifier of a category in the taxonomy (e.g. 5040 = TV/HD)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl CategoryId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for CategoryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for CategoryId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for CategoryId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for CategoryId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Opaque, randomly generated release identifier (32 lowercase hex characters)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(pub String);

impl ReleaseId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 16] = rand::thread_rng().r#gen();
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One NNTP article contributing a byte range to a Part
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment number within the Part (1-based)
    pub number: u32,
    /// Message-ID used to fetch the article body
    pub message_id: String,
    /// Article size in bytes as reported by the overview
    pub bytes: u64,
}

// A given segment number of a given subject is physically one article,
// so the first copy written is kept.
impl Merge for Segment {
    fn merge(&mut self, _newer: Self) {}
}

/// The reconstructed set of segments for one subject
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Subject with the `(n/total)` segment marker removed
    pub subject: String,
    /// Newsgroup the segments were read from
    pub group_name: String,
    /// Poster (From header)
    pub poster: String,
    /// Earliest post date seen for this Part
    pub posted: DateTime<Utc>,
    /// Declared number of segments
    pub total_segments: u32,
    /// Segments received so far, keyed by segment number
    pub segments: BTreeMap<u32, Segment>,
}

impl Part {
    /// Number of segments actually present
    pub fn available_segments(&self) -> usize {
        self.segments.len()
    }

    /// Whether every declared segment has been received
    pub fn is_complete(&self) -> bool {
        self.segments.len() as u64 >= u64::from(self.total_segments)
    }

    /// Sum of segment sizes in bytes
    pub fn total_bytes(&self) -> u64 {
        self.segments.values().map(|s| s.bytes).sum()
    }
}

impl Merge for Part {
    fn merge(&mut self, newer: Self) {
        self.segments.merge(newer.segments);
        self.poster = newer.poster;
        self.total_segments = newer.total_segments;
        self.posted = self.posted.min(newer.posted);
    }
}

/// A Part as referenced from a Binary's part map
///
/// `sources` holds the store ids of every Part row that resolved to this part
/// number; on persistence they are folded into one row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinaryPart {
    /// Subject of the newest contributing Part
    pub subject: String,
    /// Declared segment count of the newest contributing Part
    pub total_segments: u32,
    /// Earliest post date among contributing Parts
    pub posted: DateTime<Utc>,
    /// Store ids of the contributing Part rows
    pub sources: BTreeSet<i64>,
}

impl Merge for BinaryPart {
    fn merge(&mut self, newer: Self) {
        self.sources.merge(newer.sources);
        self.subject = newer.subject;
        self.total_segments = newer.total_segments;
        self.posted = self.posted.min(newer.posted);
    }
}

/// A release candidate: every Part sharing a resolved name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    /// Resolved release-candidate name (the Binary key)
    pub name: String,
    /// Newsgroup the first Part was seen in
    pub group_name: String,
    /// Poster of the newest Part
    pub poster: String,
    /// Earliest post date among Parts
    pub posted: DateTime<Utc>,
    /// Category hint from the matching rule, recorded on creation only
    pub category_hint: Option<CategoryId>,
    /// Id of the rule that produced the Binary, recorded on creation only
    pub rule_id: Option<i64>,
    /// Request id captured by the rule, if any
    pub req_id: Option<String>,
    /// Declared number of parts (0 for postings without a part counter)
    pub total_parts: u32,
    /// Parts keyed by part number
    pub parts: BTreeMap<u32, BinaryPart>,
}

impl Merge for Binary {
    fn merge(&mut self, newer: Self) {
        self.parts.merge(newer.parts);
        self.poster = newer.poster;
        self.posted = self.posted.min(newer.posted);
        self.total_parts = newer.total_parts;
        if self.req_id.is_none() {
            self.req_id = newer.req_id;
        }
    }
}

/// Release lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseStatus {
    /// Promoted and awaiting enrichment
    Pending,
    /// Enriched and fully searchable
    Processed,
}

impl ReleaseStatus {
    /// Convert integer status code to ReleaseStatus
    pub fn from_i32(status: i32) -> Self {
        match status {
            1 => ReleaseStatus::Processed,
            _ => ReleaseStatus::Pending,
        }
    }

    /// Convert ReleaseStatus to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ReleaseStatus::Pending => 0,
            ReleaseStatus::Processed => 1,
        }
    }
}

/// Counters for one group scan
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Overview rows received from the server
    pub received: u64,
    /// Rows that were not binary segments (no marker, no size)
    pub ignored: u64,
    /// Rows dropped by a blacklist rule
    pub blacklisted: u64,
    /// Segments handed to the Part Store
    pub segments: u64,
    /// Blocks scanned successfully
    pub blocks: u64,
    /// Blocks skipped after exhausting retries
    pub failed_blocks: u64,
}

impl ScanStats {
    /// Add another scan's counters to this one
    pub fn absorb(&mut self, other: &ScanStats) {
        self.received += other.received;
        self.ignored += other.ignored;
        self.blacklisted += other.blacklisted;
        self.segments += other.segments;
        self.blocks += other.blocks;
        self.failed_blocks += other.failed_blocks;
    }
}

/// Counters for one assembly pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// Parts examined
    pub parts_seen: u64,
    /// Parts merged into a Binary
    pub parts_assembled: u64,
    /// Parts that matched no rule
    pub unmatched: u64,
    /// Parts held back until their part counter can be guessed
    pub deferred: u64,
    /// Binaries created or updated
    pub binaries: u64,
    /// Rules retired because they failed at match time
    pub rules_retired: u64,
}

/// Counters for one promotion pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionStats {
    /// Binaries examined
    pub examined: u64,
    /// Binaries still accumulating
    pub accumulating: u64,
    /// Releases newly created
    pub created: u64,
    /// Existing releases refreshed by a re-promotion
    pub refreshed: u64,
    /// Binaries discarded by the minimum-archive policy
    pub discarded: u64,
    /// Binaries skipped because their artifact could not be built
    pub failed: u64,
}

/// Counters for one full indexing cycle
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Scan counters summed over all groups
    pub scan: ScanStats,
    /// Groups whose scan failed outright
    pub failed_groups: u64,
    /// Assembly counters
    pub assembly: AssemblyStats,
    /// Promotion counters
    pub promotion: PromotionStats,
    /// Binaries removed by housekeeping
    pub dead_binaries: u64,
    /// Unassigned parts removed by housekeeping
    pub dead_parts: u64,
}

/// Events emitted by the indexer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A group scan started
    ScanStarted {
        /// Newsgroup name
        group: String,
        /// Whether this is a backfill (backwards) scan
        backfill: bool,
    },

    /// An overview block was skipped after exhausting its retries
    BlockSkipped {
        /// Newsgroup name
        group: String,
        /// First article number of the block
        start: u64,
        /// Last article number of the block
        end: u64,
        /// Last error seen
        error: String,
    },

    /// A group scan finished
    GroupScanned {
        /// Newsgroup name
        group: String,
        /// Counters for the scan
        stats: ScanStats,
    },

    /// A Binary was discarded by a promotion policy
    BinaryDiscarded {
        /// Binary name
        name: String,
        /// Why it was discarded
        reason: String,
    },

    /// A Release was created or refreshed
    ReleaseCreated {
        /// Release id
        id: ReleaseId,
        /// Release search name
        search_name: String,
        /// Resolved leaf category
        category: CategoryId,
        /// False when an existing release with the same key was refreshed
        new: bool,
    },

    /// A full indexing cycle finished
    CycleComplete {
        /// Counters for the cycle
        stats: CycleStats,
    },

    /// The indexer is shutting down
    Shutdown,
}
