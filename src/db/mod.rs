//! Database layer for usenet-indexer
//!
//! Handles SQLite persistence for groups, parts, binaries, releases and the
//! rule tables. The store is the only state shared between scan workers.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations, seed data
//! - [`groups`] - Newsgroup activation and scanned-range bookkeeping
//! - [`parts`] - Part Store upserts, unassigned-part paging, stale sweeps
//! - [`binaries`] - Binary upserts, part attachment, completion aggregates
//! - [`releases`] - Release upserts keyed by (search_name, posted)
//! - [`rules`] - Assembly regexes and blacklists
//! - [`categories`] - Category tree lookups

use crate::types::{CategoryId, ReleaseStatus};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod binaries;
mod categories;
mod groups;
mod migrations;
mod parts;
mod releases;
mod rules;

/// SQLite's default SQLITE_MAX_VARIABLE_NUMBER is 999; bulk statements stay below it.
const MAX_BIND_VARIABLES: usize = 999;

/// Part lifecycle markers stored in `parts.state`
pub mod part_state {
    /// Waiting for the assembler
    pub const UNASSIGNED: i32 = 0;
    /// Attached to a Binary
    pub const ASSIGNED: i32 = 1;
    /// No rule produced a name; kept until aged out
    pub const UNMATCHED: i32 = 2;
}

/// Newsgroup record from database
#[derive(Debug, Clone, FromRow)]
pub struct GroupRecord {
    /// Unique database ID
    pub id: i64,
    /// Newsgroup name
    pub name: String,
    /// Whether the group is scanned (0 = no, 1 = yes)
    pub active: i32,
    /// Lowest article number scanned so far
    pub first_article: Option<i64>,
    /// Highest article number scanned so far
    pub last_article: Option<i64>,
    /// Unix timestamp of the last completed update
    pub last_updated: Option<i64>,
}

impl GroupRecord {
    /// Whether the group has never been scanned
    pub fn is_new(&self) -> bool {
        self.last_article.is_none()
    }
}

/// Part record from database (segments not loaded)
#[derive(Debug, Clone, FromRow)]
pub struct PartRow {
    /// Unique database ID
    pub id: i64,
    /// Stripped subject
    pub subject: String,
    /// Newsgroup the part was read from
    pub group_name: String,
    /// Poster
    pub poster: String,
    /// Unix timestamp of the earliest segment
    pub posted: i64,
    /// Declared segment count
    pub total_segments: i64,
    /// Owning binary, once assembled
    pub binary_id: Option<i64>,
    /// Part number within the owning binary
    pub part_number: Option<i64>,
    /// Lifecycle marker (see [`part_state`])
    pub state: i32,
    /// Unix timestamp of the last segment upsert
    pub updated_at: i64,
}

impl PartRow {
    /// Post date as a UTC timestamp
    pub fn posted_at(&self) -> DateTime<Utc> {
        from_unix(self.posted)
    }
}

/// Segment record from database
#[derive(Debug, Clone, FromRow)]
pub struct SegmentRow {
    /// Owning part
    pub part_id: i64,
    /// Segment number
    pub number: i64,
    /// Message-ID
    pub message_id: String,
    /// Size in bytes
    pub bytes: i64,
}

/// A part together with its segments, ordered by segment number
#[derive(Debug, Clone)]
pub struct PartWithSegments {
    /// The part record
    pub part: PartRow,
    /// Its segments
    pub segments: Vec<SegmentRow>,
}

/// Binary record from database
#[derive(Debug, Clone, FromRow)]
pub struct BinaryRow {
    /// Unique database ID
    pub id: i64,
    /// Resolved name (unique)
    pub name: String,
    /// Newsgroup
    pub group_name: String,
    /// Poster
    pub poster: String,
    /// Unix timestamp of the earliest part
    pub posted: i64,
    /// Category hint from the creating rule
    pub category_id: Option<CategoryId>,
    /// Creating rule
    pub regex_id: Option<i64>,
    /// Request id
    pub req_id: Option<String>,
    /// Declared number of parts
    pub total_parts: i64,
    /// Unix timestamp of creation
    pub created_at: i64,
    /// Unix timestamp of the last part attachment
    pub updated_at: i64,
}

/// Per-binary completion aggregate, computed without loading segments
#[derive(Debug, Clone, FromRow)]
pub struct BinarySummary {
    /// Unique database ID
    pub id: i64,
    /// Resolved name
    pub name: String,
    /// Newsgroup
    pub group_name: String,
    /// Poster
    pub poster: String,
    /// Unix timestamp of the earliest part
    pub posted: i64,
    /// Category hint from the creating rule
    pub category_id: Option<CategoryId>,
    /// Creating rule
    pub regex_id: Option<i64>,
    /// Request id
    pub req_id: Option<String>,
    /// Declared number of parts
    pub total_parts: i64,
    /// Distinct part numbers present
    pub parts_present: i64,
    /// Σ declared segments over present parts
    pub segments_total: i64,
    /// Σ available segments over present parts (each clamped to its declared count)
    pub segments_available: i64,
    /// Σ segment bytes
    pub size: i64,
    /// Unix timestamp of the most recent segment arrival
    pub last_activity: i64,
}

/// Release to be upserted
#[derive(Debug, Clone)]
pub struct NewRelease {
    /// Display name (the Binary name)
    pub name: String,
    /// Cleaned search name, part of the dedup key
    pub search_name: String,
    /// Post date, part of the dedup key
    pub posted: DateTime<Utc>,
    /// Resolved leaf category
    pub category_id: CategoryId,
    /// Newsgroup
    pub group_name: String,
    /// Poster
    pub poster: String,
    /// Rule that produced the Binary
    pub regex_id: Option<i64>,
    /// Request id
    pub req_id: Option<String>,
    /// Opaque index artifact reference
    pub nzb_ref: String,
    /// Index artifact size in bytes
    pub nzb_size: u64,
    /// Declared number of parts
    pub total_parts: u32,
    /// Σ segment bytes
    pub size: u64,
    /// Completion percentage at promotion
    pub completion: f64,
    /// Number of files in the index artifact
    pub file_count: u32,
    /// Archive volumes (rar + zip)
    pub archive_count: u32,
    /// Repair-set members
    pub par2_count: u32,
    /// Info/readme files
    pub info_count: u32,
}

/// Release record from database
#[derive(Debug, Clone, FromRow)]
pub struct ReleaseRow {
    /// Opaque release id
    pub id: String,
    /// Display name
    pub name: String,
    /// Cleaned search name
    pub search_name: String,
    /// Unix timestamp of the post date
    pub posted: i64,
    /// Resolved leaf category
    pub category_id: CategoryId,
    /// Newsgroup
    pub group_name: String,
    /// Poster
    pub poster: String,
    /// Rule that produced the Binary
    pub regex_id: Option<i64>,
    /// Request id
    pub req_id: Option<String>,
    /// Opaque index artifact reference
    pub nzb_ref: String,
    /// Index artifact size in bytes
    pub nzb_size: i64,
    /// Declared number of parts
    pub total_parts: i64,
    /// Σ segment bytes
    pub size: i64,
    /// Completion percentage at promotion
    pub completion: f64,
    /// Number of files in the index artifact
    pub file_count: i64,
    /// Archive volumes (rar + zip)
    pub archive_count: i64,
    /// Repair-set members
    pub par2_count: i64,
    /// Info/readme files
    pub info_count: i64,
    /// Status code (see [`ReleaseStatus`])
    pub status: i32,
    /// Download counter, set on insert only
    pub grabs: i64,
    /// Password flag placeholder, set on insert only
    pub passworded: i32,
    /// Unix timestamp of first promotion
    pub added: i64,
    /// Unix timestamp of the latest promotion
    pub updated: i64,
}

impl ReleaseRow {
    /// Decoded status
    pub fn status(&self) -> ReleaseStatus {
        ReleaseStatus::from_i32(self.status)
    }

    /// Post date as a UTC timestamp
    pub fn posted_at(&self) -> DateTime<Utc> {
        from_unix(self.posted)
    }
}

/// Assembly regex record from database
#[derive(Debug, Clone, FromRow)]
pub struct RegexRow {
    /// Unique database ID
    pub id: i64,
    /// Exact group name or "*" for every group
    pub group_name: String,
    /// Pattern with named captures `name`, `reqid`, `parts`
    pub pattern: String,
    /// Evaluation order (ascending)
    pub ordinal: i64,
    /// Category hint recorded on Binaries this rule creates
    pub category_id: Option<CategoryId>,
    /// Free-form description
    pub description: Option<String>,
}

/// Parameters for inserting an assembly regex
#[derive(Debug, Clone)]
pub struct NewRegex<'a> {
    /// Exact group name or "*"
    pub group_name: &'a str,
    /// Pattern
    pub pattern: &'a str,
    /// Evaluation order
    pub ordinal: i64,
    /// Category hint
    pub category_id: Option<CategoryId>,
    /// Description
    pub description: Option<&'a str>,
}

/// Blacklist record from database
#[derive(Debug, Clone, FromRow)]
pub struct BlacklistRow {
    /// Unique database ID
    pub id: i64,
    /// Pattern matched against the group name
    pub group_pattern: String,
    /// Pattern matched against the stripped subject
    pub subject_pattern: String,
    /// Free-form description
    pub description: Option<String>,
}

/// Category record from database
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    /// Category id
    pub id: CategoryId,
    /// Display name
    pub name: String,
    /// Parent category, `None` for top-level categories
    pub parent_id: Option<CategoryId>,
}

/// Database handle for usenet-indexer
pub struct Database {
    pool: SqlitePool,
}

pub(crate) fn from_unix(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
