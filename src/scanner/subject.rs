//! Overview row to segment extraction

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::db::BlacklistRow;
use crate::nntp::OverviewRow;
use crate::types::Segment;

#[allow(clippy::expect_used)]
static SEGMENT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d{1,6})\s*/\s*(\d{1,6})\s*\)").expect("segment marker pattern is valid")
});

/// Result of looking at one overview row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// The row is one segment of a binary posting
    Segment {
        /// Subject with the segment marker removed
        subject: String,
        /// Declared number of segments
        total: u32,
        /// The segment itself
        segment: Segment,
    },
    /// Not a binary segment (no marker, no size, or a marker out of range)
    Ignored,
}

/// Split a subject into the stripped subject, segment number and total
///
/// The last `(n/total)` marker is the segment counter; earlier ones belong to
/// the posting's own file counter.
pub fn split_marker(subject: &str) -> Option<(String, u32, u32)> {
    let caps = SEGMENT_MARKER.captures_iter(subject).last()?;
    let whole = caps.get(0)?;
    let number: u32 = caps[1].parse().ok()?;
    let total: u32 = caps[2].parse().ok()?;
    if total == 0 || number == 0 || number > total {
        return None;
    }

    let stripped = format!(
        "{} {}",
        subject[..whole.start()].trim_end(),
        subject[whole.end()..].trim_start()
    );
    Some((stripped.trim().to_string(), number, total))
}

/// Classify one overview row
pub fn extract(row: &OverviewRow) -> Extracted {
    if row.bytes == 0 {
        return Extracted::Ignored;
    }
    match split_marker(&row.subject) {
        Some((subject, number, total)) if !subject.is_empty() => Extracted::Segment {
            subject,
            total,
            segment: Segment {
                number,
                message_id: row.message_id.clone(),
                bytes: row.bytes,
            },
        },
        _ => Extracted::Ignored,
    }
}

struct BlacklistRule {
    id: i64,
    group: Regex,
    subject: Regex,
}

/// Compiled blacklist rules
///
/// Rules whose patterns fail to compile are logged and left out; their ids
/// are kept so the caller can disable them in the store.
#[derive(Default)]
pub struct Blacklist {
    rules: Vec<BlacklistRule>,
    malformed: Vec<i64>,
}

impl Blacklist {
    /// Compile the given rows
    pub fn new(rows: Vec<BlacklistRow>) -> Self {
        let mut list = Self::default();
        for row in rows {
            match (compile(&row.group_pattern), compile(&row.subject_pattern)) {
                (Ok(group), Ok(subject)) => list.rules.push(BlacklistRule {
                    id: row.id,
                    group,
                    subject,
                }),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(blacklist = row.id, error = %e, "ignoring malformed blacklist rule");
                    list.malformed.push(row.id);
                }
            }
        }
        list
    }

    /// Ids of rules that failed to compile
    pub fn malformed(&self) -> &[i64] {
        &self.malformed
    }

    /// The rules that apply to `group`
    pub fn for_group(&self, group: &str) -> GroupBlacklist<'_> {
        GroupBlacklist {
            rules: self
                .rules
                .iter()
                .filter(|rule| rule.group.is_match(group))
                .collect(),
        }
    }
}

/// Blacklist rules narrowed to one group
pub struct GroupBlacklist<'a> {
    rules: Vec<&'a BlacklistRule>,
}

impl GroupBlacklist<'_> {
    /// Id of the first rule rejecting `subject`
    pub fn rejects(&self, subject: &str) -> Option<i64> {
        self.rules
            .iter()
            .find(|rule| rule.subject.is_match(subject))
            .map(|rule| rule.id)
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
