//! In-memory segment buffer in front of the store

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::Result;
use crate::db::Database;
use crate::merge::Merge;
use crate::types::{Part, Segment};

/// Accumulates segments into Parts and flushes them every `flush_size` segments
///
/// Memory stays bounded by the flush size no matter how large a scan is.
pub struct PartStore<'a> {
    db: &'a Database,
    flush_size: usize,
    pending: BTreeMap<String, Part>,
    pending_segments: usize,
}

impl<'a> PartStore<'a> {
    /// Buffer in front of `db`
    pub fn new(db: &'a Database, flush_size: usize) -> Self {
        Self {
            db,
            flush_size: flush_size.max(1),
            pending: BTreeMap::new(),
            pending_segments: 0,
        }
    }

    /// Add one segment of the Part identified by `subject`
    pub async fn add(
        &mut self,
        subject: String,
        group: &str,
        poster: &str,
        posted: DateTime<Utc>,
        total_segments: u32,
        segment: Segment,
    ) -> Result<()> {
        let part = Part {
            subject,
            group_name: group.to_string(),
            poster: poster.to_string(),
            posted,
            total_segments,
            segments: BTreeMap::from([(segment.number, segment)]),
        };

        match self.pending.entry(part.subject.clone()) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(part),
            Entry::Vacant(slot) => {
                slot.insert(part);
            }
        }
        self.pending_segments += 1;

        if self.pending_segments >= self.flush_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Persist and evict everything buffered
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let parts: Vec<Part> = std::mem::take(&mut self.pending).into_values().collect();
        self.db.upsert_parts_chunk(&parts).await?;

        tracing::debug!(
            parts = parts.len(),
            segments = self.pending_segments,
            "flushed part store"
        );
        self.pending_segments = 0;
        Ok(())
    }
}
