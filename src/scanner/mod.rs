//! Newsgroup overview scanning
//!
//! A scan walks an article range of one group in blocks of at most
//! `message_scan_limit` articles. Each block's overview rows are reduced to
//! segments, filtered through the blacklist and buffered in a [`PartStore`].
//! The buffer is flushed and the group's scanned range recorded after every
//! block, so an interrupted scan resumes where it stopped.
//!
//! Updates walk forward from the last scanned article (a new group starts
//! `new_group_scan_days` back). Backfills walk backwards from the first
//! scanned article down to `backfill_days` back.

pub mod part_store;
pub mod subject;

pub use part_store::PartStore;
pub use subject::{Blacklist, Extracted, extract, split_marker};

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

use crate::config::{RetryConfig, ScanConfig};
use crate::db::Database;
use crate::nntp::{NewsSource, OverviewRow, date_to_article_number};
use crate::retry::with_retry;
use crate::types::{Event, ScanStats};
use crate::{Error, Result, ScanError};

/// Scan direction of a block sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Oldest block first
    Forward,
    /// Newest block first
    Backward,
}

/// Split `start..=end` into inclusive blocks of at most `size` articles
pub fn blocks(start: u64, end: u64, size: u64, direction: Direction) -> Vec<(u64, u64)> {
    let size = size.max(1);
    let mut out = Vec::new();
    if start > end {
        return out;
    }

    match direction {
        Direction::Forward => {
            let mut block_start = start;
            loop {
                let block_end = block_start.saturating_add(size - 1).min(end);
                out.push((block_start, block_end));
                if block_end >= end {
                    break;
                }
                block_start = block_end + 1;
            }
        }
        Direction::Backward => {
            let mut block_end = end;
            loop {
                let block_start = block_end.saturating_sub(size - 1).max(start);
                out.push((block_start, block_end));
                if block_start <= start {
                    break;
                }
                block_end = block_start - 1;
            }
        }
    }
    out
}

/// Scans groups into the Part Store
///
/// Cheap to clone; every scan worker gets its own copy and its own session.
#[derive(Clone)]
pub struct Scanner {
    db: Arc<Database>,
    scan: ScanConfig,
    retry: RetryConfig,
    blacklist: Arc<Blacklist>,
    event_tx: broadcast::Sender<Event>,
}

impl Scanner {
    /// Create a scanner writing to `db`
    pub fn new(
        db: Arc<Database>,
        scan: ScanConfig,
        retry: RetryConfig,
        blacklist: Arc<Blacklist>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            db,
            scan,
            retry,
            blacklist,
            event_tx,
        }
    }

    /// Scan everything posted to `group` since the last update
    ///
    /// A group that has never been scanned starts `new_group_scan_days` back.
    pub async fn update(&self, source: &mut dyn NewsSource, group: &str) -> Result<ScanStats> {
        let record = self
            .db
            .get_group(group)
            .await?
            .ok_or_else(|| Error::NotFound(format!("group {}", group)))?;

        let range = source.select_group(group).await?;
        self.event_tx
            .send(Event::ScanStarted {
                group: group.to_string(),
                backfill: false,
            })
            .ok();

        if range.is_empty() {
            tracing::debug!(group = %group, "group is empty, nothing to scan");
            return Ok(ScanStats::default());
        }

        let start = match record.last_article {
            Some(last) => (last.max(0) as u64).saturating_add(1).max(range.first),
            None => {
                match date_to_article_number(
                    source,
                    group,
                    self.scan.new_group_scan_days,
                    self.scan.bisect_max_iterations,
                )
                .await?
                {
                    Some(start) => start,
                    None => {
                        // Nothing recent enough; the next update starts after the newest article
                        self.db
                            .record_scanned_range(group, range.last, range.last)
                            .await?;
                        return Ok(ScanStats::default());
                    }
                }
            }
        };

        if start > range.last {
            tracing::debug!(group = %group, last = range.last, "group is up to date");
            return Ok(ScanStats::default());
        }

        tracing::info!(group = %group, start, end = range.last, "updating group");
        let stats = self
            .scan_blocks(
                source,
                group,
                blocks(
                    start,
                    range.last,
                    self.scan.message_scan_limit,
                    Direction::Forward,
                ),
            )
            .await?;
        self.finish(group, &stats);
        Ok(stats)
    }

    /// Scan older articles of `group` back to `backfill_days` ago
    ///
    /// Groups that have never been updated have no lower bound yet and are skipped.
    pub async fn backfill(&self, source: &mut dyn NewsSource, group: &str) -> Result<ScanStats> {
        let record = self
            .db
            .get_group(group)
            .await?
            .ok_or_else(|| Error::NotFound(format!("group {}", group)))?;

        let Some(first) = record.first_article else {
            tracing::debug!(group = %group, "group has not been updated yet, skipping backfill");
            return Ok(ScanStats::default());
        };

        let target = date_to_article_number(
            source,
            group,
            self.scan.backfill_days,
            self.scan.bisect_max_iterations,
        )
        .await?;
        let range = source.select_group(group).await?;
        self.event_tx
            .send(Event::ScanStarted {
                group: group.to_string(),
                backfill: true,
            })
            .ok();

        let Some(target) = target else {
            return Ok(ScanStats::default());
        };
        let lower = target.max(range.first);
        let upper = (first.max(0) as u64).saturating_sub(1);
        if upper < lower {
            tracing::debug!(group = %group, first, target, "backfill target reached");
            return Ok(ScanStats::default());
        }

        tracing::info!(group = %group, start = lower, end = upper, "backfilling group");
        let stats = self
            .scan_blocks(
                source,
                group,
                blocks(lower, upper, self.scan.message_scan_limit, Direction::Backward),
            )
            .await?;
        self.finish(group, &stats);
        Ok(stats)
    }

    async fn scan_blocks(
        &self,
        source: &mut dyn NewsSource,
        group: &str,
        blocks: Vec<(u64, u64)>,
    ) -> Result<ScanStats> {
        let blacklist = self.blacklist.for_group(group);
        let mut store = PartStore::new(&self.db, self.scan.segment_flush_size);
        let mut stats = ScanStats::default();
        let session = Mutex::new(source);

        for (start, end) in blocks {
            match self.fetch_block(&session, group, start, end).await {
                Ok(rows) => {
                    stats.blocks += 1;
                    for row in rows {
                        stats.received += 1;
                        self.ingest(&mut store, &blacklist, group, row, &mut stats)
                            .await?;
                    }
                }
                Err(e) => {
                    stats.failed_blocks += 1;
                    tracing::warn!(
                        group = %group,
                        start,
                        end,
                        error = %e,
                        code = e.code(),
                        "skipping overview block"
                    );
                    self.event_tx
                        .send(Event::BlockSkipped {
                            group: group.to_string(),
                            start,
                            end,
                            error: e.to_string(),
                        })
                        .ok();
                }
            }

            store.flush().await?;
            self.db.record_scanned_range(group, start, end).await?;
        }

        Ok(stats)
    }

    async fn fetch_block(
        &self,
        session: &Mutex<&mut dyn NewsSource>,
        group: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<OverviewRow>> {
        with_retry(&self.retry, self.scan.block_attempts(), move || async move {
            let mut session = session.lock().await;
            session.fetch_overview(start, end).await
        })
        .await
        .map_err(|e| {
            Error::Scan(ScanError::BlockFailed {
                group: group.to_string(),
                start,
                end,
                reason: e.to_string(),
            })
        })
    }

    async fn ingest(
        &self,
        store: &mut PartStore<'_>,
        blacklist: &subject::GroupBlacklist<'_>,
        group: &str,
        row: OverviewRow,
        stats: &mut ScanStats,
    ) -> Result<()> {
        match extract(&row) {
            Extracted::Ignored => stats.ignored += 1,
            Extracted::Segment {
                subject,
                total,
                segment,
            } => {
                if let Some(rule) = blacklist.rejects(&subject) {
                    tracing::trace!(group = %group, subject = %subject, blacklist = rule, "blacklisted");
                    stats.blacklisted += 1;
                    return Ok(());
                }
                stats.segments += 1;
                store
                    .add(
                        subject,
                        group,
                        &row.poster,
                        row.date.unwrap_or_else(Utc::now),
                        total,
                        segment,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    fn finish(&self, group: &str, stats: &ScanStats) {
        tracing::info!(
            group = %group,
            received = stats.received,
            segments = stats.segments,
            ignored = stats.ignored,
            blacklisted = stats.blacklisted,
            failed_blocks = stats.failed_blocks,
            "group scan complete"
        );
        self.event_tx
            .send(Event::GroupScanned {
                group: group.to_string(),
                stats: stats.clone(),
            })
            .ok();
    }
}
