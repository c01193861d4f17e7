//! One indexing cycle: scan every active group, then assemble, promote and sweep

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::Indexer;
use crate::error::{Error, Result};
use crate::nntp::SessionFactory;
use crate::releases;
use crate::retry::with_retry;
use crate::scanner::{Blacklist, Scanner};
use crate::types::{CycleStats, Event, ScanStats};

/// Which way group scans walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Forward from the last scanned article
    Update,
    /// Backwards from the first scanned article
    Backfill,
}

impl Indexer {
    /// Run one full cycle: update scans, then assembly, promotion and housekeeping
    ///
    /// The post-scan phases start only after every scan worker has finished.
    /// A group the news server fails on is logged and counted; a store failure
    /// in any phase aborts the cycle.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        let (scan, failed_groups) = self.scan_groups(ScanMode::Update).await?;

        let assembler = self.assembler.read().await.clone();
        let assembly = assembler.assemble(&self.db).await?;
        let promotion = self.promoter.promote(&self.db).await?;
        let sweep = releases::sweep(&self.db, self.config.postprocess.dead_binary_age).await?;

        let stats = CycleStats {
            scan,
            failed_groups,
            assembly,
            promotion,
            dead_binaries: sweep.binaries,
            dead_parts: sweep.parts,
        };

        tracing::info!(
            segments = stats.scan.segments,
            failed_groups = stats.failed_groups,
            binaries = stats.assembly.binaries,
            releases = stats.promotion.created,
            "indexing cycle complete"
        );
        self.event_tx
            .send(Event::CycleComplete {
                stats: stats.clone(),
            })
            .ok();

        Ok(stats)
    }

    /// Backfill every active group; the parts found are assembled by the next cycle
    pub async fn backfill(&self) -> Result<ScanStats> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        let (stats, _) = self.scan_groups(ScanMode::Backfill).await?;
        Ok(stats)
    }

    /// Scan all active groups on a bounded worker pool and wait for every worker
    ///
    /// Returns the summed counters and the number of groups that failed. If a
    /// worker hit a store failure, the first one is returned once all workers
    /// are done.
    pub async fn scan_groups(&self, mode: ScanMode) -> Result<(ScanStats, u64)> {
        let blacklist = Blacklist::new(self.db.active_blacklists().await?);
        for id in blacklist.malformed() {
            self.db.disable_blacklist(*id).await?;
        }
        let blacklist = Arc::new(blacklist);
        let scanner = Scanner::new(
            self.db.clone(),
            self.config.scan.clone(),
            self.config.retry.clone(),
            blacklist,
            self.event_tx.clone(),
        );

        let groups = self.db.active_groups().await?;
        let permits = Arc::new(Semaphore::new(self.config.scan.update_threads.max(1)));
        let mut workers = JoinSet::new();

        for group in groups {
            let scanner = scanner.clone();
            let sessions = self.sessions.clone();
            let permits = permits.clone();
            let retry = self.config.retry.clone();
            let attempts = self.config.scan.block_attempts();

            workers.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (group.name, Err(Error::ShuttingDown));
                };
                let result =
                    scan_group(&scanner, sessions.as_ref(), &retry, attempts, &group.name, mode)
                        .await;
                (group.name, result)
            });
        }

        let mut total = ScanStats::default();
        let mut failed = 0;
        let mut store_failure = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((_, Ok(stats))) => total.absorb(&stats),
                Ok((group, Err(e))) => {
                    failed += 1;
                    tracing::error!(group = %group, error = %e, code = e.code(), "group scan failed");
                    if e.is_store_failure() && store_failure.is_none() {
                        store_failure = Some(e);
                    }
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, "scan worker panicked");
                }
            }
        }

        if let Some(e) = store_failure {
            return Err(e);
        }
        Ok((total, failed))
    }
}

async fn scan_group(
    scanner: &Scanner,
    sessions: &dyn SessionFactory,
    retry: &crate::config::RetryConfig,
    attempts: u32,
    group: &str,
    mode: ScanMode,
) -> Result<ScanStats> {
    let mut session = with_retry(retry, attempts, move || sessions.open()).await?;
    match mode {
        ScanMode::Update => scanner.update(session.as_mut(), group).await,
        ScanMode::Backfill => scanner.backfill(session.as_mut(), group).await,
    }
}
