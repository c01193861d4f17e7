//! Completion detection and release promotion
//!
//! Every Binary in the store is evaluated once per pass. Eligible Binaries get
//! an index artifact, a category and a Release row; the Binary is deleted
//! afterwards whether the Release was new or refreshed. Binaries below the
//! minimum archive count are discarded, and Binaries whose artifact cannot be
//! built or stored are left for the next pass.

pub mod completion;
pub mod housekeeping;
pub mod naming;

pub use completion::{Completion, CompletionPolicy, Verdict};
pub use housekeeping::{Sweep, sweep};
pub use naming::clean_release_name;

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::artifact::{self, ArtifactStore};
use crate::categories::Classifier;
use crate::config::PostprocessConfig;
use crate::db::{BinarySummary, Database, NewRelease, from_unix};
use crate::types::{Event, PromotionStats};
use crate::{Error, Result};

/// Promotes completed Binaries to Releases
pub struct Promoter {
    classifier: Classifier,
    store: Arc<dyn ArtifactStore>,
    policy: CompletionPolicy,
    min_archives: u32,
    event_tx: broadcast::Sender<Event>,
}

/// What happened to one Binary
enum Outcome {
    Accumulating,
    Discarded,
    Failed,
    Promoted { new: bool },
}

impl Promoter {
    /// Create a promoter from the postprocess settings
    pub fn new(
        config: &PostprocessConfig,
        classifier: Classifier,
        store: Arc<dyn ArtifactStore>,
        event_tx: broadcast::Sender<Event>,
    ) -> Result<Self> {
        let incomplete_grace = chrono::Duration::from_std(config.incomplete_grace)
            .map_err(|e| Error::config("postprocess.incomplete_grace", e.to_string()))?;

        Ok(Self {
            classifier,
            store,
            policy: CompletionPolicy {
                min_completion: config.min_completion,
                incomplete_grace,
            },
            min_archives: config.min_archives,
            event_tx,
        })
    }

    /// Run one promotion pass over every Binary in the store
    ///
    /// Artifact failures skip the Binary; store write failures abort the pass.
    pub async fn promote(&self, db: &Database) -> Result<PromotionStats> {
        let mut stats = PromotionStats::default();
        let now = Utc::now();

        for summary in db.binary_summaries().await? {
            stats.examined += 1;

            if self.policy.evaluate_summary(&summary, now) == Verdict::Accumulating {
                stats.accumulating += 1;
                continue;
            }

            match self.promote_one(db, &summary).await? {
                Outcome::Accumulating => stats.accumulating += 1,
                Outcome::Discarded => stats.discarded += 1,
                Outcome::Failed => stats.failed += 1,
                Outcome::Promoted { new: true } => stats.created += 1,
                Outcome::Promoted { new: false } => stats.refreshed += 1,
            }
        }

        tracing::info!(
            examined = stats.examined,
            accumulating = stats.accumulating,
            created = stats.created,
            refreshed = stats.refreshed,
            discarded = stats.discarded,
            failed = stats.failed,
            "promotion pass complete"
        );

        Ok(stats)
    }

    async fn promote_one(&self, db: &Database, summary: &BinarySummary) -> Result<Outcome> {
        let parts = db.binary_parts(summary.id).await?;
        if parts.is_empty() {
            return Ok(Outcome::Accumulating);
        }

        let artifact = match artifact::build(summary, &parts) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(binary = %summary.name, error = %e, "failed to build index artifact");
                return Ok(Outcome::Failed);
            }
        };

        if artifact.archive_count() < self.min_archives {
            db.delete_binaries(&[summary.id]).await?;
            let reason = format!(
                "{} archive volumes, {} required",
                artifact.archive_count(),
                self.min_archives
            );
            tracing::debug!(binary = %summary.name, reason = %reason, "discarding binary");
            self.event_tx
                .send(Event::BinaryDiscarded {
                    name: summary.name.clone(),
                    reason,
                })
                .ok();
            return Ok(Outcome::Discarded);
        }

        let stored = match self.store.store(&summary.name, &artifact.to_xml()).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(binary = %summary.name, error = %e, "failed to store index artifact");
                return Ok(Outcome::Failed);
            }
        };

        let category = match summary.category_id {
            Some(hint) => hint,
            None => self
                .classifier
                .classify(&summary.name, Some(&summary.group_name)),
        };

        let completion = Completion::from_summary(summary);
        let release = NewRelease {
            name: summary.name.clone(),
            search_name: clean_release_name(&summary.name),
            posted: from_unix(summary.posted),
            category_id: category,
            group_name: summary.group_name.clone(),
            poster: summary.poster.clone(),
            regex_id: summary.regex_id,
            req_id: summary.req_id.clone(),
            nzb_ref: stored.reference,
            nzb_size: stored.size,
            total_parts: completion.declared_parts.max(completion.parts_present),
            size: artifact.size,
            completion: completion.percent(),
            file_count: artifact.file_count,
            archive_count: artifact.archive_count(),
            par2_count: artifact.repair_count(),
            info_count: artifact.infos,
        };

        let (id, new) = db.upsert_release(&release).await?;
        db.delete_binaries(&[summary.id]).await?;

        tracing::info!(
            release = %id,
            search_name = %release.search_name,
            category = %category,
            new,
            "promoted binary"
        );
        self.event_tx
            .send(Event::ReleaseCreated {
                id,
                search_name: release.search_name,
                category,
                new,
            })
            .ok();

        Ok(Outcome::Promoted { new })
    }
}
