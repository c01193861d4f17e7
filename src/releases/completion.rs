//! Completion evaluation

use chrono::{DateTime, Duration, Utc};

use crate::db::{BinarySummary, from_unix};

/// Segment and part counts of one Binary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    /// Segments present, each part clamped to its declared count
    pub available: u64,
    /// Segments declared over the parts present
    pub total: u64,
    /// Distinct part numbers present
    pub parts_present: u32,
    /// Parts the posting declares (0 when it has no counter)
    pub declared_parts: u32,
}

impl Completion {
    /// Counts from a store aggregate
    pub fn from_summary(summary: &BinarySummary) -> Self {
        Self {
            available: summary.segments_available.max(0) as u64,
            total: summary.segments_total.max(0) as u64,
            parts_present: summary.parts_present.clamp(0, i64::from(u32::MAX)) as u32,
            declared_parts: summary.total_parts.clamp(0, i64::from(u32::MAX)) as u32,
        }
    }

    /// Percentage of declared segments present, in [0, 100]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.available as f64 / self.total as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Whether every declared part is present
    pub fn has_all_parts(&self) -> bool {
        self.parts_present >= self.declared_parts
    }
}

/// Outcome of a completion check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep waiting for parts or segments
    Accumulating,
    /// Ready for promotion
    Eligible,
}

/// Thresholds deciding when a Binary may be promoted
#[derive(Debug, Clone, Copy)]
pub struct CompletionPolicy {
    /// Minimum completion percentage
    pub min_completion: f64,
    /// Quiet period required before an incomplete Binary is promoted
    pub incomplete_grace: Duration,
}

impl CompletionPolicy {
    /// Evaluate a Binary whose newest segment arrived at `last_activity`
    pub fn evaluate(
        &self,
        completion: &Completion,
        last_activity: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Verdict {
        if !completion.has_all_parts() || completion.total == 0 {
            return Verdict::Accumulating;
        }

        let percent = completion.percent();
        if percent >= 100.0 {
            return Verdict::Eligible;
        }
        if percent >= self.min_completion && now - last_activity >= self.incomplete_grace {
            return Verdict::Eligible;
        }
        Verdict::Accumulating
    }

    /// Evaluate a store aggregate
    pub fn evaluate_summary(&self, summary: &BinarySummary, now: DateTime<Utc>) -> Verdict {
        self.evaluate(
            &Completion::from_summary(summary),
            from_unix(summary.last_activity),
            now,
        )
    }
}
