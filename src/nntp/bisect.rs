//! Date to article-number bisection
//!
//! Servers number articles monotonically but keep no index by date, so the
//! article posted closest to "N days ago" is found by probing dates. Expired
//! and cancelled articles leave holes in the numbering; a probe that lands on
//! a hole is nudged forward with a growing step until it finds a dated article.

use super::NewsSource;
use crate::error::{Result, ScanError};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Find the first article posted at or after `days_ago` days before server time
///
/// Returns:
/// - the group's first article when the target predates everything the server holds,
/// - `None` when the target postdates the newest article (nothing to scan),
/// - the group's first article when the search does not converge within
///   `max_iterations` probes.
pub async fn date_to_article_number(
    source: &mut dyn NewsSource,
    group: &str,
    days_ago: f64,
    max_iterations: u32,
) -> Result<Option<u64>> {
    let range = source.select_group(group).await?;
    if range.is_empty() {
        return Ok(None);
    }

    let now = source.server_time().await?;
    let target = now - ChronoDuration::seconds((days_ago * 86_400.0) as i64);

    let Some((oldest, oldest_date)) = probe_forward(source, range.first, range.last).await? else {
        return Err(ScanError::DateUnavailable {
            group: group.to_string(),
        }
        .into());
    };
    if target <= oldest_date {
        return Ok(Some(range.first));
    }

    let Some((newest, newest_date)) = probe_backward(source, oldest, range.last).await? else {
        return Err(ScanError::DateUnavailable {
            group: group.to_string(),
        }
        .into());
    };
    if target > newest_date {
        return Ok(None);
    }

    // date(lo) < target <= date(hi); probes stay below `limit`
    let mut lo = oldest;
    let mut hi = newest;
    let mut limit = newest;
    let mut iterations = 0u32;

    while limit - lo > 1 {
        if iterations >= max_iterations {
            tracing::warn!(
                group = %group,
                days_ago,
                iterations,
                "Date bisection did not converge, falling back to first article"
            );
            return Ok(Some(range.first));
        }
        iterations += 1;

        let mid = lo + (limit - lo) / 2;
        match probe_forward(source, mid, limit - 1).await? {
            Some((number, date)) if date < target => lo = number,
            Some((number, _)) => {
                hi = number;
                limit = number;
            }
            None => limit = mid,
        }
    }

    tracing::debug!(group = %group, days_ago, article = hi, iterations, "Date bisection converged");
    Ok(Some(hi))
}

/// A dated article in `from..=to`, stepping forward 1, 2, 4, ... past holes
///
/// The last probe is clamped to `to`, so a hit at the top of the range is never
/// stepped over.
async fn probe_forward(
    source: &mut dyn NewsSource,
    from: u64,
    to: u64,
) -> Result<Option<(u64, DateTime<Utc>)>> {
    if from > to {
        return Ok(None);
    }
    let mut position = from;
    let mut step = 1u64;
    loop {
        if let Some(date) = source.article_date(position).await? {
            return Ok(Some((position, date)));
        }
        if position >= to {
            return Ok(None);
        }
        position = position.saturating_add(step).min(to);
        step = step.saturating_mul(2);
    }
}

/// Last dated article in `floor..=from`, stepping backwards past holes
async fn probe_backward(
    source: &mut dyn NewsSource,
    floor: u64,
    from: u64,
) -> Result<Option<(u64, DateTime<Utc>)>> {
    let mut position = from;
    let mut step = 1u64;
    loop {
        if let Some(date) = source.article_date(position).await? {
            return Ok(Some((position, date)));
        }
        if position <= floor {
            return Ok(None);
        }
        position = position.saturating_sub(step).max(floor);
        step = step.saturating_mul(2);
    }
}
