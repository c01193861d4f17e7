//! Removal of Binaries and Parts that will never complete

use chrono::{Duration, Utc};

use crate::db::Database;
use crate::{Error, Result};

/// What one housekeeping pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sweep {
    /// Binaries deleted together with their parts
    pub binaries: u64,
    /// Unassigned parts deleted
    pub parts: u64,
}

/// Delete Binaries and unassigned Parts that have been idle for `max_age`
pub async fn sweep(db: &Database, max_age: std::time::Duration) -> Result<Sweep> {
    let max_age = Duration::from_std(max_age)
        .map_err(|e| Error::config("postprocess.dead_binary_age", e.to_string()))?;
    let cutoff = Utc::now() - max_age;

    let stale = db.stale_binary_ids(cutoff).await?;
    let binaries = db.delete_binaries(&stale).await?;
    let parts = db.delete_stale_parts(cutoff).await?;

    if binaries > 0 || parts > 0 {
        tracing::info!(binaries, parts, cutoff = %cutoff, "removed dead binaries and parts");
    }

    Ok(Sweep { binaries, parts })
}
