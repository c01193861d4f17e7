//! Release persistence.

use crate::types::{ReleaseId, ReleaseStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};

use super::{Database, NewRelease, ReleaseRow};

const RELEASE_COLUMNS: &str = "id, name, search_name, posted, category_id, group_name, poster, \
                               regex_id, req_id, nzb_ref, nzb_size, total_parts, size, completion, \
                               file_count, archive_count, par2_count, info_count, status, grabs, \
                               passworded, added, updated";

impl Database {
    /// Insert or refresh the Release keyed by (search_name, posted)
    ///
    /// The id, status, counters and `added` are written on insert only; every
    /// derived field is overwritten on each promotion. Returns the id of the
    /// stored Release and whether it was newly created.
    pub async fn upsert_release(&self, release: &NewRelease) -> Result<(ReleaseId, bool)> {
        let candidate = ReleaseId::generate();
        let now = Utc::now().timestamp();

        let stored: String = sqlx::query_scalar(
            r#"
            INSERT INTO releases (
                id, name, search_name, posted, category_id, group_name, poster, regex_id,
                req_id, nzb_ref, nzb_size, total_parts, size, completion, file_count,
                archive_count, par2_count, info_count, status, grabs, passworded, added, updated
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
            ON CONFLICT(search_name, posted) DO UPDATE SET
                name = excluded.name,
                category_id = excluded.category_id,
                group_name = excluded.group_name,
                poster = excluded.poster,
                regex_id = excluded.regex_id,
                req_id = excluded.req_id,
                nzb_ref = excluded.nzb_ref,
                nzb_size = excluded.nzb_size,
                total_parts = excluded.total_parts,
                size = excluded.size,
                completion = excluded.completion,
                file_count = excluded.file_count,
                archive_count = excluded.archive_count,
                par2_count = excluded.par2_count,
                info_count = excluded.info_count,
                updated = excluded.updated
            RETURNING id
            "#,
        )
        .bind(candidate.as_str())
        .bind(&release.name)
        .bind(&release.search_name)
        .bind(release.posted.timestamp())
        .bind(release.category_id)
        .bind(&release.group_name)
        .bind(&release.poster)
        .bind(release.regex_id)
        .bind(&release.req_id)
        .bind(&release.nzb_ref)
        .bind(release.nzb_size as i64)
        .bind(i64::from(release.total_parts))
        .bind(release.size as i64)
        .bind(release.completion)
        .bind(i64::from(release.file_count))
        .bind(i64::from(release.archive_count))
        .bind(i64::from(release.par2_count))
        .bind(i64::from(release.info_count))
        .bind(ReleaseStatus::Pending.to_i32())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::query(
                &format!("Failed to upsert release '{}'", release.search_name),
                e,
            )
        })?;

        let created = stored == candidate.as_str();
        Ok((ReleaseId(stored), created))
    }

    /// Get a Release by id
    pub async fn get_release(&self, id: &ReleaseId) -> Result<Option<ReleaseRow>> {
        sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {} FROM releases WHERE id = ?",
            RELEASE_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to get release", e))
    }

    /// Get a Release by its dedup key
    pub async fn find_release(
        &self,
        search_name: &str,
        posted: DateTime<Utc>,
    ) -> Result<Option<ReleaseRow>> {
        sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {} FROM releases WHERE search_name = ? AND posted = ?",
            RELEASE_COLUMNS
        ))
        .bind(search_name)
        .bind(posted.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to find release", e))
    }

    /// Most recently posted Releases first
    pub async fn list_releases(&self, limit: i64) -> Result<Vec<ReleaseRow>> {
        sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {} FROM releases ORDER BY posted DESC, id LIMIT ?",
            RELEASE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to list releases", e))
    }

    /// Count all Releases
    pub async fn count_releases(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM releases")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to count releases", e))
    }
}
