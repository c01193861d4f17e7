//! Newsgroup activation and scanned-range bookkeeping.

use crate::{Error, Result};

use super::{Database, GroupRecord};

impl Database {
    /// Activate a group for scanning, creating it if needed
    pub async fn activate_group(&self, name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (name, active) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET active = 1
            "#,
        )
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to activate group", e))?;

        Ok(())
    }

    /// Stop scanning a group (bookkeeping is kept)
    pub async fn deactivate_group(&self, name: &str) -> Result<()> {
        sqlx::query("UPDATE groups SET active = 0 WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to deactivate group", e))?;

        Ok(())
    }

    /// List groups that are active, by name
    pub async fn active_groups(&self) -> Result<Vec<GroupRecord>> {
        sqlx::query_as::<_, GroupRecord>(
            r#"
            SELECT id, name, active, first_article, last_article, last_updated
            FROM groups
            WHERE active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to list active groups", e))
    }

    /// Get a group by name
    pub async fn get_group(&self, name: &str) -> Result<Option<GroupRecord>> {
        sqlx::query_as::<_, GroupRecord>(
            r#"
            SELECT id, name, active, first_article, last_article, last_updated
            FROM groups
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to get group", e))
    }

    /// Record that `first..=last` has been scanned
    ///
    /// Bookkeeping is monotonic: `last_article` only grows and `first_article`
    /// only shrinks, so re-running a scan can never move the window backwards.
    pub async fn record_scanned_range(&self, name: &str, first: u64, last: u64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE groups SET
                first_article = CASE
                    WHEN first_article IS NULL OR ?1 < first_article THEN ?1
                    ELSE first_article END,
                last_article = CASE
                    WHEN last_article IS NULL OR ?2 > last_article THEN ?2
                    ELSE last_article END,
                last_updated = ?3
            WHERE name = ?4
            "#,
        )
        .bind(first as i64)
        .bind(last as i64)
        .bind(now)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to record scanned range", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("group {}", name)));
        }
        Ok(())
    }
}
