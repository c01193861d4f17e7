//! Assembly regex and blacklist tables.

use crate::{Error, Result};

use super::{BlacklistRow, Database, NewRegex, RegexRow};

impl Database {
    /// Active assembly regexes in evaluation order
    pub async fn active_regexes(&self) -> Result<Vec<RegexRow>> {
        sqlx::query_as::<_, RegexRow>(
            r#"
            SELECT id, group_name, pattern, ordinal, category_id, description
            FROM regexes
            WHERE status = 1
            ORDER BY ordinal, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to list regexes", e))
    }

    /// Insert an assembly regex, returning its id
    pub async fn insert_regex(&self, regex: &NewRegex<'_>) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO regexes (group_name, pattern, ordinal, category_id, status, description)
            VALUES (?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(regex.group_name)
        .bind(regex.pattern)
        .bind(regex.ordinal)
        .bind(regex.category_id)
        .bind(regex.description)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to insert regex", e))?;

        Ok(result.last_insert_rowid())
    }

    /// Permanently disable a regex that failed to compile or match
    pub async fn disable_regex(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE regexes SET status = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to disable regex", e))?;

        Ok(())
    }

    /// Active blacklist rules
    pub async fn active_blacklists(&self) -> Result<Vec<BlacklistRow>> {
        sqlx::query_as::<_, BlacklistRow>(
            r#"
            SELECT id, group_pattern, subject_pattern, description
            FROM blacklists
            WHERE status = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to list blacklists", e))
    }

    /// Insert a blacklist rule, returning its id
    pub async fn insert_blacklist(
        &self,
        group_pattern: &str,
        subject_pattern: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO blacklists (group_pattern, subject_pattern, status, description)
            VALUES (?, ?, 1, ?)
            "#,
        )
        .bind(group_pattern)
        .bind(subject_pattern)
        .bind(description)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to insert blacklist", e))?;

        Ok(result.last_insert_rowid())
    }

    /// Permanently disable a blacklist rule whose patterns do not compile
    pub async fn disable_blacklist(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE blacklists SET status = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to disable blacklist", e))?;

        Ok(())
    }
}
