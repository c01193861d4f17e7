//! Binary persistence: upserts, part attachment and completion aggregates.

use crate::types::{Binary, BinaryPart};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::BTreeMap;

use super::{
    BinaryRow, BinarySummary, Database, MAX_BIND_VARIABLES, PartRow, PartWithSegments, SegmentRow,
    part_state,
};

impl Database {
    /// Create or merge a Binary keyed by name, returning its id
    ///
    /// Category hint, rule id and creation time are written on insert only.
    /// Poster and declared part count take the newest value, the post date the
    /// earliest, and a request id is filled in only when none was recorded.
    pub async fn upsert_binary(&self, binary: &Binary) -> Result<i64> {
        let now = Utc::now().timestamp();
        sqlx::query_scalar(
            r#"
            INSERT INTO binaries (
                name, group_name, poster, posted, category_id, regex_id, req_id,
                total_parts, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                poster = excluded.poster,
                posted = MIN(binaries.posted, excluded.posted),
                req_id = COALESCE(binaries.req_id, excluded.req_id),
                total_parts = excluded.total_parts,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&binary.name)
        .bind(&binary.group_name)
        .bind(&binary.poster)
        .bind(binary.posted.timestamp())
        .bind(binary.category_hint)
        .bind(binary.rule_id)
        .bind(&binary.req_id)
        .bind(i64::from(binary.total_parts))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::query(&format!("Failed to upsert binary '{}'", binary.name), e))
    }

    /// Attach parts to a Binary, folding duplicates of a part number into one row
    ///
    /// For each part number, the row already attached to the Binary (or else the
    /// lowest source id) is kept; segments of the other source rows are copied
    /// into it without overwriting existing numbers and those rows are deleted.
    pub async fn attach_parts(
        &self,
        binary_id: i64,
        parts: &BTreeMap<u32, BinaryPart>,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::query("Failed to begin part attachment", e))?;

        for (number, part) in parts {
            let attached: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM parts WHERE binary_id = ? AND part_number = ? ORDER BY id LIMIT 1",
            )
            .bind(binary_id)
            .bind(i64::from(*number))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Error::query("Failed to look up attached part", e))?;

            let Some(canonical) = attached.or_else(|| part.sources.iter().next().copied()) else {
                continue;
            };

            for source in part.sources.iter().filter(|id| **id != canonical) {
                sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO segments (part_id, number, message_id, bytes)
                    SELECT ?, number, message_id, bytes FROM segments WHERE part_id = ?
                    "#,
                )
                .bind(canonical)
                .bind(source)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::query("Failed to fold part segments", e))?;

                sqlx::query(
                    r#"
                    UPDATE parts SET posted = MIN(posted, (SELECT posted FROM parts WHERE id = ?))
                    WHERE id = ?
                    "#,
                )
                .bind(source)
                .bind(canonical)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::query("Failed to fold part date", e))?;

                sqlx::query("DELETE FROM parts WHERE id = ?")
                    .bind(source)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| Error::query("Failed to delete folded part", e))?;
            }

            sqlx::query(
                r#"
                UPDATE parts SET
                    binary_id = ?,
                    part_number = ?,
                    state = ?,
                    total_segments = ?
                WHERE id = ?
                "#,
            )
            .bind(binary_id)
            .bind(i64::from(*number))
            .bind(part_state::ASSIGNED)
            .bind(i64::from(part.total_segments))
            .bind(canonical)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::query("Failed to attach part", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::query("Failed to commit part attachment", e))?;

        Ok(())
    }

    /// Completion aggregates for every Binary, computed in SQL
    pub async fn binary_summaries(&self) -> Result<Vec<BinarySummary>> {
        sqlx::query_as::<_, BinarySummary>(
            r#"
            SELECT
                b.id, b.name, b.group_name, b.poster, b.posted, b.category_id, b.regex_id,
                b.req_id, b.total_parts,
                COUNT(DISTINCT p.part_number) AS parts_present,
                COALESCE(SUM(p.total_segments), 0) AS segments_total,
                COALESCE(SUM(MIN(p.total_segments, COALESCE(s.available, 0))), 0)
                    AS segments_available,
                COALESCE(SUM(s.bytes), 0) AS size,
                COALESCE(MAX(p.updated_at), b.updated_at) AS last_activity
            FROM binaries b
            LEFT JOIN parts p ON p.binary_id = b.id
            LEFT JOIN (
                SELECT part_id, COUNT(*) AS available, SUM(bytes) AS bytes
                FROM segments
                GROUP BY part_id
            ) s ON s.part_id = p.id
            GROUP BY b.id
            ORDER BY b.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to compute binary completion", e))
    }

    /// Load a Binary's parts with their segments, ordered by part number
    pub async fn binary_parts(&self, binary_id: i64) -> Result<Vec<PartWithSegments>> {
        let parts = sqlx::query_as::<_, PartRow>(
            r#"
            SELECT id, subject, group_name, poster, posted, total_segments,
                   binary_id, part_number, state, updated_at
            FROM parts
            WHERE binary_id = ?
            ORDER BY part_number, id
            "#,
        )
        .bind(binary_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to load binary parts", e))?;

        let segments = sqlx::query_as::<_, SegmentRow>(
            r#"
            SELECT s.part_id, s.number, s.message_id, s.bytes
            FROM segments s
            JOIN parts p ON p.id = s.part_id
            WHERE p.binary_id = ?
            ORDER BY s.part_id, s.number
            "#,
        )
        .bind(binary_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to load binary segments", e))?;

        let mut by_part: BTreeMap<i64, Vec<SegmentRow>> = BTreeMap::new();
        for segment in segments {
            by_part.entry(segment.part_id).or_default().push(segment);
        }

        Ok(parts
            .into_iter()
            .map(|part| PartWithSegments {
                segments: by_part.remove(&part.id).unwrap_or_default(),
                part,
            })
            .collect())
    }

    /// Get a Binary by name
    pub async fn get_binary(&self, name: &str) -> Result<Option<BinaryRow>> {
        sqlx::query_as::<_, BinaryRow>(
            r#"
            SELECT id, name, group_name, poster, posted, category_id, regex_id, req_id,
                   total_parts, created_at, updated_at
            FROM binaries
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to get binary", e))
    }

    /// Count all Binaries
    pub async fn count_binaries(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM binaries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to count binaries", e))
    }

    /// Ids of Binaries that have seen no new part since `cutoff`
    pub async fn stale_binary_ids(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>> {
        sqlx::query_scalar("SELECT id FROM binaries WHERE updated_at < ? ORDER BY id")
            .bind(cutoff.timestamp())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to list stale binaries", e))
    }

    /// Delete Binaries by id; their parts and segments go with them
    pub async fn delete_binaries(&self, ids: &[i64]) -> Result<u64> {
        let mut deleted = 0;
        for chunk in ids.chunks(MAX_BIND_VARIABLES) {
            let mut query_builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM binaries WHERE id IN (");
            let mut separated = query_builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            let result = query_builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| Error::query("Failed to delete binaries", e))?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }
}
