//! Part Store persistence.
//!
//! Parts are keyed by stripped subject; segments by (part, number). Concurrent
//! workers upserting the same subject converge because a segment row, once
//! written, is never replaced.

use crate::types::{Part, Segment};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use super::{Database, MAX_BIND_VARIABLES, PartRow, SegmentRow, from_unix, part_state};

const PART_COLUMNS: &str = "id, subject, group_name, poster, posted, total_segments, \
                            binary_id, part_number, state, updated_at";

impl Database {
    /// Merge a chunk of Parts into the store in one transaction
    ///
    /// Existing segment numbers are left untouched (first writer wins); the
    /// part's poster and declared segment count take the newest value and its
    /// post date the earliest. A chunk is atomic; separate chunks are not.
    pub async fn upsert_parts_chunk(&self, parts: &[Part]) -> Result<()> {
        if parts.is_empty() {
            return Ok(());
        }

        // 4 bind variables per segment row
        const SEGMENTS_PER_INSERT: usize = MAX_BIND_VARIABLES / 4;

        let now = Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::query("Failed to begin part upsert", e))?;

        for part in parts {
            let part_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO parts (
                    subject, group_name, poster, posted, total_segments, state, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(subject) DO UPDATE SET
                    poster = excluded.poster,
                    total_segments = excluded.total_segments,
                    posted = MIN(parts.posted, excluded.posted),
                    updated_at = excluded.updated_at
                RETURNING id
                "#,
            )
            .bind(&part.subject)
            .bind(&part.group_name)
            .bind(&part.poster)
            .bind(part.posted.timestamp())
            .bind(i64::from(part.total_segments))
            .bind(part_state::UNASSIGNED)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Error::query(&format!("Failed to upsert part '{}'", part.subject), e))?;

            let segments: Vec<&Segment> = part.segments.values().collect();
            for chunk in segments.chunks(SEGMENTS_PER_INSERT) {
                let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                    "INSERT OR IGNORE INTO segments (part_id, number, message_id, bytes) ",
                );
                query_builder.push_values(chunk, |mut b, segment| {
                    b.push_bind(part_id)
                        .push_bind(i64::from(segment.number))
                        .push_bind(&segment.message_id)
                        .push_bind(segment.bytes as i64);
                });
                query_builder
                    .build()
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| Error::query("Failed to insert segments batch", e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| Error::query("Failed to commit part upsert", e))?;

        Ok(())
    }

    /// Load a Part with its segments by stripped subject
    pub async fn get_part(&self, subject: &str) -> Result<Option<Part>> {
        let row = sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {} FROM parts WHERE subject = ?",
            PART_COLUMNS
        ))
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to get part", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let segments = self.part_segments(row.id).await?;
        Ok(Some(Part {
            subject: row.subject,
            group_name: row.group_name,
            poster: row.poster,
            posted: from_unix(row.posted),
            total_segments: row.total_segments.max(0) as u32,
            segments: segments
                .into_iter()
                .map(|s| {
                    let number = s.number.max(0) as u32;
                    (
                        number,
                        Segment {
                            number,
                            message_id: s.message_id,
                            bytes: s.bytes.max(0) as u64,
                        },
                    )
                })
                .collect(),
        }))
    }

    /// Segments of one part, ordered by number
    pub async fn part_segments(&self, part_id: i64) -> Result<Vec<SegmentRow>> {
        sqlx::query_as::<_, SegmentRow>(
            r#"
            SELECT part_id, number, message_id, bytes
            FROM segments
            WHERE part_id = ?
            ORDER BY number
            "#,
        )
        .bind(part_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to load segments", e))
    }

    /// Page through parts waiting for the assembler, ordered by id
    pub async fn unassigned_parts(&self, after_id: i64, limit: i64) -> Result<Vec<PartRow>> {
        sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {} FROM parts WHERE state = ? AND id > ? ORDER BY id LIMIT ?",
            PART_COLUMNS
        ))
        .bind(part_state::UNASSIGNED)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to list unassigned parts", e))
    }

    /// Mark parts that no rule could name; they wait for a rule reload or the stale sweep
    pub async fn mark_parts_unmatched(&self, ids: &[i64]) -> Result<()> {
        for chunk in ids.chunks(MAX_BIND_VARIABLES - 1) {
            let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE parts SET state = ");
            query_builder.push_bind(part_state::UNMATCHED);
            query_builder.push(" WHERE id IN (");
            let mut separated = query_builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            query_builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| Error::query("Failed to mark unmatched parts", e))?;
        }
        Ok(())
    }

    /// Return every unmatched part to the assembler's queue, returning how many moved
    pub async fn requeue_unmatched_parts(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE parts SET state = ? WHERE state = ?")
            .bind(part_state::UNASSIGNED)
            .bind(part_state::UNMATCHED)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to requeue unmatched parts", e))?;

        Ok(result.rows_affected())
    }

    /// Delete parts not attached to any Binary whose last segment arrived before `cutoff`
    pub async fn delete_stale_parts(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM parts WHERE binary_id IS NULL AND updated_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to delete stale parts", e))?;

        Ok(result.rows_affected())
    }

    /// Count all parts in the store
    pub async fn count_parts(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM parts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to count parts", e))
    }
}
