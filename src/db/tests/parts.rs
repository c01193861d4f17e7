use crate::db::*;
use crate::types::{Part, Segment};
use chrono::{Duration, Utc};
use tempfile::NamedTempFile;

fn part(subject: &str, segments: &[(u32, &str)], total: u32) -> Part {
    Part {
        subject: subject.to_string(),
        group_name: "alt.binaries.teevee".to_string(),
        poster: "poster@example.com".to_string(),
        posted: Utc::now(),
        total_segments: total,
        segments: segments
            .iter()
            .map(|(n, id)| {
                (
                    *n,
                    Segment {
                        number: *n,
                        message_id: id.to_string(),
                        bytes: 100_000,
                    },
                )
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_batches_merge_into_one_part() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.upsert_parts_chunk(&[part("Show.S01E01", &[(1, "<a@x>")], 3)])
        .await
        .unwrap();
    db.upsert_parts_chunk(&[part("Show.S01E01", &[(2, "<b@x>"), (3, "<c@x>")], 3)])
        .await
        .unwrap();

    let stored = db.get_part("Show.S01E01").await.unwrap().unwrap();
    assert_eq!(stored.available_segments(), 3);
    assert!(stored.is_complete());
    assert_eq!(db.count_parts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_first_segment_writer_wins() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.upsert_parts_chunk(&[part("Show.S01E01", &[(1, "<original@x>")], 2)])
        .await
        .unwrap();
    db.upsert_parts_chunk(&[part("Show.S01E01", &[(1, "<repost@x>")], 2)])
        .await
        .unwrap();

    let stored = db.get_part("Show.S01E01").await.unwrap().unwrap();
    assert_eq!(stored.segments[&1].message_id, "<original@x>");
}

#[tokio::test]
async fn test_segment_upsert_is_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let batch = part("Show.S01E01", &[(1, "<a@x>"), (2, "<b@x>")], 5);
    db.upsert_parts_chunk(&[batch.clone()]).await.unwrap();
    let once = db.get_part("Show.S01E01").await.unwrap().unwrap();

    db.upsert_parts_chunk(&[batch]).await.unwrap();
    let twice = db.get_part("Show.S01E01").await.unwrap().unwrap();

    assert_eq!(once.segments, twice.segments);
    assert_eq!(once.total_segments, twice.total_segments);
}

#[tokio::test]
async fn test_earliest_post_date_is_kept() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let mut late = part("Show.S01E01", &[(2, "<b@x>")], 2);
    late.posted = Utc::now();
    let mut early = part("Show.S01E01", &[(1, "<a@x>")], 2);
    early.posted = late.posted - Duration::hours(2);

    db.upsert_parts_chunk(&[late.clone()]).await.unwrap();
    db.upsert_parts_chunk(&[early.clone()]).await.unwrap();

    let stored = db.get_part("Show.S01E01").await.unwrap().unwrap();
    assert_eq!(stored.posted.timestamp(), early.posted.timestamp());
}

#[tokio::test]
async fn test_large_part_is_chunked_below_bind_limit() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let ids: Vec<(u32, String)> = (1..=1200).map(|n| (n, format!("<{n}@x>"))).collect();
    let refs: Vec<(u32, &str)> = ids.iter().map(|(n, id)| (*n, id.as_str())).collect();
    db.upsert_parts_chunk(&[part("Big.Release", &refs, 1200)])
        .await
        .unwrap();

    let stored = db.get_part("Big.Release").await.unwrap().unwrap();
    assert_eq!(stored.available_segments(), 1200);
}

#[tokio::test]
async fn test_unassigned_parts_page_by_cursor() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let parts: Vec<Part> = (1..=5)
        .map(|n| part(&format!("Show.S01E0{n}"), &[(1, "<a@x>")], 1))
        .collect();
    db.upsert_parts_chunk(&parts).await.unwrap();

    let first_page = db.unassigned_parts(0, 2).await.unwrap();
    assert_eq!(first_page.len(), 2);
    let second_page = db
        .unassigned_parts(first_page[1].id, 10)
        .await
        .unwrap();
    assert_eq!(second_page.len(), 3);

    // Unmatched parts leave the assembler's queue
    db.mark_parts_unmatched(&[second_page[0].id]).await.unwrap();
    let remaining = db.unassigned_parts(0, 10).await.unwrap();
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().all(|p| p.state == part_state::UNASSIGNED));

    // A rule reload puts them back
    assert_eq!(db.requeue_unmatched_parts().await.unwrap(), 1);
    assert_eq!(db.unassigned_parts(0, 10).await.unwrap().len(), 5);
    assert_eq!(db.requeue_unmatched_parts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_parts_are_swept() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.upsert_parts_chunk(&[part("Orphan", &[(1, "<a@x>")], 4)])
        .await
        .unwrap();

    // Nothing is older than an hour ago
    let deleted = db
        .delete_stale_parts(Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(deleted, 0);

    let deleted = db
        .delete_stale_parts(Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(db.count_parts().await.unwrap(), 0);

    // Segments go with their part
    let segments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM segments")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(segments, 0);
}
