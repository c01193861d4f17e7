//! Custom test assertions for integration tests

use std::time::Duration;
use tokio::sync::broadcast;
use usenet_indexer::db::ReleaseRow;
use usenet_indexer::{Event, Indexer};

/// Drain every event already buffered on `events`
pub fn drain_events(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Wait until an event matching `predicate` arrives
///
/// Returns `None` on timeout or when the channel closes.
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    mut predicate: F,
) -> Option<Event>
where
    F: FnMut(&Event) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Get the only Release in the store
pub async fn single_release(indexer: &Indexer) -> ReleaseRow {
    let releases = indexer
        .db
        .list_releases(10)
        .await
        .expect("Failed to list releases");
    assert_eq!(
        releases.len(),
        1,
        "expected exactly one release, got {:?}",
        releases.iter().map(|r| &r.search_name).collect::<Vec<_>>()
    );
    releases.into_iter().next().expect("one release")
}

/// Assert the store holds no Releases
pub async fn assert_no_releases(indexer: &Indexer) {
    let count = indexer
        .db
        .count_releases()
        .await
        .expect("Failed to count releases");
    assert_eq!(count, 0, "expected no releases");
}

/// Assert the NZB file recorded on a Release exists and mentions `needle`
pub fn assert_nzb_contains(release: &ReleaseRow, needle: &str) {
    let document = std::fs::read_to_string(&release.nzb_ref)
        .unwrap_or_else(|e| panic!("NZB {} unreadable: {}", release.nzb_ref, e));
    assert!(
        document.contains(needle),
        "NZB {} does not mention {:?}",
        release.nzb_ref,
        needle
    );
}
