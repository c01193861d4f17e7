use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_activate_and_list_groups() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.activate_group("alt.binaries.teevee").await.unwrap();
    db.activate_group("alt.binaries.moovee").await.unwrap();
    // Activating twice is harmless
    db.activate_group("alt.binaries.teevee").await.unwrap();

    let groups = db.active_groups().await.unwrap();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["alt.binaries.moovee", "alt.binaries.teevee"]);
    assert!(groups.iter().all(|g| g.is_new()));

    db.deactivate_group("alt.binaries.moovee").await.unwrap();
    let groups = db.active_groups().await.unwrap();
    assert_eq!(groups.len(), 1);

    // Bookkeeping survives deactivation
    let moovee = db.get_group("alt.binaries.moovee").await.unwrap().unwrap();
    assert_eq!(moovee.active, 0);
}

#[tokio::test]
async fn test_scanned_range_is_monotonic() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    db.activate_group("alt.binaries.teevee").await.unwrap();

    db.record_scanned_range("alt.binaries.teevee", 1000, 2000)
        .await
        .unwrap();
    let group = db.get_group("alt.binaries.teevee").await.unwrap().unwrap();
    assert_eq!(group.first_article, Some(1000));
    assert_eq!(group.last_article, Some(2000));
    assert!(group.last_updated.is_some());
    assert!(!group.is_new());

    // A re-run of an older window never moves the bounds inward
    db.record_scanned_range("alt.binaries.teevee", 1500, 1800)
        .await
        .unwrap();
    let group = db.get_group("alt.binaries.teevee").await.unwrap().unwrap();
    assert_eq!(group.first_article, Some(1000));
    assert_eq!(group.last_article, Some(2000));

    // Update extends last, backfill extends first
    db.record_scanned_range("alt.binaries.teevee", 2001, 2500)
        .await
        .unwrap();
    db.record_scanned_range("alt.binaries.teevee", 500, 999)
        .await
        .unwrap();
    let group = db.get_group("alt.binaries.teevee").await.unwrap().unwrap();
    assert_eq!(group.first_article, Some(500));
    assert_eq!(group.last_article, Some(2500));
}

#[tokio::test]
async fn test_scanned_range_for_unknown_group_is_not_found() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let result = db.record_scanned_range("alt.binaries.nowhere", 1, 2).await;
    assert!(matches!(result, Err(crate::Error::NotFound(_))));
}
