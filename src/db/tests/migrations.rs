use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_database_creation() {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path();

    let db = Database::new(db_path).await.unwrap();

    // Verify tables exist
    let mut conn = db.pool.acquire().await.unwrap();

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&mut *conn)
            .await
            .unwrap();

    for table in [
        "groups",
        "parts",
        "segments",
        "binaries",
        "releases",
        "categories",
        "regexes",
        "blacklists",
        "schema_version",
    ] {
        assert!(tables.contains(&table.to_string()), "missing table {table}");
    }

    drop(conn);
    db.close().await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path();

    let db = Database::new(db_path).await.unwrap();
    let rules_before = db.active_regexes().await.unwrap().len();
    db.close().await;

    // Reopening must not re-run migrations or duplicate seed rows
    let db = Database::new(db_path).await.unwrap();
    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version")
        .fetch_all(db.pool())
        .await
        .unwrap();

    assert_eq!(versions, vec![1, 2]);
    assert_eq!(db.active_regexes().await.unwrap().len(), rules_before);

    db.close().await;
}

#[tokio::test]
async fn test_seeded_taxonomy_and_rules() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let categories = db.categories().await.unwrap();
    assert_eq!(
        categories.len(),
        crate::categories::taxonomy::CATEGORIES.len()
    );

    let (leaf, parent) = db
        .category_with_parent(crate::categories::taxonomy::TV_HD)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(leaf.name, "HD");
    assert_eq!(parent.unwrap().name, "TV");

    let (misc, no_parent) = db
        .category_with_parent(crate::categories::taxonomy::MISC)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(misc.name, "Misc");
    assert!(no_parent.is_none());

    let rules = db.active_regexes().await.unwrap();
    assert_eq!(rules.len(), crate::assembler::DEFAULT_RULES.len());
    assert!(rules.iter().all(|r| r.group_name == "*"));
    assert!(db.active_blacklists().await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_unknown_category_is_none() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let missing = db
        .category_with_parent(crate::types::CategoryId(4242))
        .await
        .unwrap();
    assert!(missing.is_none());

    db.close().await;
}
