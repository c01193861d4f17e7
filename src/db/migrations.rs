//! Database lifecycle and schema migrations.

use crate::assembler::DEFAULT_RULES;
use crate::categories::taxonomy::CATEGORIES;
use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;
use std::time::Duration;

use super::Database;

/// Scan workers write concurrently; a writer waits this long for the lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        // Connect to database with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let db = Self { pool };

        // Run migrations
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        execute(
            &mut conn,
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
            "create schema_version table",
        )
        .await?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate(&mut conn, 1).await?;
        }
        if current_version < 2 {
            Self::migrate(&mut conn, 2).await?;
        }

        Ok(())
    }

    /// Apply one migration inside a transaction
    async fn migrate(conn: &mut SqliteConnection, version: i32) -> Result<()> {
        tracing::info!(version, "Applying database migration");

        // Wrap migration in a transaction so partial failures don't leave the DB in a broken state
        execute(conn, "BEGIN", "begin transaction").await?;

        let result = async {
            match version {
                1 => Self::create_schema(conn).await?,
                2 => Self::seed_defaults(conn).await?,
                other => {
                    return Err(Error::Database(DatabaseError::MigrationFailed(format!(
                        "unknown migration v{}",
                        other
                    ))));
                }
            }
            Self::record_migration(conn, version).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => execute(conn, "COMMIT", "commit migration").await?,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!(version, "Database migration complete");
        Ok(())
    }

    /// Migration v1: tables and indexes
    async fn create_schema(conn: &mut SqliteConnection) -> Result<()> {
        let statements: &[(&str, &str)] = &[
            (
                r#"
                CREATE TABLE groups (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    active INTEGER NOT NULL DEFAULT 1,
                    first_article INTEGER,
                    last_article INTEGER,
                    last_updated INTEGER
                )
                "#,
                "create groups table",
            ),
            (
                r#"
                CREATE TABLE categories (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    parent_id INTEGER REFERENCES categories(id)
                )
                "#,
                "create categories table",
            ),
            (
                r#"
                CREATE TABLE regexes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    group_name TEXT NOT NULL,
                    pattern TEXT NOT NULL,
                    ordinal INTEGER NOT NULL,
                    category_id INTEGER,
                    status INTEGER NOT NULL DEFAULT 1,
                    description TEXT
                )
                "#,
                "create regexes table",
            ),
            (
                "CREATE INDEX idx_regexes_group ON regexes(group_name, status, ordinal)",
                "create regexes index",
            ),
            (
                r#"
                CREATE TABLE blacklists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    group_pattern TEXT NOT NULL,
                    subject_pattern TEXT NOT NULL,
                    status INTEGER NOT NULL DEFAULT 1,
                    description TEXT
                )
                "#,
                "create blacklists table",
            ),
            (
                r#"
                CREATE TABLE binaries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    group_name TEXT NOT NULL,
                    poster TEXT NOT NULL,
                    posted INTEGER NOT NULL,
                    category_id INTEGER,
                    regex_id INTEGER,
                    req_id TEXT,
                    total_parts INTEGER NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )
                "#,
                "create binaries table",
            ),
            (
                "CREATE INDEX idx_binaries_updated ON binaries(updated_at)",
                "create binaries index",
            ),
            (
                r#"
                CREATE TABLE parts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    subject TEXT NOT NULL UNIQUE,
                    group_name TEXT NOT NULL,
                    poster TEXT NOT NULL,
                    posted INTEGER NOT NULL,
                    total_segments INTEGER NOT NULL,
                    binary_id INTEGER REFERENCES binaries(id) ON DELETE CASCADE,
                    part_number INTEGER,
                    state INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )
                "#,
                "create parts table",
            ),
            (
                "CREATE INDEX idx_parts_binary ON parts(binary_id, part_number)",
                "create parts binary index",
            ),
            (
                "CREATE INDEX idx_parts_state ON parts(state, id)",
                "create parts state index",
            ),
            (
                r#"
                CREATE TABLE segments (
                    part_id INTEGER NOT NULL REFERENCES parts(id) ON DELETE CASCADE,
                    number INTEGER NOT NULL,
                    message_id TEXT NOT NULL,
                    bytes INTEGER NOT NULL,
                    PRIMARY KEY (part_id, number)
                )
                "#,
                "create segments table",
            ),
            (
                r#"
                CREATE TABLE releases (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    search_name TEXT NOT NULL,
                    posted INTEGER NOT NULL,
                    category_id INTEGER NOT NULL REFERENCES categories(id),
                    group_name TEXT NOT NULL,
                    poster TEXT NOT NULL,
                    regex_id INTEGER,
                    req_id TEXT,
                    nzb_ref TEXT NOT NULL,
                    nzb_size INTEGER NOT NULL,
                    total_parts INTEGER NOT NULL,
                    size INTEGER NOT NULL,
                    completion REAL NOT NULL,
                    file_count INTEGER NOT NULL,
                    archive_count INTEGER NOT NULL,
                    par2_count INTEGER NOT NULL,
                    info_count INTEGER NOT NULL,
                    status INTEGER NOT NULL DEFAULT 0,
                    grabs INTEGER NOT NULL DEFAULT 0,
                    passworded INTEGER NOT NULL DEFAULT 0,
                    added INTEGER NOT NULL,
                    updated INTEGER NOT NULL,
                    UNIQUE (search_name, posted)
                )
                "#,
                "create releases table",
            ),
            (
                "CREATE INDEX idx_releases_category ON releases(category_id, posted DESC)",
                "create releases index",
            ),
        ];

        for (sql, context) in statements {
            execute(conn, sql, context).await?;
        }
        Ok(())
    }

    /// Migration v2: category tree and the generic assembly rules
    async fn seed_defaults(conn: &mut SqliteConnection) -> Result<()> {
        for (id, name, parent) in CATEGORIES {
            sqlx::query("INSERT OR IGNORE INTO categories (id, name, parent_id) VALUES (?, ?, ?)")
                .bind(id.get())
                .bind(*name)
                .bind(parent.map(|p| p.get()))
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::MigrationFailed(format!(
                        "Failed to seed category {}: {}",
                        id, e
                    )))
                })?;
        }

        for rule in DEFAULT_RULES {
            sqlx::query(
                r#"
                INSERT INTO regexes (group_name, pattern, ordinal, category_id, status, description)
                VALUES ('*', ?, ?, NULL, 1, ?)
                "#,
            )
            .bind(rule.pattern)
            .bind(rule.ordinal)
            .bind(rule.description)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to seed default rule: {}",
                    e
                )))
            })?;
        }

        Ok(())
    }

    async fn record_migration(conn: &mut SqliteConnection, version: i32) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to record migration: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Access the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn execute(conn: &mut SqliteConnection, sql: &str, context: &str) -> Result<()> {
    sqlx::query(sql).execute(&mut *conn).await.map_err(|e| {
        Error::Database(DatabaseError::MigrationFailed(format!(
            "Failed to {}: {}",
            context, e
        )))
    })?;
    Ok(())
}
