//! Test configuration helpers for loading .env credentials and creating test indexers

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use usenet_indexer::config::PersistenceConfig;
use usenet_indexer::{Config, Database, FsArtifactStore, Indexer, MemoryNewsServer, ServerConfig};

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Load NNTP server configuration from environment variables
///
/// Required environment variables:
/// - `NNTP_HOST` - Server hostname
/// - `NNTP_USERNAME` - Authentication username
/// - `NNTP_PASSWORD` - Authentication password
///
/// Optional environment variables:
/// - `NNTP_PORT_SSL` - TLS port (default: 563)
pub fn load_server_config() -> Result<ServerConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let host = std::env::var("NNTP_HOST")
        .map_err(|_| ConfigError("NNTP_HOST not set in environment".to_string()))?;

    let port: u16 = std::env::var("NNTP_PORT_SSL")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(563);

    let username = std::env::var("NNTP_USERNAME")
        .map_err(|_| ConfigError("NNTP_USERNAME not set in environment".to_string()))?;

    let password = std::env::var("NNTP_PASSWORD")
        .map_err(|_| ConfigError("NNTP_PASSWORD not set in environment".to_string()))?;

    Ok(ServerConfig {
        host,
        port,
        tls: true,
        username: Some(username),
        password: Some(password),
    })
}

/// Group scanned by live tests (`NNTP_TEST_GROUP`, default alt.binaries.test)
pub fn live_test_group() -> String {
    dotenvy::dotenv().ok();
    std::env::var("NNTP_TEST_GROUP").unwrap_or_else(|_| "alt.binaries.test".to_string())
}

/// Check if live test credentials are available
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("NNTP_HOST").is_ok()
        && std::env::var("NNTP_USERNAME").is_ok()
        && std::env::var("NNTP_PASSWORD").is_ok()
}

/// Skip test if credentials are not available
#[macro_export]
macro_rules! skip_if_no_credentials {
    () => {
        if !$crate::common::has_live_credentials() {
            eprintln!("Skipping test: NNTP credentials not found in .env");
            return;
        }
    };
}

/// Configuration rooted in `temp_dir` with small blocks and no retry delay
pub fn test_config(temp_dir: &TempDir, groups: &[&str]) -> Config {
    let mut config = Config {
        groups: groups.iter().map(|g| g.to_string()).collect(),
        persistence: PersistenceConfig {
            database_path: temp_dir.path().join("test.db"),
        },
        ..Default::default()
    };
    config.scan.message_scan_limit = 50;
    config.scan.update_threads = 2;
    config.postprocess.nzb_dir = temp_dir.path().join("nzbs");
    config.retry.initial_delay = Duration::from_millis(1);
    config.retry.max_delay = Duration::from_millis(5);
    config.retry.jitter = false;
    config
}

/// Create an indexer over an in-memory news server
///
/// Returns the indexer, the temp directory holding its database and NZB
/// files (keep it alive for the test duration) and the server to post to.
pub async fn memory_indexer(groups: &[&str]) -> (Indexer, TempDir, MemoryNewsServer) {
    memory_indexer_with(groups, |_| {}).await
}

/// Like [`memory_indexer`], with a hook to adjust the configuration first
pub async fn memory_indexer_with(
    groups: &[&str],
    adjust: impl FnOnce(&mut Config),
) -> (Indexer, TempDir, MemoryNewsServer) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(&temp_dir, groups);
    adjust(&mut config);

    let server = MemoryNewsServer::new();
    for group in groups {
        server.create_group(group).await;
    }

    let db = Database::new(&config.persistence.database_path)
        .await
        .expect("Failed to open database");
    let store = Arc::new(FsArtifactStore::new(config.postprocess.nzb_dir.clone()));

    let indexer = Indexer::with_components(config, db, Arc::new(server.clone()), store)
        .await
        .expect("Failed to create indexer");

    (indexer, temp_dir, server)
}

/// Create an indexer against the live provider from `.env`
pub async fn create_live_indexer(group: &str) -> Result<(Indexer, TempDir), ConfigError> {
    let server = load_server_config()?;
    let temp_dir = tempfile::tempdir()
        .map_err(|e| ConfigError(format!("Failed to create temp dir: {}", e)))?;

    let mut config = test_config(&temp_dir, &[group]);
    config.servers = vec![server];
    config.scan.message_scan_limit = 5_000;
    // Keep the first scan small: only the last hour of the group
    config.scan.new_group_scan_days = 1.0 / 24.0;

    let indexer = Indexer::new(config)
        .await
        .map_err(|e| ConfigError(format!("Failed to create indexer: {}", e)))?;

    Ok((indexer, temp_dir))
}
