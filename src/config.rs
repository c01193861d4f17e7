//! Configuration types for usenet-indexer

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Overview scanning configuration
///
/// Groups settings related to how newsgroups are scanned and how much work a
/// single worker does before flushing to the store.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of groups scanned in parallel (default: 4)
    #[serde(default = "default_update_threads")]
    pub update_threads: usize,

    /// Maximum articles requested per overview block (default: 20000)
    #[serde(default = "default_message_scan_limit")]
    pub message_scan_limit: u64,

    /// How far back a newly activated group is scanned, in days (default: 5)
    #[serde(default = "default_new_group_scan_days")]
    pub new_group_scan_days: f64,

    /// How far back backfill reaches, in days (default: 10)
    #[serde(default = "default_backfill_days")]
    pub backfill_days: f64,

    /// Segments accumulated in memory before a Part Store flush (default: 500)
    #[serde(default = "default_segment_flush_size")]
    pub segment_flush_size: usize,

    /// Retries after a failed overview block request before the block is
    /// skipped (default: 3, so up to 4 requests per block)
    #[serde(default = "default_block_retries")]
    pub block_retries: u32,

    /// Upper bound on probes made by the date bisection (default: 64)
    #[serde(default = "default_bisect_max_iterations")]
    pub bisect_max_iterations: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            update_threads: default_update_threads(),
            message_scan_limit: default_message_scan_limit(),
            new_group_scan_days: default_new_group_scan_days(),
            backfill_days: default_backfill_days(),
            segment_flush_size: default_segment_flush_size(),
            block_retries: default_block_retries(),
            bisect_max_iterations: default_bisect_max_iterations(),
        }
    }
}

impl ScanConfig {
    /// Requests made for one overview block: the first plus its retries
    pub fn block_attempts(&self) -> u32 {
        self.block_retries.saturating_add(1)
    }
}

/// Release promotion configuration
///
/// Groups the completion policies and timing used when Binaries are promoted
/// to Releases. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostprocessConfig {
    /// Minimum number of archive (rar/zip) volumes a Binary needs (default: 1)
    ///
    /// Postings carrying only NZB/PAR2/NFO files fall below this and are discarded.
    #[serde(default = "default_min_archives")]
    pub min_archives: u32,

    /// Minimum completion percentage for promotion (default: 99.0)
    #[serde(default = "default_min_completion")]
    pub min_completion: f64,

    /// Sleep between full indexing cycles (default: 5 minutes)
    #[serde(default = "default_postprocess_wait", with = "duration_serde")]
    pub postprocess_wait: Duration,

    /// Binaries and unassigned parts older than this are deleted (default: 3 days)
    #[serde(default = "default_dead_binary_age", with = "duration_serde")]
    pub dead_binary_age: Duration,

    /// Age after which a Part without any part counter is treated as a single-part Binary
    /// (default: 3 hours)
    #[serde(default = "default_missing_parts_grace", with = "duration_serde")]
    pub missing_parts_grace: Duration,

    /// How long a Binary below 100% completion waits for delayed segments before
    /// it may be promoted under `min_completion` (default: 10 minutes)
    #[serde(default = "default_incomplete_grace", with = "duration_serde")]
    pub incomplete_grace: Duration,

    /// Directory receiving generated NZB files (default: "./nzbs")
    #[serde(default = "default_nzb_dir")]
    pub nzb_dir: PathBuf,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            min_archives: default_min_archives(),
            min_completion: default_min_completion(),
            postprocess_wait: default_postprocess_wait(),
            dead_binary_age: default_dead_binary_age(),
            missing_parts_grace: default_missing_parts_grace(),
            incomplete_grace: default_incomplete_grace(),
            nzb_dir: default_nzb_dir(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./usenet-indexer.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for the [`Indexer`](crate::Indexer)
///
/// Fields are organized into logical sub-configs:
/// - [`scan`](ScanConfig) - overview scanning and worker parallelism
/// - [`postprocess`](PostprocessConfig) - completion policies and cycle timing
/// - [`persistence`](PersistenceConfig) - database location
/// - [`retry`](RetryConfig) - backoff between block retries
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// NNTP server configurations (the first one is used for scanning)
    pub servers: Vec<ServerConfig>,

    /// Newsgroups activated on startup
    #[serde(default)]
    pub groups: Vec<String>,

    /// Overview scanning settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Release promotion settings
    #[serde(default)]
    pub postprocess: PostprocessConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Retry behaviour for failed overview blocks
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their defaults; the result is validated before it is returned.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the indexer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(Error::config("servers", "at least one server is required"));
        }
        if self.scan.update_threads == 0 {
            return Err(Error::config("scan.update_threads", "must be at least 1"));
        }
        if self.scan.message_scan_limit == 0 {
            return Err(Error::config("scan.message_scan_limit", "must be at least 1"));
        }
        if self.scan.segment_flush_size == 0 {
            return Err(Error::config("scan.segment_flush_size", "must be at least 1"));
        }
        if self.scan.new_group_scan_days < 0.0 || self.scan.backfill_days < 0.0 {
            return Err(Error::config(
                "scan.backfill_days",
                "day offsets cannot be negative",
            ));
        }
        let min_completion = self.postprocess.min_completion;
        if !(min_completion > 0.0 && min_completion <= 100.0) {
            return Err(Error::config(
                "postprocess.min_completion",
                format!("{} is outside (0, 100]", min_completion),
            ));
        }
        Ok(())
    }
}

/// NNTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname
    pub host: String,

    /// Server port (typically 119 for unencrypted, 563 for TLS)
    pub port: u16,

    /// Use TLS (implicit TLS, not STARTTLS)
    pub tls: bool,

    /// Username for authentication
    pub username: Option<String>,

    /// Password for authentication
    pub password: Option<String>,
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

// Default value functions
fn default_update_threads() -> usize {
    4
}

fn default_message_scan_limit() -> u64 {
    20_000
}

fn default_new_group_scan_days() -> f64 {
    5.0
}

fn default_backfill_days() -> f64 {
    10.0
}

fn default_segment_flush_size() -> usize {
    500
}

fn default_block_retries() -> u32 {
    3
}

fn default_bisect_max_iterations() -> u32 {
    64
}

fn default_min_archives() -> u32 {
    1
}

fn default_min_completion() -> f64 {
    99.0
}

fn default_postprocess_wait() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_dead_binary_age() -> Duration {
    Duration::from_secs(3 * 24 * 60 * 60) // 3 days
}

fn default_missing_parts_grace() -> Duration {
    Duration::from_secs(3 * 60 * 60) // 3 hours
}

fn default_incomplete_grace() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_nzb_dir() -> PathBuf {
    PathBuf::from("nzbs")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("usenet-indexer.db")
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Conversion from our ServerConfig to nntp-rs's ServerConfig
impl From<ServerConfig> for nntp_rs::ServerConfig {
    fn from(config: ServerConfig) -> Self {
        nntp_rs::ServerConfig {
            host: config.host,
            port: config.port,
            tls: config.tls,
            allow_insecure_tls: false,
            username: config.username.unwrap_or_default(),
            password: config.password.unwrap_or_default(),
        }
    }
}
