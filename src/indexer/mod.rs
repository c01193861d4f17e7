//! Indexer orchestration split into focused submodules.
//!
//! The `Indexer` struct and its methods are organized by domain:
//! - [`cycle`] - Group fan-out, the scan barrier and the post-scan phases
//! - [`lifecycle`] - The run loop and shutdown coordination

mod cycle;
mod lifecycle;

pub use cycle::ScanMode;

use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use crate::artifact::{ArtifactStore, FsArtifactStore};
use crate::assembler::Assembler;
use crate::categories::Classifier;
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::nntp::{NntpSessionFactory, SessionFactory};
use crate::releases::Promoter;
use crate::types::Event;

/// Main indexer instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Indexer {
    /// Database instance for persistence (wrapped in Arc for sharing across scan workers)
    /// Public for integration tests to inspect parts, binaries and releases
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Opens one news server session per scan worker
    pub(crate) sessions: Arc<dyn SessionFactory>,
    /// Assembly rules, replaced only by [`Indexer::reload_rules`]
    pub(crate) assembler: Arc<RwLock<Arc<Assembler>>>,
    /// Completion policies, classifier and artifact store
    pub(crate) promoter: Arc<Promoter>,
    /// Cancelled once shutdown starts; no cycle starts afterwards
    pub(crate) shutdown_token: CancellationToken,
}

impl Indexer {
    /// Create an indexer from configuration
    ///
    /// This initializes all components:
    /// - Validates the configuration
    /// - Opens the SQLite database and runs migrations
    /// - Connects scan sessions to the first configured server
    /// - Writes NZB files under `postprocess.nzb_dir`
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        let server = config
            .servers
            .first()
            .cloned()
            .ok_or_else(|| Error::config("servers", "at least one server is required"))?;
        let sessions = Arc::new(NntpSessionFactory::new(server));
        let store = Arc::new(FsArtifactStore::new(config.postprocess.nzb_dir.clone()));

        Self::with_components(config, db, sessions, store).await
    }

    /// Create an indexer over explicit collaborators
    ///
    /// Used to plug in another news source or artifact store; the
    /// configuration is taken as is.
    pub async fn with_components(
        config: Config,
        db: Database,
        sessions: Arc<dyn SessionFactory>,
        store: Arc<dyn ArtifactStore>,
    ) -> Result<Self> {
        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        for group in &config.groups {
            db.activate_group(group).await?;
        }

        let assembler = Assembler::load(&db, config.postprocess.missing_parts_grace).await?;
        let promoter = Promoter::new(
            &config.postprocess,
            Classifier::builtin()?,
            store,
            event_tx.clone(),
        )?;

        tracing::info!(
            groups = config.groups.len(),
            rules = assembler.rules().len(),
            "indexer initialized"
        );

        Ok(Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            sessions,
            assembler: Arc::new(RwLock::new(Arc::new(assembler))),
            promoter: Arc::new(promoter),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Subscribe to indexer events
    ///
    /// Each subscriber receives all events independently. Events are buffered;
    /// a subscriber that falls too far behind misses the oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Start scanning a group from the next cycle on
    pub async fn add_group(&self, name: &str) -> Result<()> {
        self.db.activate_group(name).await
    }

    /// Stop scanning a group; its bookkeeping is kept
    pub async fn remove_group(&self, name: &str) -> Result<()> {
        self.db.deactivate_group(name).await
    }

    /// Load the assembly rules from the store again
    ///
    /// Rules disabled since the last load (including self-healed ones) are
    /// dropped; rules added to the store are picked up. Parts no rule could
    /// name are queued for assembly again so the new rules see them.
    pub async fn reload_rules(&self) -> Result<()> {
        let assembler =
            Assembler::load(&self.db, self.config.postprocess.missing_parts_grace).await?;
        let requeued = self.db.requeue_unmatched_parts().await?;
        tracing::info!(
            rules = assembler.rules().len(),
            requeued_parts = requeued,
            "reloaded assembly rules"
        );
        *self.assembler.write().await = Arc::new(assembler);
        Ok(())
    }
}
