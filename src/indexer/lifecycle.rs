//! Run loop and shutdown coordination

use tokio_util::sync::CancellationToken;

use super::Indexer;
use crate::error::Result;
use crate::types::Event;

impl Indexer {
    /// Run indexing cycles until `cancel` fires or [`shutdown`](Self::shutdown) is called
    ///
    /// A cycle that has started always runs to completion; only the wait
    /// between cycles is interrupted. A failed cycle is logged and the loop
    /// carries on with the next one.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let wait = self.config.postprocess.postprocess_wait;
        tracing::info!(wait_secs = wait.as_secs(), "indexer run loop started");

        loop {
            if cancel.is_cancelled() || self.shutdown_token.is_cancelled() {
                break;
            }

            if let Err(e) = self.run_cycle().await {
                tracing::error!(error = %e, code = e.code(), "indexing cycle failed");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.shutdown_token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        tracing::info!("indexer run loop stopped");
        Ok(())
    }

    /// Stop starting new cycles and notify subscribers
    ///
    /// A cycle in progress is not interrupted; every phase is safe to re-run,
    /// so work lost to a later process exit is redone by the next cycle.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");
        self.shutdown_token.cancel();

        let _ = self.event_tx.send(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
