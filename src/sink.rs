use std::fs;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::schema::Batch;

/// ============================================================
/// BatchSink
/// ============================================================
///
/// Output side of a collection run.
///
/// CONTRACT:
/// - Accepts exactly one `post` per completed run
/// - Must be safe to share between concurrent workers
/// - Delivery, ordering across workers and backpressure are
///   the consumer's business
///
/// Both tokio mpsc flavours are multi-producer and implement
/// this trait directly, so workers simply hold a cloned sender.
#[async_trait::async_trait]
pub trait BatchSink: Send + Sync {
    /// Hands one batch to the consumer.
    ///
    /// Fails when the consumer side has gone away.
    async fn post(&self, batch: Batch) -> Result<()>;
}

#[async_trait::async_trait]
impl BatchSink for mpsc::Sender<Batch> {
    /// Waits for queue capacity, never drops.
    async fn post(&self, batch: Batch) -> Result<()> {
        self.send(batch)
            .await
            .map_err(|e| anyhow::anyhow!("batch receiver closed (worker {})", e.0.worker))
    }
}

#[async_trait::async_trait]
impl BatchSink for mpsc::UnboundedSender<Batch> {
    async fn post(&self, batch: Batch) -> Result<()> {
        self.send(batch)
            .map_err(|e| anyhow::anyhow!("batch receiver closed (worker {})", e.0.worker))
    }
}

/// Receives batches until every sender has been dropped.
///
/// Batches come back in the order they were posted, which
/// across workers is the order they finished.
pub async fn drain_batches(mut rx: mpsc::UnboundedReceiver<Batch>) -> Vec<Batch> {
    let mut batches = Vec::new();

    while let Some(batch) = rx.recv().await {
        log::debug!(
            "received batch from worker {} ({} records)",
            batch.worker,
            batch.records.len()
        );
        batches.push(batch);
    }

    batches
}

/// Writes batches to `path` as a pretty-printed JSON array.
pub fn write_batches(path: &str, batches: &[Batch]) -> Result<()> {
    let json = serde_json::to_string_pretty(batches)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path))?;
    Ok(())
}
