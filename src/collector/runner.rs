use std::fmt::Display;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    config::{Config, EndpointConfig},
    endpoint,
    metrics::METRICS,
    schema::{Batch, Frame, TimedRecord},
    sink::BatchSink,
    util,
};

/// How a single collection run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Budget reached, batch posted.
    Completed,

    /// Stream ended, closed or failed before the budget. Nothing posted.
    Disconnected,

    /// No frame within the idle timeout. Nothing posted.
    IdleTimeout,
}

/// Inputs of one run. Consumed by `collect`.
pub struct RunContext<K> {
    /// Label used in logs and on the posted batch
    pub worker: usize,

    /// Collection budget measured from the first ready moment
    pub budget: Duration,

    /// Upper bound on the wait for any single frame
    pub idle_timeout: Option<Duration>,

    /// Where the finished batch goes
    pub sink: K,
}

/// Runs one collector against the configured endpoint.
///
/// This function:
/// - Opens a single WebSocket connection (no retry)
/// - Collects frames until the budget is reached
/// - Posts the batch to `sink`
///
/// The connection lives on this call's stack and is dropped on
/// every exit path, including task abort.
///
/// ERRORS:
/// - Connection failure
/// - Sink rejecting the batch
pub async fn run_worker<K: BatchSink>(
    budget: Duration,
    sink: K,
    worker: usize,
    endpoint_cfg: &EndpointConfig,
    idle_timeout: Option<Duration>,
) -> anyhow::Result<RunOutcome> {
    info!("worker {} started ({})", worker, endpoint_cfg.url);
    METRICS.runs_started.fetch_add(1, Ordering::Relaxed);

    let ws = endpoint::connect(endpoint_cfg).await?;

    collect(
        ws,
        RunContext {
            worker,
            budget,
            idle_timeout,
            sink,
        },
    )
    .await
}

/// Timed collection loop over any frame source.
///
/// LOOP:
/// - Wait for the next frame (the only suspension point)
/// - Stamp it, append it
/// - If elapsed >= budget: post everything once and return
///
/// Ping and pong frames are answered by the transport and are
/// not recorded. A close frame, a read error or the end of the
/// stream finishes the run without posting anything.
pub async fn collect<S, E, K>(mut frames: S, ctx: RunContext<K>) -> anyhow::Result<RunOutcome>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    K: BatchSink,
{
    let RunContext {
        worker,
        budget,
        idle_timeout,
        sink,
    } = ctx;

    let started = Instant::now();
    let started_at = util::now_ns();
    let mut records: Vec<TimedRecord> = Vec::new();

    loop {
        let next = match idle_timeout {
            Some(idle) => match timeout(idle, frames.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(
                        "worker {} idle for {:?}, giving up ({} records dropped)",
                        worker,
                        idle,
                        records.len()
                    );
                    METRICS.runs_incomplete.fetch_add(1, Ordering::Relaxed);
                    return Ok(RunOutcome::IdleTimeout);
                }
            },
            None => frames.next().await,
        };

        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                warn!("worker {} read error: {}", worker, e);
                break;
            }
            None => break,
        };

        let frame = match msg {
            Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
            Message::Close(_) => break,

            // ping / pong / raw frames
            _ => continue,
        };

        let elapsed = started.elapsed();
        records.push(TimedRecord {
            msg: frame,
            at: util::now_ns(),
            elapsed_ns: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
        });
        METRICS.frames_received.fetch_add(1, Ordering::Relaxed);
        trace!("worker {} frame #{} at {:?}", worker, records.len(), elapsed);

        if elapsed >= budget {
            let count = records.len();

            sink.post(Batch {
                worker,
                started_at,
                finished_at: util::now_ns(),
                records,
            })
            .await?;

            METRICS.batches_posted.fetch_add(1, Ordering::Relaxed);
            METRICS.runs_completed.fetch_add(1, Ordering::Relaxed);
            info!("worker {} finished ({} records)", worker, count);

            return Ok(RunOutcome::Completed);
        }
    }

    // Not reconnecting: the partial run is discarded.
    warn!(
        "worker {} disconnected after {:?}, {} records dropped",
        worker,
        started.elapsed(),
        records.len()
    );
    METRICS.runs_incomplete.fetch_add(1, Ordering::Relaxed);

    Ok(RunOutcome::Disconnected)
}

/// Spawns `cfg.run.workers` collectors sharing one sink.
///
/// Worker ids run from 1 to N. Each task is isolated: a failing
/// worker is logged and does not affect the others.
pub fn spawn_workers<K>(cfg: &Config, sink: K) -> anyhow::Result<JoinSet<()>>
where
    K: BatchSink + Clone + 'static,
{
    let budget = cfg.run.budget()?;
    let idle_timeout = cfg.run.idle_timeout()?;
    let mut set = JoinSet::new();

    for worker in 1..=cfg.run.workers {
        let sink = sink.clone();
        let endpoint_cfg = cfg.endpoint.clone();

        set.spawn(async move {
            match run_worker(budget, sink, worker, &endpoint_cfg, idle_timeout).await {
                Ok(outcome) => debug!("worker {} ended: {:?}", worker, outcome),
                Err(e) => {
                    METRICS.runs_incomplete.fetch_add(1, Ordering::Relaxed);
                    error!("worker {} failed: {:#}", worker, e);
                }
            }
        });
    }

    Ok(set)
}
