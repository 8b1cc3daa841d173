//! Generation telemetry: a bounded bus from the simulation to a consumer thread.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use anyhow::{Context, Result, anyhow};
use crossfire::mpmc;
use crossfire::{MAsyncTx, MRx, TrySendError, detect_backoff_cfg};
use smartrockets_core::{GenerationSink, GenerationSummary};
use tracing::{info, warn};

pub type SummarySender = MAsyncTx<GenerationSummary>;
pub type SummaryReceiver = MRx<GenerationSummary>;

/// Bounded queue; `capacity` is the high watermark before summaries are dropped.
///
/// A dropped summary is counted by [`ChannelSink::dropped`] and logged at `warn`.
pub fn create_telemetry_bus(capacity: usize) -> (SummarySender, SummaryReceiver) {
    detect_backoff_cfg();
    mpmc::bounded_tx_async_rx_blocking(capacity)
}

/// Sink that forwards summaries onto the bus without ever blocking the simulation.
pub struct ChannelSink {
    tx: SummarySender,
    dropped: usize,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: SummarySender) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Summaries discarded because the queue was full or the consumer had gone away.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl GenerationSink for ChannelSink {
    fn on_generation(&mut self, summary: &GenerationSummary) {
        match self.tx.try_send(*summary) {
            Ok(()) => {}
            Err(TrySendError::Full(summary)) => {
                self.dropped += 1;
                warn!(
                    generation = summary.generation.0,
                    "telemetry queue full; dropping generation summary"
                );
            }
            Err(TrySendError::Disconnected(summary)) => {
                self.dropped += 1;
                warn!(
                    generation = summary.generation.0,
                    "telemetry consumer disconnected"
                );
            }
        }
    }
}

/// Worker thread draining the bus, logging each summary and optionally writing JSON lines.
pub struct TelemetryConsumer {
    received: Arc<Mutex<Vec<GenerationSummary>>>,
    handle: thread::JoinHandle<()>,
}

impl TelemetryConsumer {
    /// Start the worker. It exits once every sender has been dropped.
    pub fn spawn(receiver: SummaryReceiver, output: Option<&Path>) -> Result<Self> {
        let mut writer = match output {
            Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
                format!("failed to create summary output {}", path.display())
            })?)),
            None => None,
        };
        let received = Arc::new(Mutex::new(Vec::new()));
        let worker_received = Arc::clone(&received);
        let handle = thread::Builder::new()
            .name("smartrockets-telemetry".into())
            .spawn(move || {
                while let Ok(summary) = receiver.recv() {
                    info!(
                        generation = summary.generation.0,
                        max_fitness = summary.max_fitness,
                        avg_fitness = summary.avg_fitness,
                        "telemetry"
                    );
                    if let Some(out) = writer.as_mut()
                        && let Err(err) = write_summary(out, &summary)
                    {
                        warn!(%err, "failed to write generation summary");
                    }
                    worker_received
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(summary);
                }
                if let Some(out) = writer.as_mut()
                    && let Err(err) = out.flush()
                {
                    warn!(%err, "failed to flush summary output");
                }
            })
            .context("failed to spawn telemetry worker thread")?;
        Ok(Self { received, handle })
    }

    /// Wait for the worker to drain the bus and return everything it consumed, in order.
    ///
    /// Blocks until every sender has been dropped.
    pub fn finish(self) -> Result<Vec<GenerationSummary>> {
        self.handle
            .join()
            .map_err(|err| anyhow!("telemetry worker panicked: {err:?}"))?;
        let mut received = self
            .received
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::take(&mut *received))
    }
}

fn write_summary(out: &mut impl Write, summary: &GenerationSummary) -> Result<()> {
    serde_json::to_writer(&mut *out, summary)?;
    out.write_all(b"\n")?;
    Ok(())
}
