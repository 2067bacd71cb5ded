//! The acquisition loop.
//!
//! Reads lines, decodes them against the schema, encodes the result and
//! sends it. Per-line problems drop that line only. The loop ends when it is
//! cancelled, when the line stream fails or ends, or when sends keep failing.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use serial2osc_core::{decode_line, encode, OutboundMessage, RuntimeConfig, Schema};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::error::{BridgeError, LineError, SendError};
use crate::sender::MessageSink;
use crate::stats::BridgeStats;

/// Default number of consecutive send failures before giving up.
pub const DEFAULT_MAX_SEND_FAILURES: u32 = 10;

/// Read-decode-encode-send driver. Holds only shared read-only state.
#[derive(Debug, Clone)]
pub struct AcquisitionLoop {
    schema: Arc<Schema>,
    config: Arc<RuntimeConfig>,
    stats: Arc<BridgeStats>,
    max_send_failures: u32,
}

impl AcquisitionLoop {
    pub fn new(schema: Arc<Schema>, config: Arc<RuntimeConfig>) -> Self {
        Self {
            schema,
            config,
            stats: Arc::new(BridgeStats::new()),
            max_send_failures: DEFAULT_MAX_SEND_FAILURES,
        }
    }

    /// Set the consecutive send failure limit. Zero is treated as one.
    #[must_use]
    pub fn with_max_send_failures(mut self, max: u32) -> Self {
        self.max_send_failures = max.max(1);
        self
    }

    pub fn stats(&self) -> Arc<BridgeStats> {
        self.stats.clone()
    }

    /// Translate one line. `Ok(None)` means the key is unknown.
    pub fn process_line(&self, line: &str) -> Result<Option<OutboundMessage>, LineError> {
        let Some(record) = decode_line(line, &self.schema, self.config.coercion)? else {
            return Ok(None);
        };
        Ok(Some(encode(&record, &self.schema, &self.config)?))
    }

    /// Run until cancelled or a fatal error occurs.
    ///
    /// Cancellation is observed between reads; a send in progress finishes
    /// first. The line stream is dropped on return, which closes the port.
    pub async fn run<S, K>(
        &self,
        mut lines: S,
        sink: &K,
        cancel: CancellationToken,
    ) -> Result<(), BridgeError>
    where
        S: Stream<Item = std::io::Result<String>> + Unpin,
        K: MessageSink,
    {
        info!(
            "Acquisition started ({} schema entries, {:?} mode, client id {})",
            self.schema.len(),
            self.config.mode,
            self.config.client_id
        );
        let mut consecutive_failures: u32 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Acquisition cancelled");
                    return Ok(());
                }
                next = lines.next() => next,
            };

            let line = match next {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    error!("Serial read failed: {}", e);
                    return Err(BridgeError::Read(e));
                }
                None => {
                    error!("Serial stream ended");
                    return Err(BridgeError::EndOfStream);
                }
            };
            self.stats.record_line();

            let msg = match self.process_line(&line) {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    self.stats.record_unknown();
                    trace!("Ignoring line with unknown key: {:?}", line);
                    continue;
                }
                Err(e) => {
                    self.stats.record_invalid();
                    trace!("Dropping line {:?}: {}", line, e);
                    continue;
                }
            };

            match sink.send(&msg).await {
                Ok(()) => {
                    consecutive_failures = 0;
                    self.stats.record_sent();
                }
                Err(SendError::Codec(e)) => {
                    self.stats.record_invalid();
                    trace!("Dropping message {}: {}", msg, e);
                }
                Err(SendError::Io(e)) => {
                    consecutive_failures += 1;
                    self.stats.record_send_failure();
                    warn!(
                        "Send to {} failed ({}/{}): {}",
                        sink.target(),
                        consecutive_failures,
                        self.max_send_failures,
                        e
                    );
                    if consecutive_failures >= self.max_send_failures {
                        error!("Too many consecutive send failures, stopping");
                        return Err(BridgeError::SendFailed {
                            failures: consecutive_failures,
                            source: e,
                        });
                    }
                }
            }
        }
    }
}
