//! Top-level bridge: wires the serial port, the acquisition loop and the
//! OSC sender together.

use std::sync::Arc;

use serial2osc_core::Schema;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::acquisition::AcquisitionLoop;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::sender::{resolve_target, OscSender};
use crate::serial::open_serial;
use crate::stats::BridgeStats;

/// The serial-to-OSC bridge.
pub struct Bridge {
    config: BridgeConfig,
    acquisition: AcquisitionLoop,
}

impl Bridge {
    /// Create a bridge. Nothing is opened until [`Bridge::run`].
    pub fn new(config: BridgeConfig, schema: Schema) -> Self {
        let acquisition = AcquisitionLoop::new(Arc::new(schema), Arc::new(config.runtime.clone()))
            .with_max_send_failures(config.max_send_failures);
        Self {
            config,
            acquisition,
        }
    }

    /// Statistics shared with the acquisition task.
    pub fn stats(&self) -> Arc<BridgeStats> {
        self.acquisition.stats()
    }

    /// Resolve the target, open the socket and the serial port, then run the
    /// acquisition loop until cancellation or a fatal error.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), BridgeError> {
        let target = resolve_target(&self.config.host, self.config.port).await?;
        let sender = OscSender::bind(target)
            .await
            .map_err(BridgeError::Socket)?;
        info!("Sending OSC to {}", target);

        let lines = open_serial(&self.config.serial)?;
        let result = self.acquisition.run(lines, &sender, cancel).await;
        info!("Serial port {} closed", self.config.serial.port);
        result
    }
}
