//! # serial2osc-bridge
//!
//! Runs the serial-to-OSC bridge on tokio.
//!
//! This crate provides:
//! - The acquisition loop (read line, decode, encode, send)
//! - Line framing for the serial byte stream
//! - Serial port opening
//! - The UDP sender for OSC packets
//! - Throughput statistics for the heartbeat

pub mod acquisition;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod sender;
pub mod serial;
pub mod stats;

pub use acquisition::AcquisitionLoop;
pub use bridge::Bridge;
pub use codec::LineCodec;
pub use config::{BridgeConfig, SerialSettings};
pub use error::{BridgeError, LineError, SendError};
pub use sender::{resolve_target, MessageSink, OscSender};
pub use stats::{BridgeStats, StatsSnapshot};

pub use serial2osc_core::{Coercion, Mode, RuntimeConfig, Schema};
