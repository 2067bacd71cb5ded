//! Bridge error types.
//!
//! `LineError` drops a single line and the loop continues. `BridgeError`
//! ends the bridge.

use serial2osc_core::{DecodeError, EncodeError};
use serial2osc_protocol::CodecError;
use thiserror::Error;

/// Fatal errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("Serial read failed: {0}")]
    Read(#[source] std::io::Error),

    /// The serial device stopped delivering data (e.g. it was unplugged).
    #[error("Serial stream ended")]
    EndOfStream,

    #[error("Could not resolve OSC target {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("OSC target {host}:{port} resolved to no address")]
    NoAddress { host: String, port: u16 },

    #[error("Failed to set up OSC socket: {0}")]
    Socket(#[source] std::io::Error),

    #[error("Giving up after {failures} consecutive send failures: {source}")]
    SendFailed {
        failures: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Per-line errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors from a single send.
#[derive(Debug, Error)]
pub enum SendError {
    /// The message could not be encoded; only this message is affected.
    #[error("Failed to encode OSC packet: {0}")]
    Codec(#[from] CodecError),

    #[error("Failed to send OSC packet: {0}")]
    Io(#[from] std::io::Error),
}
