//! Serial port opening.

use tokio_serial::{DataBits, FlowControl, Parity, SerialStream, StopBits};
use tokio_util::codec::FramedRead;
use tracing::info;

use crate::codec::LineCodec;
use crate::config::SerialSettings;
use crate::error::BridgeError;

/// Line stream over an open serial port. Dropping it closes the port.
pub type SerialLines = FramedRead<SerialStream, LineCodec>;

/// Open the port 8N1 and wrap it in the line codec.
pub fn open_serial(settings: &SerialSettings) -> Result<SerialLines, BridgeError> {
    let builder = tokio_serial::new(settings.port.as_str(), settings.baud_rate)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None);

    let stream = SerialStream::open(&builder).map_err(|source| BridgeError::SerialOpen {
        port: settings.port.clone(),
        source,
    })?;
    info!("Opened serial port {} at {} baud", settings.port, settings.baud_rate);

    Ok(FramedRead::new(
        stream,
        LineCodec::with_max_length(settings.max_line_length),
    ))
}
