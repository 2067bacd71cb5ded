//! Bridge configuration.

use serial2osc_core::RuntimeConfig;

/// Serial port settings. The port is always opened 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    pub baud_rate: u32,
    /// Longer lines are discarded up to the next newline.
    pub max_line_length: usize,
}

impl SerialSettings {
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            max_line_length: crate::codec::DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::new("/dev/tty.usbmodem641", 115200)
    }
}

/// Everything the bridge needs besides the schema.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub serial: SerialSettings,
    /// OSC destination host.
    pub host: String,
    /// OSC destination port.
    pub port: u16,
    pub runtime: RuntimeConfig,
    /// Consecutive send failures tolerated before the bridge stops.
    pub max_send_failures: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            host: "localhost".to_string(),
            port: 57120,
            runtime: RuntimeConfig::default(),
            max_send_failures: 10,
        }
    }
}
