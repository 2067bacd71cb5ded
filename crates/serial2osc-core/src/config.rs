//! Process-wide runtime settings read by the decoder and encoder.
//!
//! A `RuntimeConfig` is built once at startup and shared read-only with the
//! acquisition task. Transport endpoints are not part of it; they belong to
//! the bridge layer.

/// Output encoding selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Address each message with the schema's output name.
    #[default]
    DirectAddress,
    /// Send `/c_setn` messages into a shared indexed buffer.
    IndexedBuffer,
}

impl Mode {
    /// Map the command-line "to server" flag onto a mode.
    pub fn from_server_flag(to_server: bool) -> Self {
        if to_server {
            Mode::IndexedBuffer
        } else {
            Mode::DirectAddress
        }
    }
}

/// How value tokens are turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    /// The whole token must be a number, otherwise the line is dropped.
    #[default]
    Strict,
    /// Take the longest numeric prefix; no prefix yields zero.
    Lenient,
}

/// Immutable runtime settings.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Client identifier, or start bus index in indexed-buffer mode.
    pub client_id: i32,
    pub mode: Mode,
    pub coercion: Coercion,
}

impl RuntimeConfig {
    pub fn new(client_id: i32, mode: Mode) -> Self {
        Self {
            client_id,
            mode,
            coercion: Coercion::default(),
        }
    }

    #[must_use]
    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }
}
