//! Bridge statistics.
//!
//! Counters are updated by the acquisition task and read by the heartbeat
//! on the main path, so they are plain atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Collects and tracks acquisition statistics.
#[derive(Debug)]
pub struct BridgeStats {
    start_time: Instant,

    /// Lines received from the serial port.
    lines_read: AtomicU64,

    /// Messages handed to the socket.
    messages_sent: AtomicU64,

    /// Lines whose key is not in the schema (including blank lines).
    dropped_unknown: AtomicU64,

    /// Lines dropped by a decode, encode or codec error.
    dropped_invalid: AtomicU64,

    /// Failed sends.
    send_failures: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub lines_read: u64,
    pub messages_sent: u64,
    pub dropped_unknown: u64,
    pub dropped_invalid: u64,
    pub send_failures: u64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            lines_read: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            dropped_unknown: AtomicU64::new(0),
            dropped_invalid: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        }
    }

    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown(&self) {
        self.dropped_unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.dropped_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get current statistics snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            dropped_unknown: self.dropped_unknown.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "up {}s, {} lines read, {} sent, {} unknown, {} invalid, {} send failures",
            self.uptime_secs,
            self.lines_read,
            self.messages_sent,
            self.dropped_unknown,
            self.dropped_invalid,
            self.send_failures
        )
    }
}
