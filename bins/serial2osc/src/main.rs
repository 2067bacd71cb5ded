use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serial2osc_bridge::{Bridge, BridgeConfig, SerialSettings};
use serial2osc_core::{Coercion, Mode, RuntimeConfig, Schema};
use tokio::time::{Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LONG_ABOUT: &str = r#"Forward formatted UART (serial port) data via OSC.

Each line of the incoming serial stream is considered a message of the form

    <k><v1>,<v2>,...

where <k> is the first character of the line and each <vN> is a value of
type Integer ("I") or Float ("F"). Lines whose key is not in the protocol
config are ignored.

The JSON protocol config maps each key to the OSC address to generate, the
value type and the number of dimensions (used for /c_setn messages):

    {
      "a": ["/pot",  "F", 3],
      "t": ["/temp", "I", 1]
    }"#;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

/// serial2osc
#[derive(Parser, Debug)]
#[command(name = "serial2osc", version, about = "Forward formatted UART data via OSC", long_about = LONG_ABOUT)]
struct Args {
    /// Serial port
    #[arg(short, long, default_value = "/dev/tty.usbmodem641")]
    serial_port: String,

    /// Serial port baud rate
    #[arg(short, long, default_value_t = 115200)]
    baud_rate: u32,

    /// OSC destination host
    #[arg(short, long, default_value = "localhost")]
    addr: String,

    /// OSC destination port
    #[arg(short, long, default_value_t = 57120)]
    port: u16,

    /// Identifier number / start bus
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    id: i32,

    /// Protocol config file
    #[arg(short, long, alias = "pConfig", default_value = "configExample.json")]
    config: PathBuf,

    /// Format as SuperCollider server message (/c_setn)
    #[arg(short, long)]
    to_server: bool,

    /// Parse numeric prefixes and use 0 for non-numeric tokens instead of dropping the line
    #[arg(long)]
    lenient: bool,

    /// Consecutive send failures before giving up
    #[arg(long, default_value_t = 10)]
    max_send_failures: u32,

    /// Seconds between status log lines (0 disables)
    #[arg(long, default_value_t = 10)]
    heartbeat_secs: u64,

    /// Longer serial lines are discarded
    #[arg(long, default_value_t = 1024)]
    max_line_length: usize,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        let coercion = if self.lenient {
            Coercion::Lenient
        } else {
            Coercion::Strict
        };

        BridgeConfig {
            serial: SerialSettings {
                max_line_length: self.max_line_length,
                ..SerialSettings::new(&self.serial_port, self.baud_rate)
            },
            host: self.addr.clone(),
            port: self.port,
            runtime: RuntimeConfig::new(self.id, Mode::from_server_flag(self.to_server))
                .with_coercion(coercion),
            max_send_failures: self.max_send_failures,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let schema = Schema::load(&args.config)
        .with_context(|| format!("Failed to load protocol config {}", args.config.display()))?;
    if schema.is_empty() {
        tracing::warn!("Protocol config {} has no entries, every line will be ignored", args.config.display());
    }
    for entry in schema.iter() {
        tracing::debug!(
            "Key {:?} -> {} ({}, dimension {}, offset {})",
            entry.key,
            entry.output_name,
            entry.value_type.code(),
            entry.dimension,
            entry.offset
        );
    }

    let config = args.bridge_config();
    tracing::info!(
        "Forwarding {} @ {} baud to {}:{} as {:?}",
        config.serial.port,
        config.serial.baud_rate,
        config.host,
        config.port,
        config.runtime.mode
    );

    let bridge = Bridge::new(config, schema);
    let stats = bridge.stats();
    let cancel = CancellationToken::new();
    let mut bridge_handle = tokio::spawn(bridge.run(cancel.clone()));

    let mut heartbeat = (args.heartbeat_secs > 0).then(|| {
        let period = Duration::from_secs(args.heartbeat_secs);
        tokio::time::interval_at(Instant::now() + period, period)
    });

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tracing::info!("Type Ctrl-C to quit.");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal, closing serial port...");
                cancel.cancel();
                bridge_handle
                    .await
                    .context("Bridge task failed")?
                    .context("Bridge stopped with an error")?;
                break;
            }
            result = &mut bridge_handle => {
                result
                    .context("Bridge task failed")?
                    .context("Bridge stopped")?;
                tracing::warn!("Bridge stopped");
                break;
            }
            _ = next_heartbeat(&mut heartbeat) => {
                tracing::info!("{}", stats.snapshot());
            }
        }
    }

    tracing::info!("Good bye.");
    Ok(())
}

async fn next_heartbeat(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
