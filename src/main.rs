//! # Vario Telemetry
//!
//! Broadcast flight telemetry sentences to a companion app.
//!
//! This application reads sensor snapshots as JSON lines on stdin and
//! periodically sends the latest one as an LK8EX1 or XCTRC sentence over
//! the configured link.

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::time::interval;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use vario_telemetry::config::{Config, LoggingConfig};
use vario_telemetry::feed::ReadingFeed;
use vario_telemetry::sentence::buffer::SentenceBuffer;
use vario_telemetry::sentence::encoder::encode_reading;
use vario_telemetry::sentence::reading::Reading;
use vario_telemetry::transport::{self, Delivery};

/// Transmit outcome counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BroadcastStats {
    sent: u64,
    skipped: u64,
    dropped: u64,
}

impl BroadcastStats {
    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Sent => self.sent += 1,
            Delivery::Skipped => self.skipped += 1,
            Delivery::Dropped => self.dropped += 1,
        }
    }

    fn total(&self) -> u64 {
        self.sent + self.skipped + self.dropped
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. With `logging.dir` set, logs
/// also go to a daily-rotated file; keep the returned guard alive until exit
/// so buffered lines are flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "vario-telemetry.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

/// Main entry point for Vario Telemetry
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, defaults otherwise)
///    - Set up logging
///    - Build and set up the configured link; on failure keep running
///      without telemetry
///
/// 2. **Main Loop**
///    - Keep the latest snapshot from the stdin feed
///    - Every `telemetry.interval_ms`, encode it and transmit if a peer is
///      connected
///    - Every `serial.reconnect_interval_ms`, let the link reconnect
///    - Handle Ctrl+C for graceful shutdown
///
/// # Examples
///
/// ```bash
/// echo '{"altitude_m": 1203, "climb_cps": 85, "supply_voltage": 4.9}' \
///     | cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("Failed to load config {}", path))?
        }
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);
    info!("Vario Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut link = transport::from_config(&config);
    let telemetry_enabled = match link.setup().await {
        Ok(()) => true,
        Err(e) => {
            error!("{:?} link setup failed, continuing without telemetry: {}", link.kind(), e);
            false
        }
    };

    let mut feed = ReadingFeed::new(BufReader::new(tokio::io::stdin()));
    let mut feed_open = true;
    let mut latest: Option<Reading> = None;

    let mut buf = SentenceBuffer::new();
    let mut stats = BroadcastStats::default();
    let mut broadcast_interval = interval(config.telemetry.interval());
    let mut maintenance_interval = interval(config.serial.reconnect_interval());

    info!(
        "Broadcasting {:?} every {}ms",
        config.telemetry.sentence, config.telemetry.interval_ms
    );

    loop {
        tokio::select! {
            _ = broadcast_interval.tick(), if telemetry_enabled => {
                let Some(reading) = latest.as_ref() else {
                    continue;
                };

                encode_reading(config.telemetry.sentence, reading, &mut buf);
                stats.record(link.transmit(buf.as_bytes()).await);

                if stats.total() % config.telemetry.stats_interval_sentences == 0 {
                    info!(
                        "Link {}: {} sent, {} skipped, {} dropped",
                        link.link_status(), stats.sent, stats.skipped, stats.dropped
                    );
                }
            }

            _ = maintenance_interval.tick(), if telemetry_enabled => {
                link.maintain().await;
            }

            next = feed.next_reading(), if feed_open => {
                match next {
                    Ok(Some(reading)) => latest = Some(reading.stamped()),
                    Ok(None) => {
                        info!("Reading feed closed, repeating last snapshot");
                        feed_open = false;
                    }
                    Err(e) => warn!("Skipping reading: {}", e),
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!(
        "Total sentences: {} sent, {} skipped, {} dropped",
        stats.sent, stats.skipped, stats.dropped
    );
    Ok(())
}
