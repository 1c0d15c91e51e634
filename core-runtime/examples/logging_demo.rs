//! Logging Demo
//!
//! Run with: `cargo run --example logging_demo --package core-runtime`

use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use tracing::{debug, info, info_span, warn};

fn main() {
    let format = match std::env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };

    let config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_filter("logging_demo=trace,core_runtime=trace");

    if let Err(err) = init_logging(config) {
        eprintln!("{err}");
        return;
    }

    let span = info_span!("instance", id = "demo-1");
    let _guard = span.enter();

    info!(volume = 0.8, pitch = 1.0, "instance created");
    debug!(offset = 2.0, duration = 3.0, "playback window resolved");
    warn!("external chain rejected: missing first node");
}
