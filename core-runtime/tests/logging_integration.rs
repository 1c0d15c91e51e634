//! Integration tests for logging and events

use core_runtime::events::{EventBus, EventEmitter};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_logging_initializes_once() {
    // Logging can only be initialized once per process
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());
    assert!(init_logging(config).is_err());

    tracing::debug!(target: "core_playback", instance = "test", "logging ready");
}

#[test]
fn test_bus_feeds_emitter() {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Signal {
        VolumeChange,
    }

    let bus = EventBus::new(4);
    let mut rx = bus.subscribe();
    let mut emitter: EventEmitter<Signal, u32> = EventEmitter::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    emitter.on(Signal::VolumeChange, move |value| {
        counter.fetch_add(*value as usize, Ordering::SeqCst);
    });

    bus.emit(Signal::VolumeChange).unwrap();
    bus.emit(Signal::VolumeChange).unwrap();
    while let Ok(signal) = rx.try_recv() {
        emitter.emit(signal, &2);
    }

    assert_eq!(hits.load(Ordering::SeqCst), 4);
}
