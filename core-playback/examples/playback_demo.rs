//! # Sound Instance Example
//!
//! Drives a sound instance on the headless graph backend: plays a window of a
//! resource, seeks, changes pitch, suspends through the manager and waits for
//! the natural end.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_desktop::HeadlessAudioContext;
use core_playback::{
    InstanceOptions, ManagerConfig, PlaybackEvent, Sound, SoundInstance, SoundManager,
};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::sync::Arc;

fn main() {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )
    .expect("Failed to initialize logging");

    let context = HeadlessAudioContext::new();
    let manager = Arc::new(SoundManager::new(
        Some(Arc::new(context.clone())),
        context.clock(),
        ManagerConfig::default(),
    ));

    let sound = Sound::from_buffer(context.create_buffer(12.0)).into_shared();
    let options = InstanceOptions::from_json(r#"{ "startTime": 2.0, "duration": 6.0 }"#)
        .expect("Invalid options");
    let mut instance = SoundInstance::new(manager.clone(), sound, options);

    for kind in [
        PlaybackEvent::Ready,
        PlaybackEvent::Play,
        PlaybackEvent::Pause,
        PlaybackEvent::Resume,
        PlaybackEvent::Stop,
        PlaybackEvent::End,
    ] {
        instance.on(kind, move |sound| {
            println!(
                "[{:>5}] state={:?} position={:.2}s",
                kind,
                sound.state(),
                sound.current_time()
            );
        });
    }

    instance.poll_events();
    instance.play();

    context.advance(1.0);
    instance.poll_events();
    println!("after 1s: {:.2}s", instance.current_time());

    instance.set_current_time(3.0);
    println!("seeked: {:.2}s", instance.current_time());

    instance.set_pitch(1.5);
    context.advance(1.0);
    instance.poll_events();
    println!("after 1s at 1.5x: {:.2}s", instance.current_time());

    manager.suspend_all();
    instance.poll_events();
    context.advance(5.0);
    manager.resume_all();
    instance.poll_events();

    // 1.5s of window left at 1.5x
    context.advance(1.0);
    instance.poll_events();
    println!("finished: {:?}", instance.state());
}
