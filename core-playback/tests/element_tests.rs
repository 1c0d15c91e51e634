//! Sound instance tests on the element backend
//!
//! This test suite verifies:
//! - Backend selection without an audio context
//! - Deferred readiness and offsets before metadata
//! - Window end and loop emulation on time updates
//! - Pause keeping the element, stop cloning a fresh one

use bridge_desktop::{HeadlessAudioContext, HeadlessMediaElement, HeadlessMediaRuntime};
use bridge_traits::audio::{AudioNode, MediaElement};
use bridge_traits::time::ManualClock;
use core_playback::{
    BackendKind, InstanceOptions, ManagerConfig, PlaybackEvent, Sound, SoundInstance,
    SoundManager,
};
use std::sync::{Arc, Mutex};

struct Harness {
    runtime: HeadlessMediaRuntime,
    manager: Arc<SoundManager>,
}

impl Harness {
    fn new(autoload: bool) -> Self {
        Self::with_config(autoload, ManagerConfig::default())
    }

    fn with_config(autoload: bool, config: ManagerConfig) -> Self {
        Self {
            runtime: HeadlessMediaRuntime::with_autoload(autoload),
            manager: Arc::new(SoundManager::new(None, Arc::new(ManualClock::new()), config)),
        }
    }

    fn instance(&self, duration: f64, options: InstanceOptions) -> SoundInstance {
        let template = self.runtime.create_element(duration);
        let sound = Sound::from_element(template, duration).into_shared();
        let mut instance = SoundInstance::new(self.manager.clone(), sound, options);
        instance.poll_events();
        instance
    }

    fn element(&self) -> Arc<HeadlessMediaElement> {
        self.runtime.latest_element().unwrap()
    }

    fn advance(&self, seconds: f64, instance: &mut SoundInstance) {
        self.runtime.advance(seconds);
        instance.poll_events();
    }
}

type EventLog = Arc<Mutex<Vec<PlaybackEvent>>>;

fn record(instance: &mut SoundInstance) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        PlaybackEvent::Ready,
        PlaybackEvent::Play,
        PlaybackEvent::Pause,
        PlaybackEvent::Resume,
        PlaybackEvent::Stop,
        PlaybackEvent::End,
    ] {
        let log = Arc::clone(&log);
        instance.on(kind, move |_| log.lock().unwrap().push(kind));
    }
    log
}

fn events(log: &EventLog) -> Vec<PlaybackEvent> {
    log.lock().unwrap().clone()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_element_backend_selected_without_context() {
    let harness = Harness::new(true);
    let instance = harness.instance(2.0, InstanceOptions::default());
    assert_eq!(instance.backend_kind(), BackendKind::Element);
}

#[test]
fn test_ready_waits_for_metadata() {
    let harness = Harness::new(false);
    let mut instance = harness.instance(10.0, InstanceOptions::default());
    let log = record(&mut instance);

    instance.poll_events();
    assert!(events(&log).is_empty());

    assert!(instance.play());
    harness.runtime.load_metadata();
    instance.poll_events();
    assert_eq!(events(&log), vec![PlaybackEvent::Play, PlaybackEvent::Ready]);
}

#[test]
fn test_offset_applied_on_metadata() {
    let harness = Harness::new(false);
    let mut instance = harness.instance(10.0, InstanceOptions::default());

    instance.set_current_time(4.0);
    instance.play();
    assert_close(instance.current_time(), 4.0);

    harness.runtime.load_metadata();
    instance.poll_events();
    assert_close(harness.element().current_time(), 4.0);

    harness.advance(1.0, &mut instance);
    assert_close(instance.current_time(), 5.0);
}

#[test]
fn test_position_is_relative_to_window() {
    let harness = Harness::new(true);
    let options = InstanceOptions::default()
        .with_start_time(2.0)
        .with_duration(3.0);
    let mut instance = harness.instance(10.0, options);

    instance.play();
    assert_close(harness.element().current_time(), 2.0);
    harness.advance(1.0, &mut instance);
    assert_close(instance.current_time(), 1.0);
}

#[test]
fn test_window_end_is_synthesized() {
    let harness = Harness::new(true);
    let options = InstanceOptions::default()
        .with_start_time(2.0)
        .with_duration(3.0);
    let mut instance = harness.instance(10.0, options);
    let log = record(&mut instance);

    instance.play();
    harness.advance(2.0, &mut instance);
    assert!(instance.is_playing());
    harness.advance(1.5, &mut instance);

    assert!(instance.is_stopped());
    assert_eq!(
        events(&log),
        vec![PlaybackEvent::Play, PlaybackEvent::End, PlaybackEvent::Stop]
    );
}

#[test]
fn test_window_loop_is_emulated() {
    let harness = Harness::new(true);
    let options = InstanceOptions::default()
        .with_start_time(2.0)
        .with_duration(3.0)
        .with_loop(true);
    let mut instance = harness.instance(10.0, options);
    let log = record(&mut instance);

    instance.play();
    assert!(!harness.element().snapshot().looping);

    harness.advance(3.5, &mut instance);
    assert!(instance.is_playing());
    assert_close(instance.current_time(), 0.0);
    assert_eq!(events(&log), vec![PlaybackEvent::Play]);
}

#[test]
fn test_loop_disabled_while_playing_ends_at_window() {
    let harness = Harness::new(true);
    let options = InstanceOptions::default()
        .with_start_time(2.0)
        .with_duration(3.0)
        .with_loop(true);
    let mut instance = harness.instance(10.0, options);
    let log = record(&mut instance);

    instance.play();
    harness.advance(1.0, &mut instance);
    instance.set_loop(false);
    assert_close(instance.current_time(), 1.0);
    assert!(!harness.element().snapshot().looping);

    harness.advance(2.5, &mut instance);
    assert!(instance.is_stopped());
    assert_eq!(
        events(&log),
        vec![PlaybackEvent::Play, PlaybackEvent::End, PlaybackEvent::Stop]
    );
}

#[test]
fn test_loop_enabled_while_playing_wraps() {
    let harness = Harness::new(true);
    let options = InstanceOptions::default()
        .with_start_time(2.0)
        .with_duration(3.0);
    let mut instance = harness.instance(10.0, options);
    let log = record(&mut instance);

    instance.play();
    let element = harness.element();
    harness.advance(1.0, &mut instance);
    instance.set_loop(true);
    assert_eq!(harness.element().id(), element.id());

    harness.advance(2.5, &mut instance);
    assert!(instance.is_playing());
    assert_close(instance.current_time(), 0.0);
    assert_eq!(events(&log), vec![PlaybackEvent::Play]);
}

#[test]
fn test_whole_resource_loop_is_native() {
    let harness = Harness::new(true);
    let mut instance = harness.instance(2.0, InstanceOptions::default().with_loop(true));
    let log = record(&mut instance);

    instance.play();
    assert!(harness.element().snapshot().looping);

    harness.advance(2.5, &mut instance);
    assert!(instance.is_playing());
    assert_close(instance.current_time(), 0.5);
    assert_eq!(events(&log), vec![PlaybackEvent::Play]);
}

#[test]
fn test_native_end() {
    let harness = Harness::new(true);
    let mut instance = harness.instance(2.0, InstanceOptions::default());
    let log = record(&mut instance);

    instance.play();
    harness.advance(3.0, &mut instance);

    assert!(instance.is_stopped());
    assert_eq!(
        events(&log),
        vec![PlaybackEvent::Play, PlaybackEvent::End, PlaybackEvent::Stop]
    );
}

#[test]
fn test_pause_keeps_element_and_resume_continues() {
    let harness = Harness::new(true);
    let mut instance = harness.instance(10.0, InstanceOptions::default());

    instance.play();
    let playing = harness.element();
    harness.advance(1.0, &mut instance);

    assert!(instance.pause());
    assert!(playing.is_paused());
    assert_eq!(harness.element().id(), playing.id());
    assert_close(instance.current_time(), 1.0);

    harness.advance(2.0, &mut instance);
    assert!(instance.resume());
    assert!(!playing.is_paused());
    assert_close(instance.current_time(), 1.0);
}

#[test]
fn test_stop_clones_fresh_element() {
    let harness = Harness::new(true);
    let mut instance = harness.instance(2.0, InstanceOptions::default());
    let log = record(&mut instance);

    instance.play();
    let first = harness.element();
    assert!(instance.stop());
    assert_ne!(harness.element().id(), first.id());

    // The discarded element can no longer reach the instance
    first.play().unwrap();
    harness.advance(5.0, &mut instance);
    assert_eq!(events(&log), vec![PlaybackEvent::Play, PlaybackEvent::Stop]);
}

#[test]
fn test_volume_includes_manager_volume() {
    let harness = Harness::with_config(true, ManagerConfig::default().with_volume(0.5));
    let mut instance = harness.instance(2.0, InstanceOptions::default().with_volume(0.8));

    instance.play();
    assert!((harness.element().snapshot().volume - 0.4).abs() < 1e-6);

    instance.set_volume(2.0);
    assert!((harness.element().snapshot().volume - 0.5).abs() < 1e-6);
}

#[test]
fn test_pitch_forwarded_to_element() {
    let harness = Harness::new(true);
    let mut instance = harness.instance(10.0, InstanceOptions::default());

    instance.play();
    instance.set_pitch(2.0);
    harness.advance(1.0, &mut instance);

    assert_eq!(harness.element().snapshot().playback_rate, 2.0);
    assert_close(instance.current_time(), 2.0);
}

#[test]
fn test_external_nodes_unsupported() {
    let harness = Harness::new(true);
    let mut instance = harness.instance(2.0, InstanceOptions::default());
    let graph = HeadlessAudioContext::new();
    let node: Arc<dyn AudioNode> = graph.create_node();

    instance.set_external_nodes(Some(node), None);
    instance.clear_external_nodes();
    let (first, last) = instance.external_nodes();
    assert!(first.is_none());
    assert!(last.is_none());
}
