//! # Sound Instance
//!
//! Playback controller for one sound resource. It owns the state machine,
//! the logical play position and the manager subscription, and delegates all
//! native work to a [`PlaybackBackend`].
//!
//! ## Position Model
//!
//! The logical position is the elapsed time inside the playback window, in
//! `[0, effective_duration)`. The graph backend integrates it from the clock:
//! `position + (now - checkpoint) * pitch`, wrapped with [`cap_time`]. The
//! element backend reads the native position and subtracts the window start.
//!
//! ## Events
//!
//! Native notifications and manager signals are queued and only delivered
//! when the owner calls [`SoundInstance::poll_events`]:
//!
//! ```rust
//! use bridge_desktop::HeadlessAudioContext;
//! use core_playback::{
//!     InstanceOptions, ManagerConfig, PlaybackEvent, Sound, SoundInstance, SoundManager,
//! };
//! use std::sync::Arc;
//!
//! let context = HeadlessAudioContext::new();
//! let manager = Arc::new(SoundManager::new(
//!     Some(Arc::new(context.clone())),
//!     context.clock(),
//!     ManagerConfig::default(),
//! ));
//! let sound = Sound::from_buffer(context.create_buffer(1.0)).into_shared();
//!
//! let mut instance = SoundInstance::new(manager, sound, InstanceOptions::default());
//! instance.on(PlaybackEvent::End, |sound| println!("{} finished", sound.id()));
//! assert!(instance.play());
//!
//! context.advance(1.5);
//! instance.poll_events();
//! assert!(instance.is_stopped());
//! ```

use crate::backend::{self, BackendEvent, BackendKind, PlaybackBackend, SourceParam};
use crate::config::InstanceOptions;
use crate::manager::{ManagerSignal, PlaybackManager};
use crate::sound::SoundResource;
use crate::timing::{cap_time, sanitize_pitch, sanitize_time, sanitize_volume, PlaybackWindow};
use bridge_traits::audio::AudioNode;
use core_runtime::events::{EventEmitter, ListenerId, Receiver, TryRecvError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

/// Unique identifier of a sound instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Lifecycle events observable through [`SoundInstance::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackEvent {
    /// The backend source can play.
    Ready,
    Play,
    Pause,
    Resume,
    Stop,
    /// Playback reached the end of the window without looping.
    End,
}

impl PlaybackEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackEvent::Ready => "ready",
            PlaybackEvent::Play => "play",
            PlaybackEvent::Pause => "pause",
            PlaybackEvent::Resume => "resume",
            PlaybackEvent::Stop => "stop",
            PlaybackEvent::End => "end",
        }
    }
}

impl fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playing (or playable) occurrence of a sound resource.
pub struct SoundInstance {
    id: InstanceId,
    manager: Arc<dyn PlaybackManager>,
    sound: Arc<dyn SoundResource>,
    backend: Box<dyn PlaybackBackend>,
    state: PlaybackStatus,

    volume: f32,
    pitch: f32,
    looping: bool,
    start_time: f64,
    duration: f64,

    /// Logical position at `checkpoint`.
    position: f64,
    checkpoint: f64,
    pending_seek: Option<f64>,

    /// Ignore the next natural end notification.
    suppress_end: bool,
    /// Swallow lifecycle events during internal stop/play sequences.
    suppress_events: bool,
    suspended_by_manager: bool,
    ready_announced: bool,

    signals: Option<Receiver<ManagerSignal>>,
    emitter: EventEmitter<PlaybackEvent, SoundInstance>,
}

impl SoundInstance {
    /// Bind a new instance to `manager` and `sound`.
    ///
    /// The backend is probed once here. The source is created immediately and
    /// stays absent while the resource is not ready.
    pub fn new(
        manager: Arc<dyn PlaybackManager>,
        sound: Arc<dyn SoundResource>,
        options: InstanceOptions,
    ) -> Self {
        let options = options.normalized();
        let kind = BackendKind::probe(manager.as_ref(), sound.as_ref());
        let backend = backend::select(kind, manager.as_ref());

        let mut instance = Self {
            id: InstanceId::new(),
            manager,
            sound,
            backend,
            state: PlaybackStatus::Stopped,
            volume: options.volume,
            pitch: options.pitch,
            looping: options.looping,
            start_time: options.start_time,
            duration: options.duration,
            position: 0.0,
            checkpoint: 0.0,
            pending_seek: None,
            suppress_end: false,
            suppress_events: false,
            suspended_by_manager: false,
            ready_announced: false,
            signals: None,
            emitter: EventEmitter::new(),
        };

        instance.backend.create_source(instance.sound.as_ref());
        instance.apply_params();
        debug!(
            instance = %instance.id,
            backend = %instance.backend.kind(),
            "sound instance created"
        );
        instance
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn state(&self) -> PlaybackStatus {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackStatus::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackStatus::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == PlaybackStatus::Stopped
    }

    /// Whether the instance is paused because its manager suspended playback.
    pub fn is_suspended(&self) -> bool {
        self.suspended_by_manager
    }

    pub fn sound(&self) -> &Arc<dyn SoundResource> {
        &self.sound
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Playable window length in seconds.
    pub fn effective_duration(&self) -> f64 {
        self.window().effective_duration()
    }

    fn window(&self) -> PlaybackWindow {
        PlaybackWindow::new(self.start_time, self.duration, self.sound.duration())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start from the pending seek, or from the top of the window.
    ///
    /// An active instance is stopped first. Returns `false` when there is no
    /// backend source to play.
    #[instrument(skip(self), fields(instance = %self.id))]
    pub fn play(&mut self) -> bool {
        if self.state != PlaybackStatus::Stopped {
            self.stop();
        }
        if !self.backend.has_source() {
            warn!("play ignored, no source");
            return false;
        }

        let window = self.window();
        let (relative, offset) = match self.pending_seek.take() {
            Some(seek) => {
                let relative = cap_time(seek, window.effective_duration());
                (relative, window.absolute_offset(relative))
            }
            None => (0.0, window.start_time),
        };

        if let Err(e) = self.backend.start(offset, &window) {
            warn!(error = %e, offset, "backend failed to start");
            return false;
        }

        self.state = PlaybackStatus::Playing;
        self.position = relative;
        self.checkpoint = self.backend.now();
        self.apply_params();
        self.subscribe();
        debug!(offset, relative, "playing");

        if self.manager.is_suspended() {
            let previous = std::mem::replace(&mut self.suppress_events, true);
            self.pause();
            self.suppress_events = previous;
            self.suspended_by_manager = true;
            debug!("manager suspended, instance parked");
        }

        self.emit(PlaybackEvent::Play);
        true
    }

    /// Freeze the logical position. Only valid while playing.
    #[instrument(skip(self), fields(instance = %self.id))]
    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackStatus::Playing {
            return false;
        }

        self.position = self.playing_position();
        if self.backend.pause_source(self.sound.as_ref()) {
            self.suppress_end = true;
        }
        self.pending_seek = None;
        self.state = PlaybackStatus::Paused;
        debug!(position = self.position, "paused");

        self.emit(PlaybackEvent::Pause);
        true
    }

    /// Continue from the frozen position or a pending seek. Only valid while
    /// paused.
    #[instrument(skip(self), fields(instance = %self.id))]
    pub fn resume(&mut self) -> bool {
        if self.state != PlaybackStatus::Paused {
            return false;
        }

        let window = self.window();
        let relative = cap_time(
            self.pending_seek.take().unwrap_or(self.position),
            window.effective_duration(),
        );
        let offset = window.absolute_offset(relative);

        if let Err(e) = self.backend.start(offset, &window) {
            warn!(error = %e, offset, "backend failed to resume");
            return false;
        }

        self.state = PlaybackStatus::Playing;
        self.position = relative;
        self.checkpoint = self.backend.now();
        self.apply_params();
        self.subscribe();
        debug!(offset, relative, "resumed");

        self.emit(PlaybackEvent::Resume);
        true
    }

    /// Halt playback and rewind. No-op when already stopped.
    #[instrument(skip(self), fields(instance = %self.id))]
    pub fn stop(&mut self) -> bool {
        if self.state == PlaybackStatus::Stopped || !self.backend.has_source() {
            return false;
        }

        self.signals = None;
        if self.backend.stop_immediate() {
            self.suppress_end = true;
        }
        self.backend.create_source(self.sound.as_ref());

        self.state = PlaybackStatus::Stopped;
        self.position = 0.0;
        self.pending_seek = None;
        self.suspended_by_manager = false;
        debug!("stopped");

        self.emit(PlaybackEvent::Stop);
        true
    }

    /// Deliver queued manager signals and native notifications.
    ///
    /// Returns the number of signals and notifications processed.
    pub fn poll_events(&mut self) -> usize {
        let mut processed = 0;

        loop {
            let next = match self.signals.as_mut() {
                Some(rx) => rx.try_recv(),
                None => break,
            };
            match next {
                Ok(signal) => {
                    processed += 1;
                    self.handle_manager_signal(signal);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(instance = %self.id, skipped, "manager signals lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        processed + self.drain_backend()
    }

    fn drain_backend(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.backend.poll_event() {
            processed += 1;
            match event {
                BackendEvent::Ready => {
                    if !self.ready_announced {
                        self.ready_announced = true;
                        self.emit(PlaybackEvent::Ready);
                    }
                }
                BackendEvent::Ended => self.handle_natural_end(),
            }
        }
        processed
    }

    fn handle_natural_end(&mut self) {
        if self.suppress_end {
            self.suppress_end = false;
            trace!(instance = %self.id, "end notification suppressed");
            return;
        }
        if self.state == PlaybackStatus::Stopped {
            return;
        }

        debug!(instance = %self.id, "natural end");
        self.emit(PlaybackEvent::End);
        self.stop();
    }

    fn handle_manager_signal(&mut self, signal: ManagerSignal) {
        trace!(instance = %self.id, signal = ?signal, "manager signal");
        match signal {
            ManagerSignal::VolumeChange => self.apply_volume(),
            ManagerSignal::Suspend => {
                if self.state == PlaybackStatus::Playing && !self.suspended_by_manager {
                    self.suspended_by_manager = true;
                    self.pause();
                }
            }
            ManagerSignal::Resume => {
                if self.suspended_by_manager {
                    self.suspended_by_manager = false;
                    self.resume();
                }
            }
            ManagerSignal::Destroy => self.destroy(),
        }
    }

    /// Force-stop and release the backend source without events.
    fn destroy(&mut self) {
        self.backend.release();
        self.signals = None;
        self.state = PlaybackStatus::Stopped;
        self.position = 0.0;
        self.pending_seek = None;
        self.suppress_end = false;
        self.suspended_by_manager = false;
        debug!(instance = %self.id, "released by manager");
    }

    // ========================================================================
    // Position
    // ========================================================================

    /// Logical position inside the window, seconds.
    pub fn current_time(&self) -> f64 {
        if let Some(seek) = self.pending_seek {
            return seek;
        }
        if self.state == PlaybackStatus::Stopped || !self.backend.has_source() {
            return 0.0;
        }
        match self.state {
            PlaybackStatus::Paused => self.position,
            _ => self.playing_position(),
        }
    }

    fn playing_position(&self) -> f64 {
        let effective = self.effective_duration();
        let position = match self.backend.native_position() {
            Some(native) => (native - self.start_time).max(0.0),
            None => {
                let elapsed = (self.backend.now() - self.checkpoint).max(0.0);
                self.position + elapsed * self.pitch as f64
            }
        };
        let wrapped = cap_time(position, effective);
        trace!(instance = %self.id, position, wrapped, "position sampled");
        wrapped
    }

    /// Seek. Negative and non-finite positions are ignored.
    ///
    /// While playing the seek restarts playback without observable
    /// lifecycle events; otherwise it is applied on the next play or resume.
    pub fn set_current_time(&mut self, seconds: f64) {
        if !seconds.is_finite() || seconds < 0.0 {
            warn!(instance = %self.id, seconds, "invalid seek ignored");
            return;
        }

        if self.state == PlaybackStatus::Playing {
            let previous = std::mem::replace(&mut self.suppress_events, true);
            self.stop();
            self.pending_seek = Some(seconds);
            self.play();
            self.suppress_events = previous;
        } else {
            self.pending_seek = Some(seconds);
            self.position = seconds;
        }
        debug!(instance = %self.id, seconds, "seek");
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = sanitize_volume(volume);
        self.apply_volume();
    }

    /// Change the rate. Elapsed time up to now is integrated at the old rate.
    pub fn set_pitch(&mut self, pitch: f32) {
        if self.state == PlaybackStatus::Playing && self.backend.native_position().is_none() {
            self.position = self.playing_position();
            self.checkpoint = self.backend.now();
        }
        self.pitch = sanitize_pitch(pitch);
        self.backend.set_param(SourceParam::Pitch(self.pitch));
    }

    /// Toggle window looping.
    ///
    /// A playing partial window whose source cannot change loop mode live is
    /// restarted at the current position without lifecycle events.
    pub fn set_loop(&mut self, looping: bool) {
        let changed = self.looping != looping;
        self.looping = looping;
        self.backend.set_param(SourceParam::Loop(looping));

        if changed
            && self.state == PlaybackStatus::Playing
            && self.window().is_partial()
            && self.backend.loop_fixed_at_start()
        {
            let position = self.playing_position();
            debug!(instance = %self.id, looping, position, "loop change restarts source");
            self.set_current_time(position);
        }
    }

    pub fn set_start_time(&mut self, start_time: f64) {
        self.start_time = sanitize_time(start_time);
        self.restart_window();
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = sanitize_time(duration);
        self.restart_window();
    }

    /// Replay from the top of a changed window when playing.
    fn restart_window(&mut self) {
        if self.state != PlaybackStatus::Playing {
            return;
        }
        let previous = std::mem::replace(&mut self.suppress_events, true);
        self.stop();
        self.play();
        self.suppress_events = previous;
    }

    /// Swap the resource. An active instance is stopped first.
    pub fn set_sound(&mut self, sound: Arc<dyn SoundResource>) {
        if self.state != PlaybackStatus::Stopped {
            self.stop();
        }
        self.sound = sound;
        self.ready_announced = false;
        self.pending_seek = None;
        self.backend.create_source(self.sound.as_ref());
        self.apply_params();
        debug!(instance = %self.id, duration = self.sound.duration(), "sound swapped");
        self.drain_backend();
    }

    fn apply_volume(&mut self) {
        let gain = self.volume * self.manager.volume();
        self.backend.set_param(SourceParam::Volume(gain));
    }

    fn apply_params(&mut self) {
        self.apply_volume();
        self.backend.set_param(SourceParam::Pitch(self.pitch));
        self.backend.set_param(SourceParam::Loop(self.looping));
    }

    fn subscribe(&mut self) {
        if self.signals.is_none() {
            self.signals = Some(self.manager.subscribe());
        }
    }

    // ========================================================================
    // External Chain
    // ========================================================================

    /// Route output through `first..=last` before the destination.
    ///
    /// `last` defaults to `first`. Without `first` nothing changes.
    pub fn set_external_nodes(
        &mut self,
        first: Option<Arc<dyn AudioNode>>,
        last: Option<Arc<dyn AudioNode>>,
    ) {
        let Some(first) = first else {
            warn!(instance = %self.id, "external chain needs a first node");
            return;
        };
        let last = last.unwrap_or_else(|| Arc::clone(&first));

        if let Err(e) = self.backend.set_external_nodes(first, last) {
            warn!(instance = %self.id, error = %e, "external chain not installed");
        }
    }

    pub fn clear_external_nodes(&mut self) {
        if let Err(e) = self.backend.clear_external_nodes() {
            warn!(instance = %self.id, error = %e, "external chain not removed");
        }
    }

    pub fn external_nodes(&self) -> (Option<Arc<dyn AudioNode>>, Option<Arc<dyn AudioNode>>) {
        self.backend.external_nodes()
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Register `handler` for `event`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn on<F>(&mut self, event: PlaybackEvent, handler: F) -> ListenerId
    where
        F: Fn(&SoundInstance) + Send + Sync + 'static,
    {
        self.emitter.on(event, handler)
    }

    /// Register `handler` for `event`.
    #[cfg(target_arch = "wasm32")]
    pub fn on<F>(&mut self, event: PlaybackEvent, handler: F) -> ListenerId
    where
        F: Fn(&SoundInstance) + 'static,
    {
        self.emitter.on(event, handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    fn emit(&self, event: PlaybackEvent) {
        if self.suppress_events {
            trace!(instance = %self.id, %event, "event suppressed");
            return;
        }
        self.emitter.emit(event, self);
    }
}

impl fmt::Debug for SoundInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundInstance")
            .field("id", &self.id)
            .field("backend", &self.backend.kind())
            .field("state", &self.state)
            .field("volume", &self.volume)
            .field("pitch", &self.pitch)
            .field("looping", &self.looping)
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .finish()
    }
}
