//! # Playback Backends
//!
//! A sound instance drives exactly one backend, chosen once at construction:
//!
//! - [`GraphBackend`] plays decoded buffers through the manager's audio
//!   context. Sources are single-shot and recreated after every stop.
//! - [`ElementBackend`] plays a private clone of a media element and emulates
//!   window looping on top of coarse time updates.
//!
//! ## Native Notifications
//!
//! Native objects report `ended`, `loadedmetadata` and `timeupdate` through
//! platform callbacks. The callbacks never touch adapter state: they push a
//! [`SourceSignal`] tagged with the serial of the source that produced it into
//! the adapter's unbounded queue. [`PlaybackBackend::poll_event`] drains the
//! queue on the owner's thread and turns signals into [`BackendEvent`]s.
//!
//! ```text
//! ┌──────────────┐ callback ┌─────────────┐ poll_event ┌────────────┐
//! │ Native Node  ├─────────>│ SignalQueue ├───────────>│ Controller │
//! └──────────────┘ (serial) └─────────────┘            └────────────┘
//! ```

mod element;
mod graph;

pub use element::ElementBackend;
pub use graph::GraphBackend;

use crate::error::Result;
use crate::manager::PlaybackManager;
use crate::sound::{SoundHandle, SoundResource};
use crate::timing::PlaybackWindow;
use bridge_traits::audio::AudioNode;
use bridge_traits::platform::{PlatformCallback, PlatformSend};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{trace, warn};

/// Which native backend an instance drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Graph,
    Element,
}

impl BackendKind {
    /// Capability probe: the graph backend needs an audio context from the
    /// manager and a resource that is not element-only.
    pub fn probe(manager: &dyn PlaybackManager, sound: &dyn SoundResource) -> Self {
        if manager.context().is_none() {
            return BackendKind::Element;
        }
        match sound.handle() {
            Some(SoundHandle::Element(_)) => BackendKind::Element,
            _ => BackendKind::Graph,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Graph => "graph",
            BackendKind::Element => "element",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live parameter forwarded to the current source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceParam {
    /// Effective gain (instance volume times manager volume).
    Volume(f32),
    Pitch(f32),
    Loop(bool),
}

/// Event reported by a backend to its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// A source became ready to play.
    Ready,
    /// Playback reached its end (native or synthesized).
    Ended,
}

/// Uniform contract over both native backends.
///
/// All operations act on the backend's current source. Implementations log
/// native failures and keep going; only [`PlaybackBackend::start`] and the
/// external chain operations report errors to the caller.
pub trait PlaybackBackend: PlatformSend {
    fn kind(&self) -> BackendKind;

    /// Whether a source exists that can be started.
    fn has_source(&self) -> bool;

    /// Discard the current source and build a fresh idle one from `sound`.
    ///
    /// Returns whether a source exists afterwards.
    fn create_source(&mut self, sound: &dyn SoundResource) -> bool;

    /// Start the current source at the absolute resource `offset`, bounded by
    /// `window`.
    fn start(&mut self, offset: f64, window: &PlaybackWindow) -> Result<()>;

    /// Halt the current source immediately.
    ///
    /// Returns `true` when the teardown will later produce a natural end
    /// notification that the controller must ignore.
    fn stop_immediate(&mut self) -> bool;

    /// Halt playback so it can be resumed later. The same return contract as
    /// [`PlaybackBackend::stop_immediate`] applies.
    fn pause_source(&mut self, sound: &dyn SoundResource) -> bool;

    fn set_param(&mut self, param: SourceParam);

    /// Current time of the backend's clock, seconds.
    fn now(&self) -> f64;

    /// Absolute resource position reported natively, if the backend tracks one.
    fn native_position(&self) -> Option<f64>;

    /// Whether the running source keeps the loop mode it was started with.
    ///
    /// When `true`, the controller restarts playback at the current position
    /// to apply a loop change on a partial window.
    fn loop_fixed_at_start(&self) -> bool;

    /// Next pending event, processing queued native signals as needed.
    fn poll_event(&mut self) -> Option<BackendEvent>;

    /// Stop and drop the source without producing any notification.
    fn release(&mut self);

    /// Splice `first..=last` between the internal connector and the output.
    fn set_external_nodes(
        &mut self,
        first: Arc<dyn AudioNode>,
        last: Arc<dyn AudioNode>,
    ) -> Result<()>;

    /// Restore the direct connector to output edge.
    fn clear_external_nodes(&mut self) -> Result<()>;

    fn external_nodes(&self) -> (Option<Arc<dyn AudioNode>>, Option<Arc<dyn AudioNode>>);
}

/// Build the backend `kind` for `manager`.
///
/// Falls back to the element backend when the graph cannot be wired.
pub fn select(kind: BackendKind, manager: &dyn PlaybackManager) -> Box<dyn PlaybackBackend> {
    if kind == BackendKind::Graph {
        if let Some(context) = manager.context() {
            match GraphBackend::new(context) {
                Ok(backend) => return Box::new(backend),
                Err(e) => warn!(error = %e, "graph backend unavailable, using element backend"),
            }
        }
    }
    Box::new(ElementBackend::new(manager.clock()))
}

// ============================================================================
// Native Signal Queue
// ============================================================================

/// Kind of native notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalKind {
    Ended,
    LoadedMetadata,
    TimeUpdate,
}

/// Native notification tagged with the serial of the source that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceSignal {
    pub serial: u64,
    pub kind: SignalKind,
}

/// Per-adapter queue between native callbacks and the owner thread.
pub(crate) struct SignalQueue {
    tx: UnboundedSender<SourceSignal>,
    rx: UnboundedReceiver<SourceSignal>,
}

impl SignalQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Callback that enqueues `kind` for the source numbered `serial`.
    pub fn callback(&self, serial: u64, kind: SignalKind) -> PlatformCallback {
        let tx = self.tx.clone();
        Arc::new(move || {
            if tx.send(SourceSignal { serial, kind }).is_err() {
                trace!(serial, ?kind, "signal dropped, adapter gone");
            }
        })
    }

    pub fn try_next(&mut self) -> Option<SourceSignal> {
        self.rx.try_recv().ok()
    }

    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
