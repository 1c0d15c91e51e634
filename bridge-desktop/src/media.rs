//! Headless Element Backend
//!
//! Simulated media elements. Positions advance only on
//! [`HeadlessMediaRuntime::advance`]; `loadedmetadata`, `timeupdate` and
//! `ended` notifications are queued and delivered on dispatch.

use bridge_traits::{
    audio::{MediaElement, NodeId},
    error::{BridgeError, Result},
    platform::PlatformCallback,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

#[derive(Default)]
struct MediaState {
    elements: Mutex<Vec<Weak<HeadlessMediaElement>>>,
    pending: Mutex<VecDeque<PlatformCallback>>,
    autoload: bool,
}

impl MediaState {
    fn queue(&self, callback: Option<PlatformCallback>) {
        if let Some(callback) = callback {
            self.pending.lock().push_back(callback);
        }
    }
}

/// Observable state of a headless element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSnapshot {
    pub position: f64,
    pub paused: bool,
    pub volume: f32,
    pub playback_rate: f32,
    pub looping: bool,
    pub metadata_loaded: bool,
}

#[derive(Default)]
struct ElementCallbacks {
    loaded_metadata: Option<PlatformCallback>,
    time_update: Option<PlatformCallback>,
    ended: Option<PlatformCallback>,
}

pub struct HeadlessMediaElement {
    id: NodeId,
    duration: f64,
    state: Arc<MediaState>,
    playback: Mutex<ElementSnapshot>,
    callbacks: Mutex<ElementCallbacks>,
}

impl HeadlessMediaElement {
    pub fn snapshot(&self) -> ElementSnapshot {
        self.playback.lock().clone()
    }

    fn load_metadata(&self) -> bool {
        let mut playback = self.playback.lock();
        if playback.metadata_loaded {
            return false;
        }
        playback.metadata_loaded = true;
        drop(playback);

        self.state
            .queue(self.callbacks.lock().loaded_metadata.clone());
        true
    }

    fn tick(&self, seconds: f64) {
        let ended = {
            let mut playback = self.playback.lock();
            if playback.paused || !playback.metadata_loaded {
                return;
            }

            playback.position += seconds * playback.playback_rate as f64;
            let mut ended = false;
            if playback.position >= self.duration {
                if playback.looping && self.duration > 0.0 {
                    playback.position %= self.duration;
                } else {
                    playback.position = self.duration;
                    playback.paused = true;
                    ended = true;
                }
            }
            trace!(element = %self.id, position = playback.position, "headless element tick");
            ended
        };

        let callbacks = self.callbacks.lock();
        self.state.queue(callbacks.time_update.clone());
        if ended {
            self.state.queue(callbacks.ended.clone());
        }
    }
}

impl MediaElement for HeadlessMediaElement {
    fn id(&self) -> NodeId {
        self.id
    }

    fn clone_element(&self) -> Result<Arc<dyn MediaElement>> {
        let clone = HeadlessMediaRuntime::register(&self.state, self.duration);
        Ok(clone)
    }

    fn duration(&self) -> f64 {
        if self.playback.lock().metadata_loaded {
            self.duration
        } else {
            0.0
        }
    }

    fn has_metadata(&self) -> bool {
        self.playback.lock().metadata_loaded
    }

    fn play(&self) -> Result<()> {
        self.playback.lock().paused = false;
        Ok(())
    }

    fn pause(&self) {
        self.playback.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.playback.lock().paused
    }

    fn current_time(&self) -> f64 {
        self.playback.lock().position
    }

    fn set_current_time(&self, seconds: f64) -> Result<()> {
        let mut playback = self.playback.lock();
        if !playback.metadata_loaded {
            return Err(BridgeError::InvalidState(format!(
                "{} cannot seek before metadata is loaded",
                self.id
            )));
        }
        playback.position = seconds.clamp(0.0, self.duration);
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        self.playback.lock().volume = volume;
    }

    fn set_playback_rate(&self, rate: f32) {
        self.playback.lock().playback_rate = rate;
    }

    fn set_loop(&self, looping: bool) {
        self.playback.lock().looping = looping;
    }

    fn set_on_loaded_metadata(&self, callback: Option<PlatformCallback>) {
        self.callbacks.lock().loaded_metadata = callback;
    }

    fn set_on_time_update(&self, callback: Option<PlatformCallback>) {
        self.callbacks.lock().time_update = callback;
    }

    fn set_on_ended(&self, callback: Option<PlatformCallback>) {
        self.callbacks.lock().ended = callback;
    }
}

/// Owner of all headless media elements.
#[derive(Clone)]
pub struct HeadlessMediaRuntime {
    state: Arc<MediaState>,
}

impl HeadlessMediaRuntime {
    /// Elements load their metadata only when [`Self::load_metadata`] is called.
    pub fn new() -> Self {
        Self::with_autoload(false)
    }

    /// With `autoload`, elements are created with metadata already available.
    pub fn with_autoload(autoload: bool) -> Self {
        Self {
            state: Arc::new(MediaState {
                autoload,
                ..Default::default()
            }),
        }
    }

    pub fn create_element(&self, duration: f64) -> Arc<HeadlessMediaElement> {
        Self::register(&self.state, duration)
    }

    fn register(state: &Arc<MediaState>, duration: f64) -> Arc<HeadlessMediaElement> {
        let element = Arc::new(HeadlessMediaElement {
            id: NodeId::next(),
            duration: duration.max(0.0),
            state: Arc::clone(state),
            playback: Mutex::new(ElementSnapshot {
                position: 0.0,
                paused: true,
                volume: 1.0,
                playback_rate: 1.0,
                looping: false,
                metadata_loaded: state.autoload,
            }),
            callbacks: Mutex::new(ElementCallbacks::default()),
        });
        state.elements.lock().push(Arc::downgrade(&element));
        element
    }

    fn live(&self) -> Vec<Arc<HeadlessMediaElement>> {
        let mut elements = self.state.elements.lock();
        elements.retain(|weak| weak.strong_count() > 0);
        elements.iter().filter_map(Weak::upgrade).collect()
    }

    /// Most recently created element that is still alive.
    pub fn latest_element(&self) -> Option<Arc<HeadlessMediaElement>> {
        self.live().pop()
    }

    /// Finish loading metadata for every element still waiting, then deliver
    /// notifications.
    pub fn load_metadata(&self) -> usize {
        let loaded = self
            .live()
            .iter()
            .filter(|element| element.load_metadata())
            .count();
        debug!(loaded, "headless metadata loaded");
        self.dispatch();
        loaded
    }

    /// Advance every playing element, then deliver notifications.
    pub fn advance(&self, seconds: f64) -> usize {
        if seconds.is_finite() && seconds > 0.0 {
            for element in self.live() {
                element.tick(seconds);
            }
        }
        self.dispatch()
    }

    pub fn dispatch(&self) -> usize {
        let callbacks: Vec<PlatformCallback> = self.state.pending.lock().drain(..).collect();
        let delivered = callbacks.len();
        for callback in callbacks {
            callback();
        }
        delivered
    }
}

impl Default for HeadlessMediaRuntime {
    fn default() -> Self {
        Self::new()
    }
}
