//! Element backend adapter.
//!
//! Each instance plays a private clone of the resource's media element. The
//! element only knows the whole resource, so partial windows are enforced on
//! `timeupdate`: once playback passes the window end the adapter either seeks
//! back to the window start or pauses and reports the end itself.

use super::{BackendEvent, BackendKind, PlaybackBackend, SignalKind, SignalQueue, SourceParam};
use crate::error::{PlaybackError, Result};
use crate::sound::{SoundHandle, SoundResource};
use crate::timing::PlaybackWindow;
use bridge_traits::audio::{AudioNode, MediaElement};
use bridge_traits::time::Clock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub struct ElementBackend {
    clock: Arc<dyn Clock>,
    element: Option<Arc<dyn MediaElement>>,
    serial: u64,
    signals: SignalQueue,
    outbox: VecDeque<BackendEvent>,
    /// Offset requested before metadata was available.
    pending_offset: Option<f64>,
    window: Option<PlaybackWindow>,
    playing: bool,
    volume: f32,
    pitch: f32,
    looping: bool,
}

impl ElementBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            element: None,
            serial: 0,
            signals: SignalQueue::new(),
            outbox: VecDeque::new(),
            pending_offset: None,
            window: None,
            playing: false,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
        }
    }

    fn discard_element(&mut self) {
        if let Some(element) = self.element.take() {
            element.pause();
            element.set_on_loaded_metadata(None);
            element.set_on_time_update(None);
            element.set_on_ended(None);
        }
        self.playing = false;
        self.pending_offset = None;
    }

    fn window_is_partial(&self) -> bool {
        self.window.map(|w| w.is_partial()).unwrap_or(false)
    }

    fn apply_loop_flag(&self) {
        if let Some(element) = &self.element {
            // Native looping covers the whole resource only
            element.set_loop(self.looping && !self.window_is_partial());
        }
    }

    fn seek(&self, element: &Arc<dyn MediaElement>, seconds: f64) {
        if let Err(e) = element.set_current_time(seconds) {
            warn!(error = %e, seconds, "media element rejected seek");
        }
    }

    /// Jump back to the window start and keep playing.
    fn wrap(&self, element: &Arc<dyn MediaElement>) {
        let start = self.window.map(|w| w.start_time).unwrap_or(0.0);
        self.seek(element, start);
        if element.is_paused() {
            if let Err(e) = element.play() {
                warn!(error = %e, "media element refused to restart loop");
            }
        }
        trace!(start, "element window wrapped");
    }

    fn handle_signal(&mut self, kind: SignalKind) {
        let Some(element) = self.element.clone() else {
            return;
        };

        match kind {
            SignalKind::LoadedMetadata => {
                if let Some(offset) = self.pending_offset.take() {
                    self.seek(&element, offset);
                }
                debug!(element = %element.id(), "element metadata loaded");
                self.outbox.push_back(BackendEvent::Ready);
            }
            SignalKind::TimeUpdate => {
                if !self.playing {
                    return;
                }
                let Some(window) = self.window.filter(|w| w.is_partial()) else {
                    return;
                };
                if element.current_time() < window.end() {
                    return;
                }
                if self.looping {
                    self.wrap(&element);
                } else {
                    element.pause();
                    self.playing = false;
                    self.outbox.push_back(BackendEvent::Ended);
                }
            }
            SignalKind::Ended => {
                if !self.playing {
                    // Already reported when the window end was passed
                    return;
                }
                if self.looping {
                    self.wrap(&element);
                } else {
                    self.playing = false;
                    self.outbox.push_back(BackendEvent::Ended);
                }
            }
        }
    }
}

impl PlaybackBackend for ElementBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Element
    }

    fn has_source(&self) -> bool {
        self.element.is_some()
    }

    fn create_source(&mut self, sound: &dyn SoundResource) -> bool {
        self.discard_element();
        self.serial += 1;

        let template = match sound.handle() {
            Some(SoundHandle::Element(element)) => element,
            Some(SoundHandle::Buffer(_)) => {
                let e = PlaybackError::UnsupportedHandle {
                    backend: BackendKind::Element.as_str(),
                };
                warn!(error = %e, "failed to create element source");
                return false;
            }
            None => {
                debug!("sound not ready, element source deferred");
                return false;
            }
        };

        let element = match template.clone_element() {
            Ok(element) => element,
            Err(e) => {
                warn!(error = %e, "failed to clone media element");
                return false;
            }
        };

        element.set_on_loaded_metadata(Some(
            self.signals.callback(self.serial, SignalKind::LoadedMetadata),
        ));
        element.set_on_time_update(Some(
            self.signals.callback(self.serial, SignalKind::TimeUpdate),
        ));
        element.set_on_ended(Some(self.signals.callback(self.serial, SignalKind::Ended)));
        element.set_volume(self.volume);
        element.set_playback_rate(self.pitch);

        if element.has_metadata() {
            self.outbox.push_back(BackendEvent::Ready);
        }
        trace!(element = %element.id(), serial = self.serial, "element source created");
        self.element = Some(element);
        self.apply_loop_flag();
        true
    }

    fn start(&mut self, offset: f64, window: &PlaybackWindow) -> Result<()> {
        let element = self.element.clone().ok_or(PlaybackError::NoSource)?;

        self.window = Some(*window);
        self.apply_loop_flag();

        if element.has_metadata() {
            element.set_current_time(offset)?;
            self.pending_offset = None;
        } else {
            self.pending_offset = Some(offset);
        }
        element.play()?;
        self.playing = true;

        debug!(
            offset,
            deferred = self.pending_offset.is_some(),
            serial = self.serial,
            "element playback started"
        );
        Ok(())
    }

    fn stop_immediate(&mut self) -> bool {
        if let Some(element) = &self.element {
            element.pause();
        }
        self.playing = false;
        self.pending_offset = None;
        false
    }

    fn pause_source(&mut self, _sound: &dyn SoundResource) -> bool {
        self.stop_immediate()
    }

    fn set_param(&mut self, param: SourceParam) {
        match param {
            SourceParam::Volume(volume) => {
                self.volume = volume;
                if let Some(element) = &self.element {
                    element.set_volume(volume);
                }
            }
            SourceParam::Pitch(pitch) => {
                self.pitch = pitch;
                if let Some(element) = &self.element {
                    element.set_playback_rate(pitch);
                }
            }
            SourceParam::Loop(looping) => {
                self.looping = looping;
                self.apply_loop_flag();
            }
        }
    }

    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn native_position(&self) -> Option<f64> {
        if let Some(offset) = self.pending_offset {
            return Some(offset);
        }
        self.element.as_ref().map(|element| element.current_time())
    }

    fn loop_fixed_at_start(&self) -> bool {
        false
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        loop {
            if let Some(event) = self.outbox.pop_front() {
                return Some(event);
            }

            let signal = self.signals.try_next()?;
            if signal.serial != self.serial {
                trace!(serial = signal.serial, kind = ?signal.kind, "stale element signal ignored");
                continue;
            }
            self.handle_signal(signal.kind);
        }
    }

    fn release(&mut self) {
        self.discard_element();
        self.outbox.clear();
        let dropped = self.signals.clear();
        debug!(dropped, "element backend released");
    }

    fn set_external_nodes(
        &mut self,
        _first: Arc<dyn AudioNode>,
        _last: Arc<dyn AudioNode>,
    ) -> Result<()> {
        debug!("external nodes unsupported by element backend");
        Ok(())
    }

    fn clear_external_nodes(&mut self) -> Result<()> {
        Ok(())
    }

    fn external_nodes(&self) -> (Option<Arc<dyn AudioNode>>, Option<Arc<dyn AudioNode>>) {
        (None, None)
    }
}

impl Drop for ElementBackend {
    fn drop(&mut self) {
        self.discard_element();
    }
}
