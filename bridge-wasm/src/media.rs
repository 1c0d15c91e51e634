//! `HTMLAudioElement` implementation of the element bridge trait.

use crate::error::js_error;
use bridge_traits::{
    audio::{MediaElement, NodeId},
    error::{BridgeError, Result as BridgeResult},
    platform::PlatformCallback,
};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::HtmlAudioElement;

/// `HAVE_METADATA` ready state.
const HAVE_METADATA: u16 = 1;

#[derive(Default)]
struct Listeners {
    loaded_metadata: Option<Closure<dyn FnMut()>>,
    time_update: Option<Closure<dyn FnMut()>>,
    ended: Option<Closure<dyn FnMut()>>,
}

fn closure(callback: Option<PlatformCallback>) -> Option<Closure<dyn FnMut()>> {
    callback.map(|callback| Closure::<dyn FnMut()>::new(move || callback()))
}

/// Browser audio element.
pub struct WebMediaElement {
    id: NodeId,
    inner: HtmlAudioElement,
    listeners: RefCell<Listeners>,
}

impl WebMediaElement {
    /// Wrap an element owned by the host page.
    pub fn new(inner: HtmlAudioElement) -> Self {
        Self {
            id: NodeId::next(),
            inner,
            listeners: RefCell::new(Listeners::default()),
        }
    }

    /// Create a detached element loading `src`.
    pub fn from_src(src: &str) -> BridgeResult<Self> {
        let inner = HtmlAudioElement::new_with_src(src)
            .map_err(|_| BridgeError::NotAvailable("HTMLAudioElement".to_string()))?;
        inner.set_preload("auto");
        Ok(Self::new(inner))
    }

    /// The native element.
    pub fn inner(&self) -> &HtmlAudioElement {
        &self.inner
    }
}

impl MediaElement for WebMediaElement {
    fn id(&self) -> NodeId {
        self.id
    }

    fn clone_element(&self) -> BridgeResult<Arc<dyn MediaElement>> {
        let node = self
            .inner
            .clone_node()
            .map_err(|err| js_error("clone element", err))?;
        let element: HtmlAudioElement = node
            .dyn_into()
            .map_err(|_| BridgeError::OperationFailed("clone is not an audio element".into()))?;
        element.set_preload("auto");
        debug!(source = %self.id, "media element cloned");
        Ok(Arc::new(Self::new(element)))
    }

    fn duration(&self) -> f64 {
        let duration = self.inner.duration();
        if duration.is_finite() {
            duration
        } else {
            0.0
        }
    }

    fn has_metadata(&self) -> bool {
        self.inner.ready_state() >= HAVE_METADATA
    }

    fn play(&self) -> BridgeResult<()> {
        // Autoplay rejections surface on the returned promise
        self.inner
            .play()
            .map(|_| ())
            .map_err(|err| js_error("play", err))
    }

    fn pause(&self) {
        if let Err(err) = self.inner.pause() {
            warn!(element = %self.id, error = ?err, "pause failed");
        }
    }

    fn is_paused(&self) -> bool {
        self.inner.paused()
    }

    fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    fn set_current_time(&self, seconds: f64) -> BridgeResult<()> {
        if !self.has_metadata() {
            return Err(BridgeError::InvalidState(format!(
                "{} cannot seek before metadata is loaded",
                self.id
            )));
        }
        self.inner.set_current_time(seconds);
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        self.inner.set_volume(volume as f64);
    }

    fn set_playback_rate(&self, rate: f32) {
        self.inner.set_playback_rate(rate as f64);
    }

    fn set_loop(&self, looping: bool) {
        self.inner.set_loop(looping);
    }

    fn set_on_loaded_metadata(&self, callback: Option<PlatformCallback>) {
        let closure = closure(callback);
        self.inner
            .set_onloadedmetadata(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        self.listeners.borrow_mut().loaded_metadata = closure;
    }

    fn set_on_time_update(&self, callback: Option<PlatformCallback>) {
        let closure = closure(callback);
        self.inner
            .set_ontimeupdate(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        self.listeners.borrow_mut().time_update = closure;
    }

    fn set_on_ended(&self, callback: Option<PlatformCallback>) {
        let closure = closure(callback);
        self.inner
            .set_onended(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        self.listeners.borrow_mut().ended = closure;
    }
}
