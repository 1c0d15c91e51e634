//! Web Audio implementation of the graph bridge traits.
//!
//! Every wrapper keeps the underlying `web_sys::AudioNode` so edges can be
//! wired between any two wrappers of this crate. Nodes from other bridge
//! implementations are rejected.

use crate::error::{js_error, WasmError};
use bridge_traits::{
    audio::{AudioBuffer, AudioContext, AudioNode, BufferSourceNode, GainNode, NodeId},
    error::{BridgeError, Result as BridgeResult},
    platform::PlatformCallback,
};
use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, trace};
use wasm_bindgen::{closure::Closure, JsCast};

/// Resolve the native node behind any wrapper of this crate.
fn native(node: &dyn AudioNode) -> BridgeResult<&web_sys::AudioNode> {
    let any = node.as_any();
    if let Some(node) = any.downcast_ref::<WebNode>() {
        return Ok(&node.inner);
    }
    if let Some(gain) = any.downcast_ref::<WebGain>() {
        return Ok(&gain.node.inner);
    }
    if let Some(source) = any.downcast_ref::<WebBufferSource>() {
        return Ok(&source.node.inner);
    }
    Err(WasmError::ForeignNode(node.id().to_string()).into())
}

// ============================================================================
// Plain Node
// ============================================================================

/// Wrapper around any native audio node (destination, host effects).
pub struct WebNode {
    id: NodeId,
    inner: web_sys::AudioNode,
}

impl WebNode {
    /// Wrap a node created by the host, e.g. a convolver used as an effect.
    pub fn new(inner: web_sys::AudioNode) -> Self {
        Self {
            id: NodeId::next(),
            inner,
        }
    }

    /// The native node.
    pub fn inner(&self) -> &web_sys::AudioNode {
        &self.inner
    }
}

impl AudioNode for WebNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn connect(&self, destination: &dyn AudioNode) -> BridgeResult<()> {
        let target = native(destination)?;
        self.inner
            .connect_with_audio_node(target)
            .map_err(|err| js_error("connect", err))?;
        trace!(from = %self.id, to = %destination.id(), "connect");
        Ok(())
    }

    fn disconnect(&self, destination: &dyn AudioNode) -> BridgeResult<()> {
        let target = native(destination)?;
        // The browser throws InvalidAccessError for a missing edge
        self.inner
            .disconnect_with_audio_node(target)
            .map_err(|_| BridgeError::NoSuchConnection {
                from: self.id.as_u64(),
                to: destination.id().as_u64(),
            })
    }

    fn disconnect_all(&self) {
        if let Err(err) = self.inner.disconnect() {
            trace!(node = %self.id, error = ?err, "disconnect all failed");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Gain
// ============================================================================

/// Web Audio `GainNode`.
pub struct WebGain {
    node: WebNode,
    gain: web_sys::GainNode,
}

impl AudioNode for WebGain {
    fn id(&self) -> NodeId {
        self.node.id
    }

    fn connect(&self, destination: &dyn AudioNode) -> BridgeResult<()> {
        self.node.connect(destination)
    }

    fn disconnect(&self, destination: &dyn AudioNode) -> BridgeResult<()> {
        self.node.disconnect(destination)
    }

    fn disconnect_all(&self) {
        self.node.disconnect_all();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl GainNode for WebGain {
    fn set_gain(&self, value: f32) {
        self.gain.gain().set_value(value);
    }

    fn gain(&self) -> f32 {
        self.gain.gain().value()
    }

    fn as_node(&self) -> &dyn AudioNode {
        self
    }
}

// ============================================================================
// Buffer
// ============================================================================

/// Decoded `AudioBuffer`, typically from `decodeAudioData`.
pub struct WebBuffer {
    inner: web_sys::AudioBuffer,
}

impl WebBuffer {
    /// Wrap a buffer decoded by the host.
    pub fn new(inner: web_sys::AudioBuffer) -> Self {
        Self { inner }
    }
}

impl AudioBuffer for WebBuffer {
    fn duration(&self) -> f64 {
        self.inner.duration()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Buffer Source
// ============================================================================

/// Web Audio `AudioBufferSourceNode`.
pub struct WebBufferSource {
    node: WebNode,
    source: web_sys::AudioBufferSourceNode,
    on_ended: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl AudioNode for WebBufferSource {
    fn id(&self) -> NodeId {
        self.node.id
    }

    fn connect(&self, destination: &dyn AudioNode) -> BridgeResult<()> {
        self.node.connect(destination)
    }

    fn disconnect(&self, destination: &dyn AudioNode) -> BridgeResult<()> {
        self.node.disconnect(destination)
    }

    fn disconnect_all(&self) {
        self.node.disconnect_all();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BufferSourceNode for WebBufferSource {
    fn start(&self, when: f64, offset: f64, duration: Option<f64>) -> BridgeResult<()> {
        let result = match duration {
            Some(duration) => self
                .source
                .start_with_when_and_grain_offset_and_grain_duration(when, offset, duration),
            None => self.source.start_with_when_and_grain_offset(when, offset),
        };
        result.map_err(|err| js_error("start", err))?;
        debug!(source = %self.node.id, offset, duration = ?duration, "web source started");
        Ok(())
    }

    fn stop(&self) -> BridgeResult<()> {
        self.source.stop().map_err(|err| js_error("stop", err))
    }

    fn set_loop(&self, looping: bool) {
        self.source.set_loop(looping);
    }

    fn set_loop_start(&self, seconds: f64) {
        self.source.set_loop_start(seconds);
    }

    fn set_loop_end(&self, seconds: f64) {
        self.source.set_loop_end(seconds);
    }

    fn set_playback_rate(&self, rate: f32) {
        self.source.playback_rate().set_value(rate);
    }

    fn set_on_ended(&self, callback: Option<PlatformCallback>) {
        let closure = callback.map(|callback| Closure::<dyn FnMut()>::new(move || callback()));
        self.source
            .set_onended(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.on_ended.borrow_mut() = closure;
    }

    fn as_node(&self) -> &dyn AudioNode {
        self
    }
}

// ============================================================================
// Context
// ============================================================================

/// Browser `AudioContext`.
pub struct WebAudioContext {
    inner: web_sys::AudioContext,
    destination: Arc<WebNode>,
}

impl WebAudioContext {
    /// Create a new browser audio context.
    pub fn new() -> BridgeResult<Self> {
        let inner = web_sys::AudioContext::new()
            .map_err(|_| BridgeError::NotAvailable("AudioContext".to_string()))?;
        Ok(Self::from_context(inner))
    }

    /// Adopt a context owned by the host page.
    pub fn from_context(inner: web_sys::AudioContext) -> Self {
        let destination: web_sys::AudioNode = inner.destination().unchecked_into();
        Self {
            inner,
            destination: Arc::new(WebNode::new(destination)),
        }
    }

    /// The native context, e.g. for `decodeAudioData` or user-gesture resume.
    pub fn inner(&self) -> &web_sys::AudioContext {
        &self.inner
    }

    /// Wrap a native node created on this context so it can join an
    /// external chain.
    pub fn wrap_node(&self, node: web_sys::AudioNode) -> Arc<dyn AudioNode> {
        Arc::new(WebNode::new(node))
    }
}

impl AudioContext for WebAudioContext {
    fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    fn destination(&self) -> Arc<dyn AudioNode> {
        self.destination.clone()
    }

    fn create_gain(&self) -> BridgeResult<Arc<dyn GainNode>> {
        let gain = self
            .inner
            .create_gain()
            .map_err(|err| js_error("create gain", err))?;
        Ok(Arc::new(WebGain {
            node: WebNode::new(gain.clone().unchecked_into()),
            gain,
        }))
    }

    fn create_buffer_source(
        &self,
        buffer: &Arc<dyn AudioBuffer>,
    ) -> BridgeResult<Arc<dyn BufferSourceNode>> {
        let buffer = buffer
            .as_any()
            .downcast_ref::<WebBuffer>()
            .ok_or_else(|| BridgeError::OperationFailed("buffer was not decoded by Web Audio".into()))?;

        let source = self
            .inner
            .create_buffer_source()
            .map_err(|err| js_error("create buffer source", err))?;
        source.set_buffer(Some(&buffer.inner));

        Ok(Arc::new(WebBufferSource {
            node: WebNode::new(source.clone().unchecked_into()),
            source,
            on_ended: RefCell::new(None),
        }))
    }
}
