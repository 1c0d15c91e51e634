//! Headless Graph Backend
//!
//! A deterministic, non-audible implementation of the graph bridge traits.
//! Time only moves when the host calls [`HeadlessAudioContext::advance`], and
//! native notifications are queued and delivered on
//! [`HeadlessAudioContext::dispatch`], never from inside the call that caused
//! them.

use bridge_traits::{
    audio::{AudioBuffer, AudioContext, AudioNode, BufferSourceNode, GainNode, NodeId},
    error::{BridgeError, Result},
    platform::PlatformCallback,
    time::{Clock, ManualClock},
};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Tolerance used when comparing elapsed play time against a source's length.
const END_EPSILON: f64 = 1e-9;

/// Shared edge table and notification queue.
#[derive(Default)]
struct GraphState {
    edges: Mutex<BTreeSet<(NodeId, NodeId)>>,
    pending: Mutex<VecDeque<PlatformCallback>>,
}

impl GraphState {
    fn connect(&self, from: NodeId, to: NodeId) {
        trace!(%from, %to, "connect");
        self.edges.lock().insert((from, to));
    }

    fn disconnect(&self, from: NodeId, to: NodeId) -> Result<()> {
        if self.edges.lock().remove(&(from, to)) {
            trace!(%from, %to, "disconnect");
            Ok(())
        } else {
            Err(BridgeError::NoSuchConnection {
                from: from.as_u64(),
                to: to.as_u64(),
            })
        }
    }

    fn disconnect_all(&self, from: NodeId) {
        self.edges.lock().retain(|(src, _)| *src != from);
    }

    fn queue(&self, callback: PlatformCallback) {
        self.pending.lock().push_back(callback);
    }
}

// ============================================================================
// Plain Node
// ============================================================================

/// Pass-through node (destination, effect placeholders).
pub struct HeadlessNode {
    id: NodeId,
    state: Arc<GraphState>,
}

impl HeadlessNode {
    fn new(state: Arc<GraphState>) -> Self {
        Self {
            id: NodeId::next(),
            state,
        }
    }
}

impl AudioNode for HeadlessNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn connect(&self, destination: &dyn AudioNode) -> Result<()> {
        self.state.connect(self.id, destination.id());
        Ok(())
    }

    fn disconnect(&self, destination: &dyn AudioNode) -> Result<()> {
        self.state.disconnect(self.id, destination.id())
    }

    fn disconnect_all(&self) {
        self.state.disconnect_all(self.id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Gain
// ============================================================================

pub struct HeadlessGain {
    node: HeadlessNode,
    gain: Mutex<f32>,
}

impl AudioNode for HeadlessGain {
    fn id(&self) -> NodeId {
        self.node.id
    }

    fn connect(&self, destination: &dyn AudioNode) -> Result<()> {
        self.node.connect(destination)
    }

    fn disconnect(&self, destination: &dyn AudioNode) -> Result<()> {
        self.node.disconnect(destination)
    }

    fn disconnect_all(&self) {
        self.node.disconnect_all();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl GainNode for HeadlessGain {
    fn set_gain(&self, value: f32) {
        *self.gain.lock() = value;
    }

    fn gain(&self) -> f32 {
        *self.gain.lock()
    }

    fn as_node(&self) -> &dyn AudioNode {
        self
    }
}

// ============================================================================
// Buffer
// ============================================================================

/// Decoded buffer stand-in; only its length matters headlessly.
#[derive(Debug, Clone)]
pub struct HeadlessBuffer {
    duration: f64,
}

impl HeadlessBuffer {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
        }
    }
}

impl AudioBuffer for HeadlessBuffer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Buffer Source
// ============================================================================

/// Observable playback parameters of a headless buffer source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub started_at: Option<f64>,
    pub offset: f64,
    pub duration: Option<f64>,
    pub looping: bool,
    pub loop_start: f64,
    pub loop_end: f64,
    pub playback_rate: f32,
    pub finished: bool,
}

impl Default for SourceSnapshot {
    fn default() -> Self {
        Self {
            started_at: None,
            offset: 0.0,
            duration: None,
            looping: false,
            loop_start: 0.0,
            loop_end: 0.0,
            playback_rate: 1.0,
            finished: false,
        }
    }
}

pub struct HeadlessBufferSource {
    node: HeadlessNode,
    buffer_duration: f64,
    clock: Arc<ManualClock>,
    playback: Mutex<SourceSnapshot>,
    on_ended: Mutex<Option<PlatformCallback>>,
}

impl HeadlessBufferSource {
    pub fn snapshot(&self) -> SourceSnapshot {
        self.playback.lock().clone()
    }

    pub fn is_playing(&self) -> bool {
        let playback = self.playback.lock();
        playback.started_at.is_some() && !playback.finished
    }

    fn finish(&self) {
        let callback = self.on_ended.lock().clone();
        if let Some(callback) = callback {
            self.node.state.queue(callback);
        }
    }

    /// Marks the source finished when playback has run its course. A start
    /// duration bounds total play time even while looping.
    fn check_natural_end(&self, now: f64) -> bool {
        let mut playback = self.playback.lock();
        let Some(started_at) = playback.started_at else {
            return false;
        };
        if playback.finished {
            return false;
        }

        let elapsed = (now - started_at).max(0.0) * playback.playback_rate as f64;
        let length = match playback.duration {
            Some(duration) => duration,
            None if playback.looping => return false,
            None => self.buffer_duration - playback.offset,
        }
        .max(0.0);

        if elapsed + END_EPSILON >= length {
            playback.finished = true;
            true
        } else {
            false
        }
    }
}

impl AudioNode for HeadlessBufferSource {
    fn id(&self) -> NodeId {
        self.node.id
    }

    fn connect(&self, destination: &dyn AudioNode) -> Result<()> {
        self.node.connect(destination)
    }

    fn disconnect(&self, destination: &dyn AudioNode) -> Result<()> {
        self.node.disconnect(destination)
    }

    fn disconnect_all(&self) {
        self.node.disconnect_all();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BufferSourceNode for HeadlessBufferSource {
    fn start(&self, when: f64, offset: f64, duration: Option<f64>) -> Result<()> {
        let mut playback = self.playback.lock();
        if playback.started_at.is_some() || playback.finished {
            return Err(BridgeError::InvalidState(format!(
                "{} has already been started",
                self.node.id
            )));
        }

        playback.started_at = Some(self.clock.now().max(when));
        playback.offset = offset.clamp(0.0, self.buffer_duration);
        playback.duration = duration.map(|d| d.max(0.0));
        debug!(
            source = %self.node.id,
            offset = playback.offset,
            duration = ?playback.duration,
            "headless source started"
        );
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        {
            let mut playback = self.playback.lock();
            if playback.started_at.is_none() {
                return Err(BridgeError::InvalidState(format!(
                    "{} stopped before start",
                    self.node.id
                )));
            }
            if playback.finished {
                return Ok(());
            }
            playback.finished = true;
        }
        self.finish();
        Ok(())
    }

    fn set_loop(&self, looping: bool) {
        self.playback.lock().looping = looping;
    }

    fn set_loop_start(&self, seconds: f64) {
        self.playback.lock().loop_start = seconds;
    }

    fn set_loop_end(&self, seconds: f64) {
        self.playback.lock().loop_end = seconds;
    }

    fn set_playback_rate(&self, rate: f32) {
        self.playback.lock().playback_rate = rate;
    }

    fn set_on_ended(&self, callback: Option<PlatformCallback>) {
        *self.on_ended.lock() = callback;
    }

    fn as_node(&self) -> &dyn AudioNode {
        self
    }
}

// ============================================================================
// Context
// ============================================================================

/// Headless processing context.
///
/// Cloning yields another handle to the same graph.
#[derive(Clone)]
pub struct HeadlessAudioContext {
    clock: Arc<ManualClock>,
    state: Arc<GraphState>,
    destination: Arc<HeadlessNode>,
    sources: Arc<Mutex<Vec<Weak<HeadlessBufferSource>>>>,
}

impl HeadlessAudioContext {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(ManualClock::new()))
    }

    /// Build a context driven by an existing clock.
    pub fn with_clock(clock: Arc<ManualClock>) -> Self {
        let state = Arc::new(GraphState::default());
        let destination = Arc::new(HeadlessNode::new(Arc::clone(&state)));
        Self {
            clock,
            state,
            destination,
            sources: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    /// Create a pass-through node, e.g. as an effect placeholder in an
    /// external chain.
    pub fn create_node(&self) -> Arc<HeadlessNode> {
        Arc::new(HeadlessNode::new(Arc::clone(&self.state)))
    }

    pub fn create_buffer(&self, duration: f64) -> Arc<dyn AudioBuffer> {
        Arc::new(HeadlessBuffer::new(duration))
    }

    pub fn is_connected(&self, from: &dyn AudioNode, to: &dyn AudioNode) -> bool {
        self.state.edges.lock().contains(&(from.id(), to.id()))
    }

    pub fn edge_count(&self) -> usize {
        self.state.edges.lock().len()
    }

    /// Most recently created buffer source that is still alive.
    pub fn latest_source(&self) -> Option<Arc<HeadlessBufferSource>> {
        self.sources.lock().iter().rev().find_map(Weak::upgrade)
    }

    /// Number of live sources currently producing sound.
    pub fn playing_sources(&self) -> usize {
        self.sources
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|source| source.is_playing())
            .count()
    }

    /// Advance the context clock, detect naturally finished sources and
    /// deliver every queued notification.
    pub fn advance(&self, seconds: f64) -> usize {
        self.clock.advance(seconds);
        let now = self.clock.now();

        let live: Vec<Arc<HeadlessBufferSource>> = {
            let mut sources = self.sources.lock();
            sources.retain(|weak| weak.strong_count() > 0);
            sources.iter().filter_map(Weak::upgrade).collect()
        };

        for source in live {
            if source.check_natural_end(now) {
                debug!(source = %source.id(), "headless source reached its end");
                source.finish();
            }
        }

        self.dispatch()
    }

    /// Deliver queued notifications. Returns how many were delivered.
    pub fn dispatch(&self) -> usize {
        let callbacks: Vec<PlatformCallback> = self.state.pending.lock().drain(..).collect();
        let delivered = callbacks.len();
        for callback in callbacks {
            callback();
        }
        delivered
    }
}

impl Default for HeadlessAudioContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioContext for HeadlessAudioContext {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn destination(&self) -> Arc<dyn AudioNode> {
        self.destination.clone()
    }

    fn create_gain(&self) -> Result<Arc<dyn GainNode>> {
        Ok(Arc::new(HeadlessGain {
            node: HeadlessNode::new(Arc::clone(&self.state)),
            gain: Mutex::new(1.0),
        }))
    }

    fn create_buffer_source(
        &self,
        buffer: &Arc<dyn AudioBuffer>,
    ) -> Result<Arc<dyn BufferSourceNode>> {
        let source = Arc::new(HeadlessBufferSource {
            node: HeadlessNode::new(Arc::clone(&self.state)),
            buffer_duration: buffer.duration(),
            clock: Arc::clone(&self.clock),
            playback: Mutex::new(SourceSnapshot::default()),
            on_ended: Mutex::new(None),
        });
        self.sources.lock().push(Arc::downgrade(&source));
        Ok(source)
    }
}
