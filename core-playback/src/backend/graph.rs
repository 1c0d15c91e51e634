//! Graph backend adapter.
//!
//! Internal chain, built once per instance:
//!
//! ```text
//! source ──> gain ──> connector ──> destination
//!                          └──> first ··· last ──┘   (external chain)
//! ```

use super::{BackendEvent, BackendKind, PlaybackBackend, SignalKind, SignalQueue, SourceParam};
use crate::error::{PlaybackError, Result};
use crate::sound::{SoundHandle, SoundResource};
use crate::timing::PlaybackWindow;
use bridge_traits::audio::{AudioContext, AudioNode, BufferSourceNode, GainNode};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type ExternalChain = (Arc<dyn AudioNode>, Arc<dyn AudioNode>);

pub struct GraphBackend {
    context: Arc<dyn AudioContext>,
    gain: Arc<dyn GainNode>,
    connector: Arc<dyn GainNode>,
    destination: Arc<dyn AudioNode>,
    source: Option<Arc<dyn BufferSourceNode>>,
    started: bool,
    serial: u64,
    signals: SignalQueue,
    outbox: VecDeque<BackendEvent>,
    external: Option<ExternalChain>,
    pitch: f32,
    looping: bool,
}

impl GraphBackend {
    /// Wire gain, connector and destination on `context`.
    pub fn new(context: Arc<dyn AudioContext>) -> Result<Self> {
        let gain = context.create_gain()?;
        let connector = context.create_gain()?;
        let destination = context.destination();

        gain.connect(connector.as_node())?;
        connector.connect(destination.as_ref())?;

        Ok(Self {
            context,
            gain,
            connector,
            destination,
            source: None,
            started: false,
            serial: 0,
            signals: SignalQueue::new(),
            outbox: VecDeque::new(),
            external: None,
            pitch: 1.0,
            looping: false,
        })
    }

    /// Unhook the current source from the graph. Its `ended` callback stays
    /// registered so a pending notification still reaches the queue.
    fn detach_source(&mut self) {
        if let Some(source) = self.source.take() {
            source.as_node().disconnect_all();
        }
        self.started = false;
    }

    fn build_source(&mut self, sound: &dyn SoundResource) -> Result<Arc<dyn BufferSourceNode>> {
        let buffer = match sound.handle() {
            Some(SoundHandle::Buffer(buffer)) => buffer,
            Some(SoundHandle::Element(_)) => {
                return Err(PlaybackError::UnsupportedHandle {
                    backend: BackendKind::Graph.as_str(),
                })
            }
            None => return Err(PlaybackError::NoSource),
        };

        let source = self.context.create_buffer_source(&buffer)?;
        source.connect(self.gain.as_node())?;
        source.set_on_ended(Some(self.signals.callback(self.serial, SignalKind::Ended)));
        source.set_playback_rate(self.pitch);
        source.set_loop(self.looping);
        Ok(source)
    }

    /// Move the connector output from whatever it feeds now to `first`, and
    /// feed the destination from `last`.
    fn splice(&mut self, first: &Arc<dyn AudioNode>, last: &Arc<dyn AudioNode>) -> Result<()> {
        match &self.external {
            Some((previous_first, previous_last)) => {
                self.connector.disconnect(previous_first.as_ref())?;
                if let Err(e) = previous_last.disconnect(self.destination.as_ref()) {
                    debug!(error = %e, "previous external chain was not connected to output");
                }
            }
            None => self.connector.disconnect(self.destination.as_ref())?,
        }
        self.external = None;

        self.connector.connect(first.as_ref())?;
        last.connect(self.destination.as_ref())?;
        Ok(())
    }
}

impl PlaybackBackend for GraphBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Graph
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn create_source(&mut self, sound: &dyn SoundResource) -> bool {
        self.detach_source();
        self.serial += 1;

        match self.build_source(sound) {
            Ok(source) => {
                trace!(serial = self.serial, "graph source created");
                self.source = Some(source);
                self.outbox.push_back(BackendEvent::Ready);
                true
            }
            Err(PlaybackError::NoSource) => {
                debug!("sound not ready, graph source deferred");
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to create graph source");
                false
            }
        }
    }

    fn start(&mut self, offset: f64, window: &PlaybackWindow) -> Result<()> {
        let source = self.source.as_ref().ok_or(PlaybackError::NoSource)?;
        if self.started {
            return Err(PlaybackError::SourceAlreadyStarted);
        }

        source.set_loop_start(window.start_time);
        source.set_loop_end(window.end());
        let duration = if self.looping || !window.is_partial() {
            None
        } else {
            Some((window.end() - offset).max(0.0))
        };

        source.start(self.context.current_time(), offset, duration)?;
        self.started = true;
        debug!(offset, duration = ?duration, serial = self.serial, "graph source started");
        Ok(())
    }

    fn stop_immediate(&mut self) -> bool {
        let Some(source) = self.source.as_ref() else {
            return false;
        };
        if !self.started {
            return false;
        }

        if let Err(e) = source.stop() {
            warn!(error = %e, "graph source refused to stop");
        }
        self.started = false;
        true
    }

    fn pause_source(&mut self, sound: &dyn SoundResource) -> bool {
        let will_end = self.stop_immediate();
        self.create_source(sound);
        will_end
    }

    fn set_param(&mut self, param: SourceParam) {
        match param {
            SourceParam::Volume(volume) => self.gain.set_gain(volume),
            SourceParam::Pitch(pitch) => {
                self.pitch = pitch;
                if let Some(source) = &self.source {
                    source.set_playback_rate(pitch);
                }
            }
            SourceParam::Loop(looping) => {
                self.looping = looping;
                if let Some(source) = &self.source {
                    source.set_loop(looping);
                }
            }
        }
    }

    fn now(&self) -> f64 {
        self.context.current_time()
    }

    fn native_position(&self) -> Option<f64> {
        None
    }

    fn loop_fixed_at_start(&self) -> bool {
        // Start duration and loop window are baked into the scheduled source
        self.started
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        loop {
            if let Some(event) = self.outbox.pop_front() {
                return Some(event);
            }

            let signal = self.signals.try_next()?;
            if signal.kind != SignalKind::Ended {
                continue;
            }
            if signal.serial == self.serial {
                // The live source finished on its own; stopping it later must
                // not expect another notification.
                self.started = false;
            }
            self.outbox.push_back(BackendEvent::Ended);
        }
    }

    fn release(&mut self) {
        if let Some(source) = self.source.take() {
            source.set_on_ended(None);
            if self.started {
                if let Err(e) = source.stop() {
                    debug!(error = %e, "released source was not running");
                }
            }
            source.as_node().disconnect_all();
        }
        self.started = false;
        self.outbox.clear();
        let dropped = self.signals.clear();
        debug!(dropped, "graph backend released");
    }

    fn set_external_nodes(
        &mut self,
        first: Arc<dyn AudioNode>,
        last: Arc<dyn AudioNode>,
    ) -> Result<()> {
        if let Err(e) = self.splice(&first, &last) {
            warn!(error = %e, "failed to splice external chain");
            // The half-spliced edge may or may not exist at this point
            if let Err(unwind) = self.connector.disconnect(first.as_ref()) {
                trace!(error = %unwind, "connector was not wired to the new chain");
            }
            if let Err(restore) = self.connector.connect(self.destination.as_ref()) {
                warn!(error = %restore, "failed to restore direct output");
            }
            return Err(PlaybackError::ExternalChain(e.to_string()));
        }

        debug!(first = %first.id(), last = %last.id(), "external chain installed");
        self.external = Some((first, last));
        Ok(())
    }

    fn clear_external_nodes(&mut self) -> Result<()> {
        let Some((first, last)) = self.external.take() else {
            return Ok(());
        };

        if let Err(e) = self.connector.disconnect(first.as_ref()) {
            warn!(error = %e, "external chain was not connected to connector");
        }
        if let Err(e) = last.disconnect(self.destination.as_ref()) {
            debug!(error = %e, "external chain was not connected to output");
        }
        self.connector
            .connect(self.destination.as_ref())
            .map_err(|e| PlaybackError::ExternalChain(e.to_string()))?;

        debug!("external chain removed");
        Ok(())
    }

    fn external_nodes(&self) -> (Option<Arc<dyn AudioNode>>, Option<Arc<dyn AudioNode>>) {
        match &self.external {
            Some((first, last)) => (Some(Arc::clone(first)), Some(Arc::clone(last))),
            None => (None, None),
        }
    }
}

impl Drop for GraphBackend {
    fn drop(&mut self) {
        self.release();
        if let Some((_, last)) = self.external.take() {
            last.disconnect(self.destination.as_ref()).ok();
        }
        self.gain.as_node().disconnect_all();
        self.connector.as_node().disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::Sound;
    use bridge_desktop::HeadlessAudioContext;
    use bridge_traits::audio::NodeId;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::any::Any;

    /// Node that cannot feed anything.
    struct RefusingNode {
        id: NodeId,
    }

    impl AudioNode for RefusingNode {
        fn id(&self) -> NodeId {
            self.id
        }

        fn connect(&self, _destination: &dyn AudioNode) -> BridgeResult<()> {
            Err(BridgeError::OperationFailed("refused".into()))
        }

        fn disconnect(&self, destination: &dyn AudioNode) -> BridgeResult<()> {
            Err(BridgeError::NoSuchConnection {
                from: self.id.as_u64(),
                to: destination.id().as_u64(),
            })
        }

        fn disconnect_all(&self) {}

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn setup(duration: f64) -> (HeadlessAudioContext, GraphBackend, Sound) {
        let context = HeadlessAudioContext::new();
        let backend = GraphBackend::new(Arc::new(context.clone())).unwrap();
        let sound = Sound::from_buffer(context.create_buffer(duration));
        (context, backend, sound)
    }

    fn drain(backend: &mut GraphBackend) -> Vec<BackendEvent> {
        std::iter::from_fn(|| backend.poll_event()).collect()
    }

    #[test]
    fn test_create_source_reports_ready() {
        let (_context, mut backend, sound) = setup(2.0);
        assert!(!backend.has_source());
        assert!(backend.create_source(&sound));
        assert!(backend.has_source());
        assert_eq!(drain(&mut backend), vec![BackendEvent::Ready]);
    }

    #[test]
    fn test_unloaded_sound_has_no_source() {
        let (_context, mut backend, _) = setup(2.0);
        assert!(!backend.create_source(&Sound::unloaded(2.0)));
        assert!(backend.start(0.0, &PlaybackWindow::new(0.0, 0.0, 2.0)).is_err());
    }

    #[test]
    fn test_window_bounds_are_forwarded() {
        let (context, mut backend, sound) = setup(10.0);
        backend.create_source(&sound);
        backend
            .start(3.0, &PlaybackWindow::new(2.0, 3.0, 10.0))
            .unwrap();

        let snapshot = context.latest_source().unwrap().snapshot();
        assert_eq!(snapshot.offset, 3.0);
        assert_eq!(snapshot.duration, Some(2.0));
        assert_eq!(snapshot.loop_start, 2.0);
        assert_eq!(snapshot.loop_end, 5.0);
    }

    #[test]
    fn test_looping_start_has_no_duration() {
        let (context, mut backend, sound) = setup(10.0);
        backend.set_param(SourceParam::Loop(true));
        backend.create_source(&sound);
        backend
            .start(2.0, &PlaybackWindow::new(2.0, 3.0, 10.0))
            .unwrap();

        let snapshot = context.latest_source().unwrap().snapshot();
        assert!(snapshot.looping);
        assert_eq!(snapshot.duration, None);
    }

    #[test]
    fn test_sources_are_single_shot() {
        let (_context, mut backend, sound) = setup(2.0);
        backend.create_source(&sound);
        let window = PlaybackWindow::new(0.0, 0.0, 2.0);
        backend.start(0.0, &window).unwrap();
        assert!(matches!(
            backend.start(0.0, &window),
            Err(PlaybackError::SourceAlreadyStarted)
        ));
    }

    #[test]
    fn test_stop_reports_pending_end() {
        let (context, mut backend, sound) = setup(2.0);
        backend.create_source(&sound);
        assert!(!backend.stop_immediate());

        backend.start(0.0, &PlaybackWindow::new(0.0, 0.0, 2.0)).unwrap();
        drain(&mut backend);
        assert!(backend.stop_immediate());
        assert!(!backend.stop_immediate());

        context.dispatch();
        assert_eq!(drain(&mut backend), vec![BackendEvent::Ended]);
    }

    #[test]
    fn test_natural_end_clears_started() {
        let (context, mut backend, sound) = setup(1.0);
        backend.create_source(&sound);
        backend.start(0.0, &PlaybackWindow::new(0.0, 0.0, 1.0)).unwrap();
        drain(&mut backend);

        context.advance(1.5);
        assert_eq!(drain(&mut backend), vec![BackendEvent::Ended]);
        assert!(!backend.stop_immediate());
    }

    #[test]
    fn test_release_is_silent() {
        let (context, mut backend, sound) = setup(2.0);
        backend.create_source(&sound);
        backend.start(0.0, &PlaybackWindow::new(0.0, 0.0, 2.0)).unwrap();
        backend.release();

        context.advance(3.0);
        assert!(drain(&mut backend).is_empty());
        assert!(!backend.has_source());
        assert_eq!(context.playing_sources(), 0);
    }

    #[test]
    fn test_loop_is_fixed_once_started() {
        let (_context, mut backend, sound) = setup(2.0);
        backend.create_source(&sound);
        assert!(!backend.loop_fixed_at_start());

        backend.start(0.0, &PlaybackWindow::new(0.0, 0.0, 2.0)).unwrap();
        assert!(backend.loop_fixed_at_start());

        backend.stop_immediate();
        assert!(!backend.loop_fixed_at_start());
    }

    #[test]
    fn test_failed_splice_unwinds_new_edge() {
        let (context, mut backend, _) = setup(2.0);
        let destination = context.destination();
        let first = context.create_node();
        let first_node: Arc<dyn AudioNode> = first.clone();
        let last: Arc<dyn AudioNode> = Arc::new(RefusingNode { id: NodeId::next() });

        let result = backend.set_external_nodes(first_node, last);
        assert!(matches!(result, Err(PlaybackError::ExternalChain(_))));
        assert!(!context.is_connected(backend.connector.as_node(), first.as_ref()));
        assert!(context.is_connected(backend.connector.as_node(), destination.as_ref()));
        assert!(backend.external_nodes().0.is_none());

        // Direct output is intact, so a later splice finds the edge it expects
        let other = context.create_node();
        let other_node: Arc<dyn AudioNode> = other.clone();
        backend
            .set_external_nodes(other_node.clone(), other_node)
            .unwrap();
        assert!(context.is_connected(other.as_ref(), destination.as_ref()));
        assert!(!context.is_connected(backend.connector.as_node(), first.as_ref()));
    }

    #[test]
    fn test_external_chain_splicing() {
        let (context, mut backend, _) = setup(2.0);
        let destination = context.destination();
        let first = context.create_node();
        let last = context.create_node();
        let first_node: Arc<dyn AudioNode> = first.clone();
        let last_node: Arc<dyn AudioNode> = last.clone();

        backend
            .set_external_nodes(first_node.clone(), last_node.clone())
            .unwrap();
        assert!(context.is_connected(backend.connector.as_node(), first.as_ref()));
        assert!(context.is_connected(last.as_ref(), destination.as_ref()));
        assert!(!context.is_connected(backend.connector.as_node(), destination.as_ref()));

        // Same pair again reconnects identical edges
        backend.set_external_nodes(first_node, last_node).unwrap();
        assert!(context.is_connected(backend.connector.as_node(), first.as_ref()));

        backend.clear_external_nodes().unwrap();
        assert!(context.is_connected(backend.connector.as_node(), destination.as_ref()));
        assert!(!context.is_connected(last.as_ref(), destination.as_ref()));
        assert_eq!(backend.external_nodes().0.map(|n| n.id()), None);

        // Clearing twice is a no-op
        backend.clear_external_nodes().unwrap();
        assert!(context.is_connected(backend.connector.as_node(), destination.as_ref()));
    }
}
