//! Audio bridge traits.
//!
//! These abstractions describe the two native audio backends a host may offer:
//!
//! - **Graph backend**: an [`AudioContext`] producing processing nodes that are
//!   wired into a graph ending at a shared destination. Buffer sources are
//!   single-shot and support sample-accurate offsets, durations and native loop
//!   windows.
//! - **Element backend**: a [`MediaElement`] exposing play/pause/seek and
//!   coarse notifications only.
//!
//! Host platforms ship concrete implementations (a headless desktop runtime,
//! `web-sys` wrappers in the browser). The playback core only ever talks to
//! these traits.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    error::Result,
    platform::{PlatformCallback, PlatformSendSync},
};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a native audio object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

// ============================================================================
// Graph Backend
// ============================================================================

/// A node in the processing graph.
pub trait AudioNode: PlatformSendSync {
    fn id(&self) -> NodeId;

    /// Connect this node's output to `destination`'s input.
    fn connect(&self, destination: &dyn AudioNode) -> Result<()>;

    /// Remove the edge to `destination`.
    ///
    /// Fails with [`BridgeError::NoSuchConnection`](crate::error::BridgeError::NoSuchConnection)
    /// when the edge does not exist, mirroring native graph behaviour.
    fn disconnect(&self, destination: &dyn AudioNode) -> Result<()>;

    /// Remove every outgoing edge. Never fails.
    fn disconnect_all(&self);

    /// Downcasting hook for implementations that need their concrete node type
    /// when wiring edges.
    fn as_any(&self) -> &dyn Any;
}

/// Volume stage.
pub trait GainNode: AudioNode {
    fn set_gain(&self, value: f32);

    fn gain(&self) -> f32;

    fn as_node(&self) -> &dyn AudioNode;
}

/// Decoded PCM data that can feed a [`BufferSourceNode`].
pub trait AudioBuffer: PlatformSendSync {
    /// Length in seconds.
    fn duration(&self) -> f64;

    fn as_any(&self) -> &dyn Any;
}

/// Single-shot buffer playback node.
///
/// Once stopped (or naturally finished) a source cannot be restarted; callers
/// create a new one.
pub trait BufferSourceNode: AudioNode {
    /// Schedule playback at context time `when`, starting `offset` seconds into
    /// the buffer and playing for at most `duration` seconds.
    fn start(&self, when: f64, offset: f64, duration: Option<f64>) -> Result<()>;

    /// Stop immediately. The `ended` callback fires asynchronously afterwards
    /// when the source had been started.
    fn stop(&self) -> Result<()>;

    fn set_loop(&self, looping: bool);

    fn set_loop_start(&self, seconds: f64);

    fn set_loop_end(&self, seconds: f64);

    fn set_playback_rate(&self, rate: f32);

    fn set_on_ended(&self, callback: Option<PlatformCallback>);

    fn as_node(&self) -> &dyn AudioNode;
}

/// Shared processing context owned by the host.
pub trait AudioContext: PlatformSendSync {
    /// Context clock in seconds.
    fn current_time(&self) -> f64;

    /// The shared output endpoint.
    fn destination(&self) -> Arc<dyn AudioNode>;

    fn create_gain(&self) -> Result<Arc<dyn GainNode>>;

    fn create_buffer_source(
        &self,
        buffer: &Arc<dyn AudioBuffer>,
    ) -> Result<Arc<dyn BufferSourceNode>>;
}

// ============================================================================
// Element Backend
// ============================================================================

/// Native media element (play/pause/seek only).
pub trait MediaElement: PlatformSendSync {
    fn id(&self) -> NodeId;

    /// Create a fresh element bound to the same media. The clone starts paused
    /// at position 0 and loads its metadata asynchronously.
    fn clone_element(&self) -> Result<Arc<dyn MediaElement>>;

    /// Media length in seconds; 0 until metadata is known.
    fn duration(&self) -> f64;

    /// Whether metadata is loaded, i.e. seeking is legal.
    fn has_metadata(&self) -> bool;

    fn play(&self) -> Result<()>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Native playback position in seconds.
    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64) -> Result<()>;

    fn set_volume(&self, volume: f32);

    fn set_playback_rate(&self, rate: f32);

    fn set_loop(&self, looping: bool);

    fn set_on_loaded_metadata(&self, callback: Option<PlatformCallback>);

    fn set_on_time_update(&self, callback: Option<PlatformCallback>);

    fn set_on_ended(&self, callback: Option<PlatformCallback>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn node_id_display() {
        let id = NodeId::next();
        assert_eq!(id.to_string(), format!("node#{}", id.as_u64()));
    }
}
