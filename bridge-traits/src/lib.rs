//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and
//! platform-specific audio implementations. Each trait represents a capability
//! that the core requires but that must be implemented differently per platform
//! (desktop, web).
//!
//! ## Traits
//!
//! ### Graph Backend
//! - [`AudioContext`](audio::AudioContext) - Shared processing context and node factory
//! - [`AudioNode`](audio::AudioNode) - Connectable graph node
//! - [`GainNode`](audio::GainNode) - Volume stage
//! - [`BufferSourceNode`](audio::BufferSourceNode) - Single-shot scheduled buffer playback
//! - [`AudioBuffer`](audio::AudioBuffer) - Decoded PCM data
//!
//! ### Element Backend
//! - [`MediaElement`](audio::MediaElement) - Native media element with play/pause/seek
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Monotonic time source for deterministic testing
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Backends |
//! |----------|---------------------|----------|
//! | Desktop  | `bridge-desktop`    | Graph + Element (headless) |
//! | Web      | `bridge-wasm`       | Graph + Element |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific failures to `BridgeError`
//! and keep messages actionable (node ids, requested offsets).
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` on native targets (see
//! [`PlatformSendSync`](platform::PlatformSendSync)). On `wasm32` the bounds
//! are dropped because browser objects are single-threaded.

pub mod audio;
pub mod error;
pub mod platform;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{
    AudioBuffer, AudioContext, AudioNode, BufferSourceNode, GainNode, MediaElement, NodeId,
};
pub use platform::{PlatformCallback, PlatformSend, PlatformSendSync};
#[cfg(not(target_arch = "wasm32"))]
pub use time::SystemClock;
pub use time::{Clock, ManualClock};
