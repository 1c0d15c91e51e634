//! # Playback Core
//!
//! Dual-backend sound playback.
//!
//! ## Overview
//!
//! This crate handles:
//! - The per-sound playback controller ([`SoundInstance`]) with its state
//!   machine, pitch-scaled position bookkeeping and playback windows
//! - Two interchangeable native backends: a processing graph with scheduled
//!   buffer sources, and a plain media element with emulated windowing
//! - The manager contract for shared volume, suspend/resume and teardown
//! - Splicing an external processing chain into the graph output path
//!
//! Native objects come from a platform bridge (`bridge-desktop`,
//! `bridge-wasm`); decoding resources is the host's job.

pub mod backend;
pub mod config;
pub mod error;
pub mod instance;
pub mod manager;
pub mod sound;
pub mod timing;

pub use backend::{BackendEvent, BackendKind, PlaybackBackend, SourceParam};
pub use config::{InstanceOptions, ManagerConfig};
pub use error::{PlaybackError, Result};
pub use instance::{InstanceId, PlaybackEvent, PlaybackStatus, SoundInstance};
pub use manager::{ManagerSignal, PlaybackManager, SoundManager};
pub use sound::{Sound, SoundHandle, SoundResource};
pub use timing::{cap_time, PlaybackWindow, MIN_PITCH};
