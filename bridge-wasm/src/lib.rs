//! WebAssembly Bridge Implementations
//!
//! Browser implementations of the audio traits defined in `bridge-traits`,
//! built on `web-sys` and `wasm-bindgen`.
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It will not compile for native targets.
//!
//! # Implementations
//!
//! - `WebAudioContext`: Web Audio context, gain and buffer source nodes (graph backend)
//! - `WebMediaElement`: `HTMLAudioElement` wrapper (element backend)
//! - `PerformanceClock`: `performance.now()` clock for element playback
//!
//! # Examples
//!
//! ```ignore
//! use bridge_wasm::{PerformanceClock, WebAudioContext};
//! use core_playback::{ManagerConfig, SoundManager};
//! use std::sync::Arc;
//!
//! let context = Arc::new(WebAudioContext::new()?);
//! let manager = SoundManager::new(
//!     Some(context),
//!     Arc::new(PerformanceClock::new()?),
//!     ManagerConfig::default(),
//! );
//! ```

#![cfg(target_arch = "wasm32")]
#![warn(missing_docs)]

pub mod audio;
pub mod error;
pub mod media;
pub mod time;

// Re-export commonly used types
pub use audio::{WebAudioContext, WebBuffer, WebBufferSource, WebGain, WebNode};
pub use error::{WasmError, WasmResult};
pub use media::WebMediaElement;
pub use time::PerformanceClock;
