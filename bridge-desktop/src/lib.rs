//! # Desktop Bridge Implementations
//!
//! Default implementations of the audio bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides a headless audio runtime: both backends are fully
//! simulated and driven by a manual clock, so hosts without an output device,
//! command-line tools and test suites get deterministic behaviour.
//!
//! - `HeadlessAudioContext` implements `AudioContext` (graph backend) with an
//!   edge table that rejects removal of edges that were never connected
//! - `HeadlessMediaRuntime` creates `HeadlessMediaElement`s (element backend)
//!   whose metadata loading and position updates are host-driven
//!
//! Native notifications (`ended`, `timeupdate`, `loadedmetadata`) are queued
//! and only delivered on `advance`/`dispatch`, matching the asynchronous
//! delivery of real platforms.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::HeadlessAudioContext;
//! use bridge_traits::AudioContext;
//!
//! let ctx = HeadlessAudioContext::new();
//! let buffer = ctx.create_buffer(3.0);
//! let source = ctx.create_buffer_source(&buffer)?;
//! source.start(0.0, 0.0, None)?;
//! ctx.advance(3.0); // fires `ended`
//! ```

mod graph;
mod media;

pub use graph::{
    HeadlessAudioContext, HeadlessBuffer, HeadlessBufferSource, HeadlessGain, HeadlessNode,
    SourceSnapshot,
};
pub use media::{ElementSnapshot, HeadlessMediaElement, HeadlessMediaRuntime};
