//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Event broadcasting (`EventBus`) and per-object observers (`EventEmitter`)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities other modules depend on. It
//! establishes the logging conventions and the publish/subscribe mechanisms
//! used between the manager, sound instances and their owners.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{EventBus, EventEmitter, ListenerId};
