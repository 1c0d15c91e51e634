//! # Playback Error Types
//!
//! Errors raised inside the playback core. The public sound-instance contract
//! never surfaces them: controller operations log the error and report `false`
//! or do nothing. Backends and configuration loaders return them directly.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// No backend source exists (resource not decoded/ready).
    #[error("No playback source available")]
    NoSource,

    /// The sound resource handle does not match the selected backend.
    #[error("Sound handle unsupported by {backend} backend")]
    UnsupportedHandle { backend: &'static str },

    /// A single-shot source was asked to start twice.
    #[error("Playback source already started")]
    SourceAlreadyStarted,

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// Splicing the external processing chain failed.
    #[error("External chain error: {0}")]
    ExternalChain(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Instance or manager options are out of range.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Options could not be parsed.
    #[error("Options parse error: {0}")]
    OptionsParse(#[from] serde_json::Error),

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// Native audio object rejected an operation.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if the error comes from the native platform layer.
    pub fn is_platform_error(&self) -> bool {
        matches!(self, PlaybackError::Bridge(_))
    }

    /// Returns `true` if the error is caused by caller-supplied configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidOptions(_) | PlaybackError::OptionsParse(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
