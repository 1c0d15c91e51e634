//! # Playback Configuration
//!
//! Construction options for sound instances and the default manager.
//!
//! Both types deserialize from JSON with per-field defaults, so hosts can ship
//! partial option objects:
//!
//! ```rust
//! use core_playback::config::InstanceOptions;
//!
//! let options = InstanceOptions::from_json(r#"{ "volume": 0.5, "loop": true }"#).unwrap();
//! assert_eq!(options.volume, 0.5);
//! assert!(options.looping);
//! assert_eq!(options.pitch, 1.0);
//! ```

use crate::error::{PlaybackError, Result};
use crate::timing::{sanitize_pitch, sanitize_time, sanitize_volume, MIN_PITCH};
use serde::{Deserialize, Serialize};

/// Options applied when a sound instance is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceOptions {
    /// Instance volume in `[0, 1]`, multiplied by the manager volume.
    ///
    /// Default: 1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Playback rate; also scales how fast the logical position advances.
    ///
    /// Default: 1.0.
    #[serde(default = "default_pitch")]
    pub pitch: f32,

    /// Whether playback wraps at the end of the window.
    ///
    /// Default: false.
    #[serde(default, rename = "loop")]
    pub looping: bool,

    /// Window start within the resource, seconds.
    ///
    /// Default: 0.
    #[serde(default, rename = "startTime", alias = "start_time")]
    pub start_time: f64,

    /// Window length in seconds; 0 plays to the resource end.
    ///
    /// Default: 0.
    #[serde(default)]
    pub duration: f64,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            pitch: default_pitch(),
            looping: false,
            start_time: 0.0,
            duration: 0.0,
        }
    }
}

impl InstanceOptions {
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Coerce every field into its legal range.
    ///
    /// Volume is clamped to `[0, 1]`, pitch raised to at least 0.01 and times
    /// made non-negative. Non-finite values fall back to the range floor.
    pub fn normalized(self) -> Self {
        Self {
            volume: sanitize_volume(self.volume),
            pitch: sanitize_pitch(self.pitch),
            looping: self.looping,
            start_time: sanitize_time(self.start_time),
            duration: sanitize_time(self.duration),
        }
    }

    /// Strict check used by hosts that prefer rejecting bad input over
    /// silently coercing it.
    pub fn validate(&self) -> Result<()> {
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(PlaybackError::InvalidOptions(format!(
                "volume must be within [0, 1], got {}",
                self.volume
            )));
        }

        if !self.pitch.is_finite() || self.pitch < MIN_PITCH {
            return Err(PlaybackError::InvalidOptions(format!(
                "pitch must be at least {}, got {}",
                MIN_PITCH, self.pitch
            )));
        }

        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(PlaybackError::InvalidOptions(format!(
                "startTime must be non-negative, got {}",
                self.start_time
            )));
        }

        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(PlaybackError::InvalidOptions(format!(
                "duration must be non-negative, got {}",
                self.duration
            )));
        }

        Ok(())
    }

    /// Parse options from JSON. Missing fields take their defaults; the
    /// result is normalized.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        Ok(options.normalized())
    }
}

/// Configuration of the default [`SoundManager`](crate::manager::SoundManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Master volume in `[0, 1]`.
    ///
    /// Default: 1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Per-subscriber buffer of the manager signal bus. Instances that fall
    /// further behind observe a lag and skip to the newest signals.
    ///
    /// Default: 32.
    #[serde(default = "default_signal_buffer")]
    pub signal_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            signal_buffer: default_signal_buffer(),
        }
    }
}

impl ManagerConfig {
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_signal_buffer(mut self, capacity: usize) -> Self {
        self.signal_buffer = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(PlaybackError::InvalidOptions(format!(
                "manager volume must be within [0, 1], got {}",
                self.volume
            )));
        }

        if self.signal_buffer == 0 {
            return Err(PlaybackError::InvalidOptions(
                "signal_buffer must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_volume() -> f32 {
    1.0
}

fn default_pitch() -> f32 {
    1.0
}

fn default_signal_buffer() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = InstanceOptions::default();
        assert_eq!(options.volume, 1.0);
        assert_eq!(options.pitch, 1.0);
        assert!(!options.looping);
        assert_eq!(options.start_time, 0.0);
        assert_eq!(options.duration, 0.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let options = InstanceOptions::from_json(r#"{"pitch": 2.0, "startTime": 1.5}"#).unwrap();
        assert_eq!(options.pitch, 2.0);
        assert_eq!(options.start_time, 1.5);
        assert_eq!(options.volume, 1.0);
    }

    #[test]
    fn test_from_json_normalizes() {
        let options =
            InstanceOptions::from_json(r#"{"volume": 3.0, "pitch": 0.0, "duration": -2}"#)
                .unwrap();
        assert_eq!(options.volume, 1.0);
        assert_eq!(options.pitch, MIN_PITCH);
        assert_eq!(options.duration, 0.0);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = InstanceOptions::from_json("{ volume: }").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(InstanceOptions::default().with_volume(1.5).validate().is_err());
        assert!(InstanceOptions::default().with_pitch(0.0).validate().is_err());
        assert!(InstanceOptions::default()
            .with_start_time(-1.0)
            .validate()
            .is_err());
        assert!(InstanceOptions::default()
            .with_duration(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let json = serde_json::to_string(&InstanceOptions::default().with_loop(true)).unwrap();
        assert!(json.contains("\"loop\":true"));
        assert!(json.contains("\"startTime\":0.0"));
    }

    #[test]
    fn test_manager_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.signal_buffer, 32);
        assert!(config.validate().is_ok());
        assert!(config.clone().with_signal_buffer(0).validate().is_err());
        assert!(config.with_volume(-0.1).validate().is_err());
    }
}
