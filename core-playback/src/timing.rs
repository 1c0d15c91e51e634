//! Window and position arithmetic shared by the controller and the backends.

/// Lowest accepted playback rate.
pub const MIN_PITCH: f32 = 0.01;

/// `t mod d` normalised into `[0, d)`.
///
/// Returns 0 when `d` is zero, negative or not finite, and when `t` is not
/// finite, so callers never see NaN.
pub fn cap_time(t: f64, d: f64) -> f64 {
    if !(d.is_finite() && d > 0.0) || !t.is_finite() {
        return 0.0;
    }
    let wrapped = t % d;
    if wrapped < 0.0 {
        // -0.0 + d == d for tiny negatives; keep the result inside [0, d)
        let shifted = wrapped + d;
        if shifted >= d {
            0.0
        } else {
            shifted
        }
    } else {
        wrapped
    }
}

/// Volume coerced into `[0, 1]`; non-finite input becomes 0.
pub fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Pitch raised to at least [`MIN_PITCH`]; non-finite input becomes the floor.
pub fn sanitize_pitch(pitch: f32) -> f32 {
    if pitch.is_finite() {
        pitch.max(MIN_PITCH)
    } else {
        MIN_PITCH
    }
}

/// Times are non-negative; non-finite input becomes 0.
pub fn sanitize_time(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}

/// Sub-range of a resource an instance plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackWindow {
    /// Window start within the resource, seconds.
    pub start_time: f64,
    /// Window length; 0 plays to the resource end.
    pub duration: f64,
    /// Full resource length.
    pub resource_duration: f64,
}

impl PlaybackWindow {
    pub fn new(start_time: f64, duration: f64, resource_duration: f64) -> Self {
        Self {
            start_time: sanitize_time(start_time),
            duration: sanitize_time(duration),
            resource_duration: sanitize_time(resource_duration),
        }
    }

    /// Length of the window actually playable.
    ///
    /// An explicit duration is cut at the resource end; without one the whole
    /// resource length is used.
    pub fn effective_duration(&self) -> f64 {
        if self.duration > 0.0 {
            self.duration
                .min(self.resource_duration - self.start_time)
                .max(0.0)
        } else {
            self.resource_duration
        }
    }

    /// Whether the window is narrower than the whole resource.
    pub fn is_partial(&self) -> bool {
        self.start_time > 0.0 || self.duration > 0.0
    }

    /// Absolute resource position where the window ends.
    pub fn end(&self) -> f64 {
        if self.duration > 0.0 {
            (self.start_time + self.effective_duration()).min(self.resource_duration)
        } else {
            self.resource_duration
        }
    }

    /// Translate a window-relative position into an absolute resource offset.
    pub fn absolute_offset(&self, relative: f64) -> f64 {
        let within = cap_time(relative, self.effective_duration());
        cap_time(self.start_time + within, self.resource_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_time_zero_duration() {
        assert_eq!(cap_time(5.0, 0.0), 0.0);
        assert_eq!(cap_time(-3.0, 0.0), 0.0);
        assert_eq!(cap_time(f64::NAN, 0.0), 0.0);
        assert_eq!(cap_time(1.0, f64::NAN), 0.0);
    }

    #[test]
    fn test_cap_time_wraps() {
        assert_eq!(cap_time(4.0, 3.0), 1.0);
        assert_eq!(cap_time(2.5, 3.0), 2.5);
        assert_eq!(cap_time(3.0, 3.0), 0.0);
        assert_eq!(cap_time(-1.0, 3.0), 2.0);
    }

    #[test]
    fn test_sanitizers() {
        assert_eq!(sanitize_volume(1.5), 1.0);
        assert_eq!(sanitize_volume(-0.5), 0.0);
        assert_eq!(sanitize_volume(f32::NAN), 0.0);
        assert_eq!(sanitize_pitch(0.0), MIN_PITCH);
        assert_eq!(sanitize_pitch(2.0), 2.0);
        assert_eq!(sanitize_pitch(f32::INFINITY), MIN_PITCH);
        assert_eq!(sanitize_time(-1.0), 0.0);
        assert_eq!(sanitize_time(f64::NAN), 0.0);
    }

    #[test]
    fn test_effective_duration() {
        assert_eq!(PlaybackWindow::new(2.0, 3.0, 10.0).effective_duration(), 3.0);
        assert_eq!(PlaybackWindow::new(8.0, 5.0, 10.0).effective_duration(), 2.0);
        assert_eq!(PlaybackWindow::new(0.0, 0.0, 10.0).effective_duration(), 10.0);
        assert_eq!(PlaybackWindow::new(12.0, 5.0, 10.0).effective_duration(), 0.0);
    }

    #[test]
    fn test_window_end_and_partial() {
        let window = PlaybackWindow::new(2.0, 3.0, 10.0);
        assert_eq!(window.end(), 5.0);
        assert!(window.is_partial());

        let whole = PlaybackWindow::new(0.0, 0.0, 10.0);
        assert_eq!(whole.end(), 10.0);
        assert!(!whole.is_partial());
    }

    #[test]
    fn test_absolute_offset() {
        let window = PlaybackWindow::new(2.0, 3.0, 10.0);
        assert_eq!(window.absolute_offset(0.0), 2.0);
        assert_eq!(window.absolute_offset(1.5), 3.5);
        // 4 mod 3 = 1 -> 2 + 1
        assert_eq!(window.absolute_offset(4.0), 3.0);

        let tail = PlaybackWindow::new(8.0, 0.0, 10.0);
        // 8 + 3 wraps around the resource end
        assert_eq!(tail.absolute_offset(3.0), 1.0);
    }
}
