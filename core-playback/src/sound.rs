//! # Sound Resources
//!
//! A sound resource is immutable decoded (or decodable) media shared between
//! any number of instances. Decoding itself happens elsewhere; the playback
//! core only needs the length and a native handle.

use bridge_traits::audio::{AudioBuffer, MediaElement};
use bridge_traits::platform::PlatformSendSync;
use std::fmt;
use std::sync::Arc;

/// Native handle a resource exposes to the backends.
#[derive(Clone)]
pub enum SoundHandle {
    /// Decoded PCM for the graph backend.
    Buffer(Arc<dyn AudioBuffer>),
    /// Media element for the element backend. Instances never play this
    /// element directly; they clone it.
    Element(Arc<dyn MediaElement>),
}

impl SoundHandle {
    pub fn is_buffer(&self) -> bool {
        matches!(self, SoundHandle::Buffer(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, SoundHandle::Element(_))
    }
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundHandle::Buffer(buffer) => f
                .debug_struct("Buffer")
                .field("duration", &buffer.duration())
                .finish(),
            SoundHandle::Element(element) => f
                .debug_struct("Element")
                .field("id", &element.id())
                .finish(),
        }
    }
}

/// Contract of a playable resource.
#[cfg_attr(test, mockall::automock)]
pub trait SoundResource: PlatformSendSync {
    /// Resource length in seconds; 0 while unknown.
    fn duration(&self) -> f64;

    /// Native handle, `None` while the resource is not ready.
    fn handle(&self) -> Option<SoundHandle>;
}

/// Plain resource wrapping a handle that is ready from the start.
#[derive(Debug, Clone)]
pub struct Sound {
    handle: Option<SoundHandle>,
    duration: f64,
}

impl Sound {
    pub fn from_buffer(buffer: Arc<dyn AudioBuffer>) -> Self {
        let duration = buffer.duration();
        Self {
            handle: Some(SoundHandle::Buffer(buffer)),
            duration,
        }
    }

    /// The duration is read from the element's metadata when available and
    /// falls back to `duration` otherwise.
    pub fn from_element(element: Arc<dyn MediaElement>, duration: f64) -> Self {
        let known = element.duration();
        Self {
            duration: if known > 0.0 { known } else { duration.max(0.0) },
            handle: Some(SoundHandle::Element(element)),
        }
    }

    /// A resource that has not finished loading.
    pub fn unloaded(duration: f64) -> Self {
        Self {
            handle: None,
            duration: duration.max(0.0),
        }
    }

    pub fn into_shared(self) -> Arc<dyn SoundResource> {
        Arc::new(self)
    }
}

impl SoundResource for Sound {
    fn duration(&self) -> f64 {
        match &self.handle {
            Some(SoundHandle::Element(element)) if element.duration() > 0.0 => element.duration(),
            _ => self.duration,
        }
    }

    fn handle(&self) -> Option<SoundHandle> {
        self.handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct FixedBuffer(f64);

    impl AudioBuffer for FixedBuffer {
        fn duration(&self) -> f64 {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_sound_from_buffer() {
        let sound = Sound::from_buffer(Arc::new(FixedBuffer(2.5)));
        assert_eq!(sound.duration(), 2.5);
        assert!(sound.handle().map(|h| h.is_buffer()).unwrap_or(false));
    }

    #[test]
    fn test_unloaded_sound_has_no_handle() {
        let sound = Sound::unloaded(-1.0);
        assert_eq!(sound.duration(), 0.0);
        assert!(sound.handle().is_none());
    }

    #[test]
    fn test_mock_resource() {
        let mut mock = MockSoundResource::new();
        mock.expect_duration().return_const(4.0);
        mock.expect_handle().returning(|| None);

        assert_eq!(mock.duration(), 4.0);
        assert!(mock.handle().is_none());
    }
}
