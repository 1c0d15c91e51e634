//! # Playback Manager
//!
//! The manager owns what instances share: the optional audio context, the
//! clock, the master volume and the suspend flag. Global changes are
//! broadcast as [`ManagerSignal`]s; instances subscribe while they are
//! playing or paused and drain the signals in `poll_events`.

use crate::config::ManagerConfig;
use crate::timing::sanitize_volume;
use bridge_traits::audio::AudioContext;
use bridge_traits::platform::PlatformSendSync;
use bridge_traits::time::Clock;
use core_runtime::events::{EventBus, Receiver};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Global signal broadcast by a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerSignal {
    /// Master volume changed.
    VolumeChange,
    /// Everything should pause.
    Suspend,
    /// Instances paused by [`ManagerSignal::Suspend`] should resume.
    Resume,
    /// Instances must release their native resources.
    Destroy,
}

/// What a sound instance needs from its manager.
pub trait PlaybackManager: PlatformSendSync {
    /// Shared graph context; `None` when only the element backend exists.
    fn context(&self) -> Option<Arc<dyn AudioContext>>;

    /// Reference clock for position bookkeeping.
    fn clock(&self) -> Arc<dyn Clock>;

    /// Master volume in `[0, 1]`.
    fn volume(&self) -> f32;

    fn is_suspended(&self) -> bool;

    /// A new receiver for manager signals. Past signals are not replayed.
    fn subscribe(&self) -> Receiver<ManagerSignal>;
}

/// Default manager.
pub struct SoundManager {
    context: Option<Arc<dyn AudioContext>>,
    clock: Arc<dyn Clock>,
    volume: RwLock<f32>,
    suspended: AtomicBool,
    signals: EventBus<ManagerSignal>,
}

impl SoundManager {
    pub fn new(
        context: Option<Arc<dyn AudioContext>>,
        clock: Arc<dyn Clock>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            context,
            clock,
            volume: RwLock::new(sanitize_volume(config.volume)),
            suspended: AtomicBool::new(false),
            signals: EventBus::new(config.signal_buffer),
        }
    }

    /// Set the master volume and notify instances.
    pub fn set_volume(&self, volume: f32) {
        *self.volume.write() = sanitize_volume(volume);
        self.broadcast(ManagerSignal::VolumeChange);
    }

    /// Pause every playing instance. Repeated calls are ignored.
    pub fn suspend_all(&self) {
        if !self.suspended.swap(true, Ordering::SeqCst) {
            self.broadcast(ManagerSignal::Suspend);
        }
    }

    /// Resume instances paused by [`Self::suspend_all`].
    pub fn resume_all(&self) {
        if self.suspended.swap(false, Ordering::SeqCst) {
            self.broadcast(ManagerSignal::Resume);
        }
    }

    /// Ask every subscribed instance to release its native resources.
    pub fn destroy(&self) {
        self.broadcast(ManagerSignal::Destroy);
    }

    pub fn subscriber_count(&self) -> usize {
        self.signals.subscriber_count()
    }

    fn broadcast(&self, signal: ManagerSignal) {
        // No subscribers is not an error: nothing is playing.
        let delivered = self.signals.emit(signal).unwrap_or(0);
        debug!(signal = ?signal, delivered, "manager signal broadcast");
    }
}

impl PlaybackManager for SoundManager {
    fn context(&self) -> Option<Arc<dyn AudioContext>> {
        self.context.clone()
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    fn volume(&self) -> f32 {
        *self.volume.read()
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> Receiver<ManagerSignal> {
        self.signals.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::time::ManualClock;
    use core_runtime::events::TryRecvError;

    fn manager() -> SoundManager {
        SoundManager::new(None, Arc::new(ManualClock::new()), ManagerConfig::default())
    }

    #[test]
    fn test_volume_is_clamped_and_broadcast() {
        let manager = manager();
        let mut rx = manager.subscribe();

        manager.set_volume(2.0);
        assert_eq!(manager.volume(), 1.0);
        manager.set_volume(f32::NAN);
        assert_eq!(manager.volume(), 0.0);

        assert_eq!(rx.try_recv().unwrap(), ManagerSignal::VolumeChange);
        assert_eq!(rx.try_recv().unwrap(), ManagerSignal::VolumeChange);
    }

    #[test]
    fn test_suspend_and_resume_are_edge_triggered() {
        let manager = manager();
        let mut rx = manager.subscribe();

        manager.resume_all();
        manager.suspend_all();
        manager.suspend_all();
        assert!(manager.is_suspended());
        manager.resume_all();
        assert!(!manager.is_suspended());

        assert_eq!(rx.try_recv().unwrap(), ManagerSignal::Suspend);
        assert_eq!(rx.try_recv().unwrap(), ManagerSignal::Resume);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let manager = manager();
        manager.destroy();
        assert_eq!(manager.subscriber_count(), 0);
    }

    #[test]
    fn test_initial_volume_from_config() {
        let manager = SoundManager::new(
            None,
            Arc::new(ManualClock::new()),
            ManagerConfig::default().with_volume(0.25),
        );
        assert_eq!(manager.volume(), 0.25);
        assert!(manager.context().is_none());
    }
}
