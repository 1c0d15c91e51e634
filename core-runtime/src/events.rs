//! # Event System
//!
//! Two complementary publish/subscribe primitives used across the playback
//! core:
//!
//! - **[`EventBus`]**: a broadcast channel (`tokio::sync::broadcast`) for
//!   signals that fan out from one owner to many subscribers, e.g. a manager
//!   broadcasting `suspend` to every sound instance. Subscribing yields an
//!   independent [`Receiver`]; dropping it unsubscribes.
//! - **[`EventEmitter`]**: a synchronous observer registry scoped to a single
//!   object. Handlers are registered per event kind and invoked in
//!   registration order with a borrowed payload.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐  emit   ┌──────────┐  try_recv  ┌──────────┐  emit  ┌─────────┐
//! │ Manager ├────────>│ EventBus ├───────────>│ Instance ├───────>│ Handler │
//! └─────────┘         └──────────┘            └──────────┘        └─────────┘
//!                      (broadcast)                              (EventEmitter)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::EventBus;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Signal { Suspend, Resume }
//!
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//! bus.emit(Signal::Suspend).ok();
//! assert_eq!(rx.try_recv().unwrap(), Signal::Suspend);
//! ```
//!
//! ```rust
//! use core_runtime::events::EventEmitter;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Play, Stop }
//!
//! let mut emitter: EventEmitter<Kind, str> = EventEmitter::new();
//! let id = emitter.on(Kind::Play, |name: &str| println!("{name} started"));
//! assert_eq!(emitter.emit(Kind::Play, "intro"), 1);
//! assert!(emitter.off(id));
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, so receivers may observe
//! `TryRecvError::Lagged(n)` when they fall behind by more than the channel
//! capacity. This is non-fatal; the receiver keeps receiving newer events.

use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError, TryRecvError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for event bus channels.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Broadcast Bus
// ============================================================================

/// Broadcast channel fanning events out to every live subscriber.
pub struct EventBus<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   Values below 1 are raised to 1.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: T) -> Result<usize, SendError<T>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<T> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl<T: Clone> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Observer Registry
// ============================================================================

/// Handle returned by [`EventEmitter::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[cfg(not(target_arch = "wasm32"))]
type Handler<P> = Box<dyn Fn(&P) + Send + Sync>;

#[cfg(target_arch = "wasm32")]
type Handler<P> = Box<dyn Fn(&P)>;

struct Listener<K, P: ?Sized> {
    id: ListenerId,
    kind: K,
    handler: Handler<P>,
}

/// Per-object observer registry keyed by event kind.
///
/// `K` is a small copyable event-kind enum; `P` is the payload handed to
/// handlers by reference (often the emitting object itself).
pub struct EventEmitter<K, P: ?Sized> {
    next_id: u64,
    listeners: Vec<Listener<K, P>>,
}

impl<K, P> EventEmitter<K, P>
where
    K: Copy + PartialEq + fmt::Debug,
    P: ?Sized,
{
    pub fn new() -> Self {
        Self {
            next_id: 1,
            listeners: Vec::new(),
        }
    }

    /// Register `handler` for `kind`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn on<F>(&mut self, kind: K, handler: F) -> ListenerId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.insert(kind, Box::new(handler))
    }

    /// Register `handler` for `kind`.
    #[cfg(target_arch = "wasm32")]
    pub fn on<F>(&mut self, kind: K, handler: F) -> ListenerId
    where
        F: Fn(&P) + 'static,
    {
        self.insert(kind, Box::new(handler))
    }

    fn insert(&mut self, kind: K, handler: Handler<P>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener { id, kind, handler });
        id
    }

    /// Unregister a handler. Returns `false` when it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    /// Unregister every handler for `kind`.
    pub fn off_all(&mut self, kind: K) {
        self.listeners.retain(|listener| listener.kind != kind);
    }

    /// Invoke every handler registered for `kind`, in registration order.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, kind: K, payload: &P) -> usize {
        let mut invoked = 0;
        for listener in self.listeners.iter().filter(|l| l.kind == kind) {
            (listener.handler)(payload);
            invoked += 1;
        }
        tracing::trace!(kind = ?kind, invoked, "event emitted");
        invoked
    }

    pub fn listener_count(&self, kind: K) -> usize {
        self.listeners.iter().filter(|l| l.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<K, P> Default for EventEmitter<K, P>
where
    K: Copy + PartialEq + fmt::Debug,
    P: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P: ?Sized> fmt::Debug for EventEmitter<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Start,
        Stop,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Signal {
        Suspend,
        Resume,
    }

    #[test]
    fn test_event_bus_subscription() {
        let bus: EventBus<Signal> = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_event_emission_no_subscribers() {
        let bus: EventBus<Signal> = EventBus::default();
        assert!(bus.emit(Signal::Suspend).is_err());
    }

    #[test]
    fn test_try_recv_drains_in_order() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        assert_eq!(bus.emit(Signal::Suspend).unwrap(), 1);
        bus.emit(Signal::Resume).unwrap();

        assert_eq!(sub.try_recv().unwrap(), Signal::Suspend);
        assert_eq!(sub.try_recv().unwrap(), Signal::Resume);
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        bus.emit(Signal::Resume).unwrap();

        assert_eq!(sub1.recv().await.unwrap(), Signal::Resume);
        assert_eq!(sub2.recv().await.unwrap(), Signal::Resume);
    }

    #[test]
    fn test_emitter_dispatches_by_kind() {
        let mut emitter: EventEmitter<Kind, str> = EventEmitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        emitter.on(Kind::Start, move |name: &str| {
            log.lock().unwrap().push(format!("start:{name}"))
        });
        let log = Arc::clone(&seen);
        emitter.on(Kind::Stop, move |name: &str| {
            log.lock().unwrap().push(format!("stop:{name}"))
        });

        assert_eq!(emitter.emit(Kind::Start, "a"), 1);
        assert_eq!(emitter.emit(Kind::Stop, "b"), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["start:a", "stop:b"]);
    }

    #[test]
    fn test_emitter_off() {
        let mut emitter: EventEmitter<Kind, u32> = EventEmitter::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let id = emitter.on(Kind::Start, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        emitter.emit(Kind::Start, &1);
        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        emitter.emit(Kind::Start, &2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_emitter_off_all() {
        let mut emitter: EventEmitter<Kind, u32> = EventEmitter::default();
        emitter.on(Kind::Start, |_| {});
        emitter.on(Kind::Start, |_| {});
        emitter.on(Kind::Stop, |_| {});

        emitter.off_all(Kind::Start);
        assert_eq!(emitter.listener_count(Kind::Start), 0);
        assert_eq!(emitter.listener_count(Kind::Stop), 1);
    }
}
