//! Platform-specific helper abstractions used to keep trait bounds aligned with
//! the threading guarantees of each target.
//!
//! Native targets require `Send + Sync` so audio bridge handles can be shared
//! freely. WebAssembly builds run entirely on a single thread and cannot satisfy
//! those bounds because browser-provided objects (e.g., `web_sys` audio nodes)
//! are not thread-safe. The helper traits below make the required bounds
//! conditional without duplicating every trait definition.

use std::sync::Arc;

/// Marker trait that applies `Send + Sync` on native targets while becoming a
/// no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}

/// Marker trait equivalent to `Send` on native targets.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSend for T where T: Send {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSend {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSend for T {}

/// Notification callback installed on native audio objects (`ended`,
/// `timeupdate`, `loadedmetadata`).
///
/// Callbacks are invoked by the platform runtime on its own schedule, never
/// from within the call that caused them.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformCallback = Arc<dyn Fn() + Send + Sync>;

#[cfg(target_arch = "wasm32")]
pub type PlatformCallback = Arc<dyn Fn()>;
