#![forbid(unsafe_code)]
#![doc = "Host capability traits for pointerkit: the boundary between recognizers and the platform."]
#![doc = ""]
#![doc = "Recognizers never touch the DOM directly. They register listeners, request frames,"]
#![doc = "read the clock and query layout through these traits, so the same code runs against"]
#![doc = "a real browser binding or the deterministic host in `pointerkit-web`."]

pub mod frame;

use core::fmt;
use core::time::Duration;
use std::rc::Rc;

use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventTarget, PointerError, Rect};

pub use frame::FrameScheduler;

/// Handle for one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// One-shot handle for a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Handle for a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Listener registration options (`addEventListener` options).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenOptions {
    /// A passive listener cannot prevent the default action.
    pub passive: bool,
}

impl ListenOptions {
    /// Passive listener.
    pub const PASSIVE: Self = Self { passive: true };
    /// Listener allowed to call `prevent_default`.
    pub const ACTIVE: Self = Self { passive: false };
}

/// Device event listener.
pub type Listener = Rc<dyn Fn(&DeviceEvent)>;

/// Frame callback, invoked with the frame timestamp.
pub type FrameCallback = Box<dyn FnOnce(Duration)>;

/// Timer callback.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Register/unregister raw device event listeners.
///
/// Implementations must tolerate `listen` / `unlisten` calls made from inside
/// a listener that is currently being dispatched.
pub trait EventSource {
    /// Attach `listener` for `kind` events reaching `target`.
    fn listen(
        &self,
        target: EventTarget,
        kind: EventKind,
        options: ListenOptions,
        listener: Listener,
    ) -> ListenerId;

    /// Detach a listener. Unknown ids are a bookkeeping error.
    fn unlisten(&self, id: ListenerId) -> Result<(), PointerError>;
}

/// Platform display-refresh callback (`requestAnimationFrame`).
pub trait AnimationFrames {
    fn request_animation_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Cancel a pending request. Stale or unknown handles are ignored.
    fn cancel_animation_frame(&self, handle: FrameHandle);
}

/// Prioritized per-frame ticker: within one frame, callbacks run by
/// ascending `order`.
pub trait Ticker {
    fn request_ordered_frame(&self, callback: FrameCallback, order: i32) -> FrameHandle;

    /// Cancel a pending request. Stale or unknown handles are ignored.
    fn cancel_ordered_frame(&self, handle: FrameHandle);
}

/// Monotonic clock (`Date.now()` / `performance.now()` equivalent).
pub trait Clock {
    /// Elapsed time since an unspecified origin, monotonically non-decreasing.
    fn now(&self) -> Duration;
}

/// One-shot timers (`setTimeout` / `clearTimeout`).
pub trait Timers {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Clear a pending timer. Stale or unknown handles are ignored.
    fn clear_timeout(&self, handle: TimerHandle);
}

/// Layout and tree queries.
pub trait ElementTree {
    /// `getBoundingClientRect()`, or `None` for unknown elements.
    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    /// `ancestor.contains(node)`: true when `node` is `ancestor` or a descendant.
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool;
}

/// Everything a recognizer needs from the platform.
pub trait Host: EventSource + AnimationFrames + Ticker + Clock + Timers + ElementTree {}

impl<T> Host for T where T: EventSource + AnimationFrames + Ticker + Clock + Timers + ElementTree {}

/// Shared host handle held by every registration.
pub type SharedHost = Rc<dyn Host>;

/// Wall clock anchored at construction.
///
/// Uses `web_time::Instant`, which maps to `performance.now()` on wasm.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: web_time::Instant,
}

impl WallClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Resolve an element's bounding box, failing for unknown elements.
pub fn element_rect(tree: &dyn ElementTree, element: ElementId) -> Result<Rect, PointerError> {
    tree.bounding_rect(element)
        .ok_or(PointerError::UnknownElement(EventTarget::Element(element)))
}
