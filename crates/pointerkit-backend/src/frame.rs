#![forbid(unsafe_code)]

//! Frame scheduler adapter.
//!
//! [`FrameScheduler`] hides whether a recognizer runs on the platform's
//! default refresh callback or on the prioritized [`Ticker`](crate::Ticker):
//! with no explicit order it uses
//! [`request_animation_frame`](crate::AnimationFrames::request_animation_frame),
//! otherwise [`request_ordered_frame`](crate::Ticker::request_ordered_frame).
//!
//! # Invariants
//!
//! 1. At most one request is outstanding per scheduler; a new request cancels
//!    the previous one.
//! 2. The pending slot is cleared *before* the callback runs, so a callback
//!    may re-request the next frame.
//! 3. [`cancel`](FrameScheduler::cancel) is idempotent and harmless after the
//!    frame already ran.

use core::cell::Cell;
use core::time::Duration;
use std::rc::Rc;

use crate::{FrameHandle, SharedHost};

/// Per-recognizer frame request/cancel adapter.
pub struct FrameScheduler {
    host: SharedHost,
    order: Option<i32>,
    pending: Rc<Cell<Option<FrameHandle>>>,
}

impl core::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("order", &self.order)
            .field("pending", &self.pending.get())
            .finish()
    }
}

impl FrameScheduler {
    /// Create a scheduler. `order == None` selects the default refresh callback.
    #[must_use]
    pub fn new(host: SharedHost, order: Option<i32>) -> Self {
        Self {
            host,
            order,
            pending: Rc::new(Cell::new(None)),
        }
    }

    /// Explicit ticker order, if any.
    #[inline]
    #[must_use]
    pub const fn order(&self) -> Option<i32> {
        self.order
    }

    /// Whether a request is outstanding.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Request `callback` on the next frame, replacing any outstanding request.
    pub fn request(&self, callback: impl FnOnce(Duration) + 'static) -> FrameHandle {
        self.cancel();
        let pending = Rc::clone(&self.pending);
        let wrapped = Box::new(move |timestamp: Duration| {
            pending.set(None);
            callback(timestamp);
        });
        let handle = match self.order {
            None => self.host.request_animation_frame(wrapped),
            Some(order) => self.host.request_ordered_frame(wrapped, order),
        };
        self.pending.set(Some(handle));
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "frame.request", handle = handle.0, order = ?self.order);
        handle
    }

    /// Cancel the outstanding request, if any.
    pub fn cancel(&self) {
        let Some(handle) = self.pending.take() else {
            return;
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "frame.cancel", handle = handle.0, order = ?self.order);
        match self.order {
            None => self.host.cancel_animation_frame(handle),
            Some(_) => self.host.cancel_ordered_frame(handle),
        }
    }
}
