#![forbid(unsafe_code)]

//! `pointerkit-web` provides a deterministic, host-driven implementation of
//! every `pointerkit-backend` capability.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS, or a test) pushes
//!   device events and advances time explicitly.
//! - **DOM-shaped dispatch**: events bubble element → ancestors → document →
//!   window, passive listeners cannot prevent default, and listeners added
//!   during a dispatch do not see that dispatch.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! This crate intentionally does not bind to `wasm-bindgen`. A browser binding
//! forwards DOM events into [`DeterministicHost::dispatch`] and drives
//! [`DeterministicHost::tick_frame`] from `requestAnimationFrame`.

#[cfg(feature = "input-parser")]
pub mod input_parser;

use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::collections::BTreeMap;

use pointerkit_backend::{
    AnimationFrames, Clock, ElementTree, EventSource, FrameCallback, FrameHandle, ListenOptions,
    Listener, ListenerId, Ticker, TimerCallback, TimerHandle, Timers,
};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventTarget, PointerError, Rect};

#[derive(Debug, Clone, Copy)]
struct ElementNode {
    parent: Option<ElementId>,
    rect: Rect,
}

struct ListenerEntry {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    options: ListenOptions,
    listener: Listener,
}

struct PendingFrame {
    handle: FrameHandle,
    /// Default refresh callbacks share order 0 with the ticker.
    order: i32,
    seq: u64,
    callback: FrameCallback,
}

struct PendingTimer {
    handle: TimerHandle,
    due: Duration,
    seq: u64,
    callback: TimerCallback,
}

/// Result of one [`DeterministicHost::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Number of listeners invoked.
    pub delivered: usize,
    /// Whether a non-passive listener called `prevent_default`.
    pub default_prevented: bool,
}

/// Deterministic web host: element tree, listeners, frames, timers, clock.
///
/// All methods take `&self`; listeners and callbacks may call back into the
/// host while they run.
#[derive(Default)]
pub struct DeterministicHost {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    next_seq: Cell<u64>,
    elements: RefCell<BTreeMap<ElementId, ElementNode>>,
    listeners: RefCell<Vec<ListenerEntry>>,
    frames: RefCell<Vec<PendingFrame>>,
    timers: RefCell<Vec<PendingTimer>>,
    frames_run: Cell<u64>,
}

impl core::fmt::Debug for DeterministicHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeterministicHost")
            .field("now", &self.now.get())
            .field("elements", &self.elements.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .field("frames", &self.frames.borrow().len())
            .field("timers", &self.timers.borrow().len())
            .finish()
    }
}

impl DeterministicHost {
    /// Create an empty host at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn next_seq(&self) -> u64 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        seq
    }

    // --- element tree -------------------------------------------------------

    /// Insert an element under `parent` with the given layout box.
    pub fn add_element(&self, parent: Option<ElementId>, rect: Rect) -> ElementId {
        let id = ElementId(self.next_id());
        self.elements
            .borrow_mut()
            .insert(id, ElementNode { parent, rect });
        id
    }

    /// Update an element's layout box. Returns `false` for unknown elements.
    pub fn set_rect(&self, element: ElementId, rect: Rect) -> bool {
        match self.elements.borrow_mut().get_mut(&element) {
            Some(node) => {
                node.rect = rect;
                true
            }
            None => false,
        }
    }

    fn parent_of(&self, element: ElementId) -> Option<ElementId> {
        self.elements.borrow().get(&element).and_then(|n| n.parent)
    }

    /// Bubbling path for an event dispatched at `target`.
    fn propagation_path(&self, target: EventTarget, kind: EventKind) -> Vec<EventTarget> {
        if !kind.bubbles() {
            return vec![target];
        }
        let mut path = Vec::with_capacity(4);
        match target {
            EventTarget::Element(id) => {
                let mut cursor = Some(id);
                while let Some(el) = cursor {
                    path.push(EventTarget::Element(el));
                    cursor = self.parent_of(el);
                }
                path.push(EventTarget::Document);
                path.push(EventTarget::Window);
            }
            EventTarget::Document => {
                path.push(EventTarget::Document);
                path.push(EventTarget::Window);
            }
            EventTarget::Window => path.push(EventTarget::Window),
        }
        path
    }

    // --- time ---------------------------------------------------------------

    /// Jump the clock to `now` without firing timers. Never moves backward.
    pub fn set_time(&self, now: Duration) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }

    /// Advance the clock by `dt`, firing due timers in deadline order.
    pub fn advance(&self, dt: Duration) -> usize {
        let target = self.now.get().saturating_add(dt);
        let mut fired = 0;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let idx = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(idx, _)| idx);
                idx.map(|idx| timers.swap_remove(idx))
            };
            let Some(timer) = next else {
                break;
            };
            if timer.due > self.now.get() {
                self.now.set(timer.due);
            }
            #[cfg(feature = "tracing")]
            tracing::trace!(message = "host.timer", handle = timer.handle.0);
            (timer.callback)();
            fired += 1;
        }
        self.set_time(target);
        fired
    }

    // --- frames -------------------------------------------------------------

    /// Advance the clock by `dt` (firing timers), then run one frame.
    ///
    /// Returns the number of frame callbacks invoked.
    pub fn tick_frame(&self, dt: Duration) -> usize {
        self.advance(dt);
        self.run_frame()
    }

    /// Run every frame callback requested before this call, at the current
    /// time, ordered by (order, request sequence).
    pub fn run_frame(&self) -> usize {
        let mut due: Vec<(i32, u64, FrameHandle)> = self
            .frames
            .borrow()
            .iter()
            .map(|f| (f.order, f.seq, f.handle))
            .collect();
        due.sort_unstable_by_key(|&(order, seq, _)| (order, seq));

        let timestamp = self.now.get();
        let mut ran = 0;
        for (_, _, handle) in due {
            let entry = {
                let mut frames = self.frames.borrow_mut();
                frames
                    .iter()
                    .position(|f| f.handle == handle)
                    .map(|idx| frames.remove(idx))
            };
            // Cancelled by an earlier callback in this frame.
            let Some(entry) = entry else {
                continue;
            };
            (entry.callback)(timestamp);
            ran += 1;
        }
        self.frames_run.set(self.frames_run.get() + 1);
        ran
    }

    /// Number of frames run so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames_run.get()
    }

    // --- dispatch -----------------------------------------------------------

    /// Dispatch an event, stamped with the current clock time.
    pub fn dispatch(&self, mut event: DeviceEvent) -> DispatchOutcome {
        event.time_stamp = self.now.get();
        self.dispatch_stamped(&event)
    }

    /// Dispatch an event keeping its own timestamp.
    pub fn dispatch_stamped(&self, event: &DeviceEvent) -> DispatchOutcome {
        let mut delivered = 0;
        for node in self.propagation_path(event.target, event.kind) {
            let matching: Vec<(ListenerId, bool, Listener)> = self
                .listeners
                .borrow()
                .iter()
                .filter(|l| l.target == node && l.kind == event.kind)
                .map(|l| (l.id, l.options.passive, Listener::clone(&l.listener)))
                .collect();
            for (id, passive, listener) in matching {
                // Removed by an earlier listener during this dispatch.
                if !self.listeners.borrow().iter().any(|l| l.id == id) {
                    continue;
                }
                let prevented = event.is_default_prevented();
                listener(event);
                if passive {
                    event.set_default_prevented(prevented);
                }
                delivered += 1;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            message = "host.dispatch",
            kind = event.kind.name(),
            delivered,
            default_prevented = event.is_default_prevented()
        );
        DispatchOutcome {
            delivered,
            default_prevented: event.is_default_prevented(),
        }
    }

    // --- introspection ------------------------------------------------------

    /// Total registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Registered listeners for one target and kind.
    #[must_use]
    pub fn listener_count_for(&self, target: EventTarget, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .count()
    }

    /// Ids of the listeners registered for one target and kind, oldest first.
    #[must_use]
    pub fn listener_ids_for(&self, target: EventTarget, kind: EventKind) -> Vec<ListenerId> {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .map(|l| l.id)
            .collect()
    }

    /// Whether the listener for `target`/`kind` was registered passive.
    #[must_use]
    pub fn is_passive(&self, target: EventTarget, kind: EventKind) -> Option<bool> {
        self.listeners
            .borrow()
            .iter()
            .find(|l| l.target == target && l.kind == kind)
            .map(|l| l.options.passive)
    }

    /// Outstanding frame requests.
    #[must_use]
    pub fn pending_frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Outstanding timers.
    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    fn push_frame(&self, callback: FrameCallback, order: i32) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        let seq = self.next_seq();
        self.frames.borrow_mut().push(PendingFrame {
            handle,
            order,
            seq,
            callback,
        });
        handle
    }

    fn drop_frame(&self, handle: FrameHandle) {
        self.frames.borrow_mut().retain(|f| f.handle != handle);
    }
}

impl EventSource for DeterministicHost {
    fn listen(
        &self,
        target: EventTarget,
        kind: EventKind,
        options: ListenOptions,
        listener: Listener,
    ) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            target,
            kind,
            options,
            listener,
        });
        id
    }

    fn unlisten(&self, id: ListenerId) -> Result<(), PointerError> {
        let mut listeners = self.listeners.borrow_mut();
        let idx = listeners
            .iter()
            .position(|l| l.id == id)
            .ok_or(PointerError::MissingRegistration {
                resource: "listener",
                id: id.0,
            })?;
        listeners.remove(idx);
        Ok(())
    }
}

impl AnimationFrames for DeterministicHost {
    fn request_animation_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.push_frame(callback, 0)
    }

    fn cancel_animation_frame(&self, handle: FrameHandle) {
        self.drop_frame(handle);
    }
}

impl Ticker for DeterministicHost {
    fn request_ordered_frame(&self, callback: FrameCallback, order: i32) -> FrameHandle {
        self.push_frame(callback, order)
    }

    fn cancel_ordered_frame(&self, handle: FrameHandle) {
        self.drop_frame(handle);
    }
}

impl Clock for DeterministicHost {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl Timers for DeterministicHost {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle(self.next_id());
        let seq = self.next_seq();
        self.timers.borrow_mut().push(PendingTimer {
            handle,
            due: self.now.get().saturating_add(delay),
            seq,
            callback,
        });
        handle
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.timers.borrow_mut().retain(|t| t.handle != handle);
    }
}

impl ElementTree for DeterministicHost {
    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        self.elements.borrow().get(&element).map(|n| n.rect)
    }

    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut cursor = Some(node);
        while let Some(el) = cursor {
            if el == ancestor {
                return true;
            }
            cursor = self.parent_of(el);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointerkit_core::Point;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Rc::clone(log);
        Rc::new(move |_ev: &DeviceEvent| log.borrow_mut().push(tag))
    }

    fn tree() -> (DeterministicHost, ElementId, ElementId) {
        let host = DeterministicHost::new();
        let parent = host.add_element(None, Rect::new(0.0, 0.0, 100.0, 100.0));
        let child = host.add_element(Some(parent), Rect::new(10.0, 10.0, 20.0, 20.0));
        (host, parent, child)
    }

    #[test]
    fn dispatch_bubbles_to_document_and_window() {
        let (host, parent, child) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        host.listen(
            EventTarget::Window,
            EventKind::MouseUp,
            ListenOptions::PASSIVE,
            recorder(&log, "window"),
        );
        host.listen(
            EventTarget::Document,
            EventKind::MouseUp,
            ListenOptions::PASSIVE,
            recorder(&log, "document"),
        );
        host.listen(
            parent.into(),
            EventKind::MouseUp,
            ListenOptions::PASSIVE,
            recorder(&log, "parent"),
        );
        host.listen(
            child.into(),
            EventKind::MouseUp,
            ListenOptions::PASSIVE,
            recorder(&log, "child"),
        );
        host.listen(
            child.into(),
            EventKind::MouseDown,
            ListenOptions::PASSIVE,
            recorder(&log, "other-kind"),
        );

        let out = host.dispatch(DeviceEvent::mouse(EventKind::MouseUp, child, 1.0, 1.0));
        assert_eq!(out.delivered, 4);
        assert_eq!(*log.borrow(), vec!["child", "parent", "document", "window"]);

        log.borrow_mut().clear();
        host.dispatch(DeviceEvent::mouse(
            EventKind::MouseUp,
            EventTarget::Document,
            1.0,
            1.0,
        ));
        assert_eq!(*log.borrow(), vec!["document", "window"]);
    }

    #[test]
    fn focus_does_not_bubble() {
        let (host, parent, child) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        host.listen(
            parent.into(),
            EventKind::Focus,
            ListenOptions::PASSIVE,
            recorder(&log, "parent"),
        );
        let out = host.dispatch(DeviceEvent::focus(EventKind::Focus, child));
        assert_eq!(out.delivered, 0);
        host.dispatch(DeviceEvent::focus(EventKind::Focus, parent));
        assert_eq!(*log.borrow(), vec!["parent"]);
    }

    #[test]
    fn passive_listener_cannot_prevent_default() {
        let (host, _, child) = tree();
        host.listen(
            child.into(),
            EventKind::Wheel,
            ListenOptions::PASSIVE,
            Rc::new(|ev: &DeviceEvent| ev.prevent_default()),
        );
        let out = host.dispatch(DeviceEvent::wheel(
            child,
            pointerkit_core::WheelDelta::pixels(0.0, 1.0),
        ));
        assert!(!out.default_prevented);

        host.listen(
            child.into(),
            EventKind::Wheel,
            ListenOptions::ACTIVE,
            Rc::new(|ev: &DeviceEvent| ev.prevent_default()),
        );
        let out = host.dispatch(DeviceEvent::wheel(
            child,
            pointerkit_core::WheelDelta::pixels(0.0, 1.0),
        ));
        assert!(out.default_prevented);
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let host = Rc::new(DeterministicHost::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(Cell::new(None));
        {
            let host2 = Rc::clone(&host);
            let second = Rc::clone(&second);
            host.listen(
                EventTarget::Window,
                EventKind::MouseMove,
                ListenOptions::PASSIVE,
                Rc::new(move |_: &DeviceEvent| {
                    if let Some(id) = second.get() {
                        host2.unlisten(id).unwrap();
                    }
                }),
            );
        }
        second.set(Some(host.listen(
            EventTarget::Window,
            EventKind::MouseMove,
            ListenOptions::PASSIVE,
            recorder(&log, "second"),
        )));
        let out = host.dispatch(DeviceEvent::mouse(
            EventKind::MouseMove,
            EventTarget::Window,
            0.0,
            0.0,
        ));
        assert_eq!(out.delivered, 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unlisten_unknown_is_missing_registration() {
        let host = DeterministicHost::new();
        let err = host.unlisten(ListenerId(42)).unwrap_err();
        assert_eq!(
            err,
            PointerError::MissingRegistration {
                resource: "listener",
                id: 42
            }
        );
    }

    #[test]
    fn frames_run_by_order_then_request_sequence() {
        let host = DeterministicHost::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (tag, order) in [("raf-a", None), ("late", Some(5)), ("early", Some(-1)), ("raf-b", None)]
        {
            let log = Rc::clone(&log);
            let cb: FrameCallback = Box::new(move |_| log.borrow_mut().push(tag));
            match order {
                None => host.request_animation_frame(cb),
                Some(o) => host.request_ordered_frame(cb, o),
            };
        }
        assert_eq!(host.tick_frame(Duration::from_millis(16)), 4);
        assert_eq!(*log.borrow(), vec!["early", "raf-a", "raf-b", "late"]);
        assert_eq!(host.pending_frame_count(), 0);
    }

    #[test]
    fn frame_requested_during_frame_runs_next_tick() {
        let host = Rc::new(DeterministicHost::new());
        let stamps = Rc::new(RefCell::new(Vec::new()));
        {
            let host2 = Rc::clone(&host);
            let stamps = Rc::clone(&stamps);
            host.request_animation_frame(Box::new(move |ts| {
                stamps.borrow_mut().push(ts);
                let stamps = Rc::clone(&stamps);
                host2.request_animation_frame(Box::new(move |ts| stamps.borrow_mut().push(ts)));
            }));
        }
        assert_eq!(host.tick_frame(Duration::from_millis(16)), 1);
        assert_eq!(host.tick_frame(Duration::from_millis(16)), 1);
        assert_eq!(
            *stamps.borrow(),
            vec![Duration::from_millis(16), Duration::from_millis(32)]
        );
    }

    #[test]
    fn cancelled_frame_does_not_run() {
        let host = DeterministicHost::new();
        let ran = Rc::new(Cell::new(false));
        let ran2 = Rc::clone(&ran);
        let handle = host.request_animation_frame(Box::new(move |_| ran2.set(true)));
        host.cancel_animation_frame(handle);
        host.cancel_animation_frame(handle);
        assert_eq!(host.tick_frame(Duration::from_millis(16)), 0);
        assert!(!ran.get());
    }

    #[test]
    fn timers_fire_in_deadline_order_at_their_deadline() {
        let host = Rc::new(DeterministicHost::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        for (tag, ms) in [("b", 100u64), ("a", 50), ("c", 300)] {
            let log = Rc::clone(&log);
            let host2 = Rc::clone(&host);
            host.set_timeout(
                Duration::from_millis(ms),
                Box::new(move || log.borrow_mut().push((tag, host2.now()))),
            );
        }
        assert_eq!(host.advance(Duration::from_millis(150)), 2);
        assert_eq!(
            *log.borrow(),
            vec![
                ("a", Duration::from_millis(50)),
                ("b", Duration::from_millis(100))
            ]
        );
        assert_eq!(host.now(), Duration::from_millis(150));
        assert_eq!(host.pending_timer_count(), 1);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let host = DeterministicHost::new();
        let fired = Rc::new(Cell::new(false));
        let fired2 = Rc::clone(&fired);
        let handle = host.set_timeout(Duration::from_millis(10), Box::new(move || fired2.set(true)));
        host.clear_timeout(handle);
        host.advance(Duration::from_secs(1));
        assert!(!fired.get());
    }

    #[test]
    fn contains_walks_ancestors() {
        let (host, parent, child) = tree();
        let stranger = host.add_element(None, Rect::default());
        assert!(host.contains(parent, child));
        assert!(host.contains(child, child));
        assert!(!host.contains(child, parent));
        assert!(!host.contains(parent, stranger));
    }

    #[test]
    fn bounding_rect_and_set_rect() {
        let (host, _, child) = tree();
        assert_eq!(
            host.bounding_rect(child),
            Some(Rect::new(10.0, 10.0, 20.0, 20.0))
        );
        assert!(host.set_rect(child, Rect::new(1.0, 2.0, 3.0, 4.0)));
        assert_eq!(
            host.bounding_rect(child).map(|r| r.to_local(Point::new(2.0, 3.0))),
            Some(Point::new(1.0, 1.0))
        );
        assert!(!host.set_rect(ElementId(999), Rect::default()));
    }

    #[test]
    fn dispatch_stamps_current_time() {
        let host = Rc::new(DeterministicHost::new());
        let seen = Rc::new(Cell::new(Duration::ZERO));
        let seen2 = Rc::clone(&seen);
        host.listen(
            EventTarget::Window,
            EventKind::MouseMove,
            ListenOptions::PASSIVE,
            Rc::new(move |ev: &DeviceEvent| seen2.set(ev.time_stamp)),
        );
        host.set_time(Duration::from_millis(250));
        host.dispatch(DeviceEvent::mouse(
            EventKind::MouseMove,
            EventTarget::Window,
            0.0,
            0.0,
        ));
        assert_eq!(seen.get(), Duration::from_millis(250));
    }
}
