#![forbid(unsafe_code)]

//! Basic pointer unifier: one de-duplicated pointer stream from mouse and
//! touch input.
//!
//! Browsers fire synthetic mouse events after a touch interaction. The
//! unifier listens to both families on one element and suppresses mouse
//! events while a touch is active or for [`TOUCH_MOUSE_SUPPRESSION_WINDOW`]
//! after the last touch activity. This is a best-effort heuristic, not a
//! guarantee: it exists so that a page can be driven by touch and mouse
//! alternately without double `down` / `up` notifications.
//!
//! # Invariants
//!
//! 1. `on_change` fires only when the position differs from the last recorded
//!    one (strict inequality on `x` or `y`).
//! 2. `on_down` / `on_up` are preceded by the `on_change` for their position.
//! 3. `on_enter` fires once per hover session; `on_leave` never fires while
//!    `pressed`.
//! 4. Touch events with more than [`SINGLE_TOUCH`] active touches are
//!    ignored.
//!
//! # Failure Modes
//!
//! - [`BasicPointerInfo::target_element`] before any event →
//!   [`PointerError::NoEventObserved`].

use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::rc::Rc;

use pointerkit_backend::{ElementTree, ListenOptions, SharedHost, element_rect};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventTarget, Point, PointerError};

use crate::teardown::{ListenerSlot, Teardown, bind, listen_for_lifetime};
use crate::{Callback, emit};

/// Mouse events are ignored for this long after the last touch activity.
pub const TOUCH_MOUSE_SUPPRESSION_WINDOW: Duration = Duration::from_millis(1000);

/// Touch events are processed only with exactly this many active touches.
pub const SINGLE_TOUCH: usize = 1;

/// Snapshot of the unified pointer, handed to every basic callback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicPointerInfo {
    pub entered: bool,
    pub pressed: bool,
    /// Last recorded position; `None` before the first event and after `up`.
    pub position: Option<Point>,
    pub down_position: Point,
    pub up_position: Point,
    /// Last processed event.
    pub event: Option<DeviceEvent>,
}

impl BasicPointerInfo {
    fn last_event(&self) -> Result<&DeviceEvent, PointerError> {
        self.event.as_ref().ok_or(PointerError::NoEventObserved)
    }

    /// Element the last event was dispatched to.
    pub fn target_element(&self) -> Result<ElementId, PointerError> {
        let target = self.last_event()?.target;
        target.element().ok_or(PointerError::NotAnElement(target))
    }

    /// Native button of the last event; touch events report `0`.
    #[must_use]
    pub fn button(&self) -> i16 {
        match &self.event {
            Some(event) if event.kind.is_mouse() || event.kind.is_pointer() => event.button,
            _ => 0,
        }
    }

    /// Position relative to the last event's target element.
    ///
    /// After `up` the up position is used.
    pub fn local_position(&self, tree: &dyn ElementTree) -> Result<Point, PointerError> {
        let rect = element_rect(tree, self.target_element()?)?;
        Ok(rect.to_local(self.position.unwrap_or(self.up_position)))
    }
}

/// Mouse/touch arbitration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchArbitration {
    touch_active: bool,
    last_touch: Option<Duration>,
}

impl TouchArbitration {
    /// Whether mouse input must currently be treated as touch-synthesized.
    #[must_use]
    pub fn is_touch(&self, now: Duration) -> bool {
        self.touch_active
            || self
                .last_touch
                .is_some_and(|last| now.saturating_sub(last) < TOUCH_MOUSE_SUPPRESSION_WINDOW)
    }

    pub fn touch_started(&mut self, now: Duration) {
        self.touch_active = true;
        self.last_touch = Some(now);
    }

    pub fn touch_moved(&mut self, now: Duration) {
        self.last_touch = Some(now);
    }

    pub fn touch_ended(&mut self, now: Duration) {
        self.touch_active = false;
        self.last_touch = Some(now);
    }
}

/// Callbacks for [`handle_basic_pointer`].
#[derive(Clone, Default)]
pub struct BasicPointerParams {
    pub on_down: Option<Callback<BasicPointerInfo>>,
    pub on_up: Option<Callback<BasicPointerInfo>>,
    pub on_change: Option<Callback<BasicPointerInfo>>,
    pub on_enter: Option<Callback<BasicPointerInfo>>,
    pub on_leave: Option<Callback<BasicPointerInfo>>,
}

impl core::fmt::Debug for BasicPointerParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BasicPointerParams")
            .field("on_down", &self.on_down.is_some())
            .field("on_up", &self.on_up.is_some())
            .field("on_change", &self.on_change.is_some())
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .finish()
    }
}

impl BasicPointerParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_down(mut self, f: impl Fn(&BasicPointerInfo) + 'static) -> Self {
        self.on_down = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_up(mut self, f: impl Fn(&BasicPointerInfo) + 'static) -> Self {
        self.on_up = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_change(mut self, f: impl Fn(&BasicPointerInfo) + 'static) -> Self {
        self.on_change = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_enter(mut self, f: impl Fn(&BasicPointerInfo) + 'static) -> Self {
        self.on_enter = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_leave(mut self, f: impl Fn(&BasicPointerInfo) + 'static) -> Self {
        self.on_leave = Some(Rc::new(f));
        self
    }

    /// Whether any callback is set.
    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.on_down.is_some()
            || self.on_up.is_some()
            || self.on_change.is_some()
            || self.on_enter.is_some()
            || self.on_leave.is_some()
    }
}

struct BasicPointer {
    host: SharedHost,
    params: BasicPointerParams,
    info: RefCell<BasicPointerInfo>,
    arbitration: Cell<TouchArbitration>,
    /// Between `mouseover` and `mouseout`.
    inside: Cell<bool>,
    document_up: ListenerSlot,
}

impl BasicPointer {
    fn is_touch(&self) -> bool {
        self.arbitration.get().is_touch(self.host.now())
    }

    fn arbitrate(&self, update: impl FnOnce(&mut TouchArbitration, Duration)) {
        let mut arbitration = self.arbitration.get();
        update(&mut arbitration, self.host.now());
        self.arbitration.set(arbitration);
    }

    fn snapshot(&self) -> BasicPointerInfo {
        self.info.borrow().clone()
    }

    /// Record the event and notify `on_change` if the position moved.
    fn update(&self, event: &DeviceEvent, position: Point) {
        let changed = {
            let mut info = self.info.borrow_mut();
            info.event = Some(event.clone());
            if info.position == Some(position) {
                None
            } else {
                info.position = Some(position);
                Some(info.clone())
            }
        };
        if let Some(info) = changed {
            emit(&self.params.on_change, &info);
        }
    }

    fn update_down(&self, event: &DeviceEvent, position: Point) {
        {
            let mut info = self.info.borrow_mut();
            info.pressed = true;
            info.down_position = position;
        }
        self.update(event, position);
        emit(&self.params.on_down, &self.snapshot());
    }

    fn update_up(&self, event: &DeviceEvent, position: Point) {
        {
            let mut info = self.info.borrow_mut();
            info.pressed = false;
            info.up_position = position;
        }
        self.update(event, position);
        emit(&self.params.on_up, &self.snapshot());
        self.info.borrow_mut().position = None;
    }

    fn check_for_enter(&self) {
        let entered = {
            let mut info = self.info.borrow_mut();
            if info.entered {
                return;
            }
            info.entered = true;
            info.clone()
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "basic.enter");
        emit(&self.params.on_enter, &entered);
    }

    fn check_for_leave(&self) {
        let left = {
            let mut info = self.info.borrow_mut();
            if !info.entered || info.pressed {
                return;
            }
            info.entered = false;
            info.clone()
        };
        self.document_up.detach_in_handler(&*self.host);
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "basic.leave");
        emit(&self.params.on_leave, &left);
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn suppressed(&self, event: &DeviceEvent) -> bool {
        let suppressed = self.is_touch();
        #[cfg(feature = "tracing")]
        if suppressed {
            tracing::trace!(message = "basic.suppressed_mouse", kind = event.kind.name());
        }
        suppressed
    }
}

fn on_mouse_down(state: &Rc<BasicPointer>, event: &DeviceEvent) {
    if !state.suppressed(event) {
        state.update_down(event, event.client);
    }
}

fn on_mouse_up(state: &Rc<BasicPointer>, event: &DeviceEvent) {
    if !state.suppressed(event) {
        state.update_up(event, event.client);
    }
}

fn on_mouse_move(state: &Rc<BasicPointer>, event: &DeviceEvent) {
    if !state.suppressed(event) {
        state.update(event, event.client);
    }
}

fn on_mouse_over(state: &Rc<BasicPointer>, _event: &DeviceEvent) {
    state.inside.set(true);
    if !state.document_up.is_attached() {
        state.document_up.attach(
            &*state.host,
            EventTarget::Document,
            EventKind::MouseUp,
            ListenOptions::PASSIVE,
            bind(state, on_document_mouse_up),
        );
    }
    state.check_for_enter();
}

fn on_mouse_out(state: &Rc<BasicPointer>, _event: &DeviceEvent) {
    state.inside.set(false);
    state.check_for_leave();
}

/// A release anywhere ends the press; released outside, the hover ends too.
fn on_document_mouse_up(state: &Rc<BasicPointer>, _event: &DeviceEvent) {
    state.info.borrow_mut().pressed = false;
    if !state.inside.get() {
        state.check_for_leave();
    }
}

fn on_touch_start(state: &Rc<BasicPointer>, event: &DeviceEvent) {
    if event.touches.len() != SINGLE_TOUCH {
        return;
    }
    state.arbitrate(TouchArbitration::touch_started);
    if let Some(touch) = event.first_touch() {
        state.update_down(event, touch.client);
    }
}

fn on_touch_move(state: &Rc<BasicPointer>, event: &DeviceEvent) {
    if event.touches.len() != SINGLE_TOUCH {
        return;
    }
    state.arbitrate(TouchArbitration::touch_moved);
    if let Some(touch) = event.first_touch() {
        state.update(event, touch.client);
    }
}

fn on_touch_end(state: &Rc<BasicPointer>, event: &DeviceEvent) {
    if !event.touches.is_empty() {
        return;
    }
    state.arbitrate(TouchArbitration::touch_ended);
    if let Some(touch) = event.first_changed_touch() {
        state.update_up(event, touch.client);
    }
}

/// Unify mouse and touch input on `element`.
pub fn handle_basic_pointer(
    host: &SharedHost,
    element: ElementId,
    params: BasicPointerParams,
) -> Teardown {
    let state = Rc::new(BasicPointer {
        host: SharedHost::clone(host),
        params,
        info: RefCell::new(BasicPointerInfo::default()),
        arbitration: Cell::new(TouchArbitration::default()),
        inside: Cell::new(false),
        document_up: ListenerSlot::default(),
    });
    let teardown = Teardown::new();
    let handlers: [(EventKind, ListenOptions, fn(&Rc<BasicPointer>, &DeviceEvent)); 8] = [
        (EventKind::MouseOver, ListenOptions::PASSIVE, on_mouse_over),
        (EventKind::MouseOut, ListenOptions::PASSIVE, on_mouse_out),
        (EventKind::MouseDown, ListenOptions::PASSIVE, on_mouse_down),
        (EventKind::MouseUp, ListenOptions::PASSIVE, on_mouse_up),
        (EventKind::MouseMove, ListenOptions::PASSIVE, on_mouse_move),
        (EventKind::TouchStart, ListenOptions::ACTIVE, on_touch_start),
        (EventKind::TouchEnd, ListenOptions::ACTIVE, on_touch_end),
        (EventKind::TouchMove, ListenOptions::ACTIVE, on_touch_move),
    ];
    for (kind, options, handler) in handlers {
        listen_for_lifetime(host, &teardown, element, kind, options, &state, handler);
    }
    let host = SharedHost::clone(host);
    teardown.push(move || state.document_up.detach(&*host));
    teardown
}
