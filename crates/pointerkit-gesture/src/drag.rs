#![forbid(unsafe_code)]

//! Drag recognizer.
//!
//! A pointer-down arms a per-frame loop. The drag is recognized on the first
//! frame where the pointer is farther than
//! [`distance_threshold`](DragConfig::distance_threshold) from the start
//! position; from then on every frame eases the reported position toward the
//! pointer and fires `on_drag`.
//!
//! ```text
//!   Idle ──down(button in mask)──▶ Down ──frame, distance > threshold──▶ Dragging
//!    ▲                              │                                    │
//!    └────────────up────────────────┴──────────────up (on_drag_stop)─────┘
//! ```
//!
//! # Invariants
//!
//! 1. [`DragInfo::direction`] is classified once, at the frame the drag is
//!    recognized, and never recomputed for that drag.
//! 2. A drag released before crossing the threshold fires no drag callback.
//! 3. Mouse and touch are exclusive per gesture: a down from one family is
//!    ignored while the other is tracking.
//! 4. The button mask is checked on down only.
//! 5. Frame `delta_time` comes from consecutive frame timestamps; the first
//!    frame of a drag uses `1/60`.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use pointerkit_backend::{FrameScheduler, ListenOptions, SharedHost};
use pointerkit_core::{
    ButtonMask, DeviceEvent, Direction, ElementId, EventKind, EventTarget, Modifiers, Point,
};

use crate::teardown::{ListenerSlot, Teardown, bind, listen_for_lifetime};
use crate::{Callback, FIRST_FRAME_DELTA_TIME, emit};

/// Drag options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DragConfig {
    /// Distance in pixels the pointer must exceed before a drag is recognized.
    pub distance_threshold: f64,
    /// While the pointer is back within the threshold, ease toward the start
    /// position instead of the pointer.
    pub snap_to_start: bool,
    /// Call `prevent_default` on move events while dragging.
    pub prevent_default: bool,
    /// Buttons allowed to start a drag. Touch counts as [`ButtonMask::MAIN`].
    pub buttons: ButtonMask,
    /// Fraction of the remaining distance covered per frame, in `(0, 1]`.
    pub ease_factor: f64,
    /// Ticker order; `None` uses the default animation frame.
    pub tick_order: Option<i32>,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 10.0,
            snap_to_start: true,
            prevent_default: false,
            buttons: ButtonMask::MAIN,
            ease_factor: 1.0,
            tick_order: None,
        }
    }
}

impl DragConfig {
    #[must_use]
    pub fn with_distance_threshold(mut self, threshold: f64) -> Self {
        self.distance_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_snap_to_start(mut self, snap: bool) -> Self {
        self.snap_to_start = snap;
        self
    }

    #[must_use]
    pub fn with_prevent_default(mut self, prevent: bool) -> Self {
        self.prevent_default = prevent;
        self
    }

    #[must_use]
    pub fn with_buttons(mut self, buttons: ButtonMask) -> Self {
        self.buttons = buttons;
        self
    }

    #[must_use]
    pub fn with_ease_factor(mut self, factor: f64) -> Self {
        self.ease_factor = factor;
        self
    }

    #[must_use]
    pub fn with_tick_order(mut self, order: i32) -> Self {
        self.tick_order = Some(order);
        self
    }

    /// Ease factor clamped into `(0, 1]`; unusable values mean no easing.
    #[must_use]
    pub fn effective_ease_factor(&self) -> f64 {
        if self.ease_factor.is_finite() && self.ease_factor > 0.0 {
            self.ease_factor.min(1.0)
        } else {
            1.0
        }
    }
}

/// Recognizer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    /// Pointer is down, threshold not yet crossed.
    Down,
    Dragging,
}

/// Snapshot handed to drag callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct DragInfo {
    pub direction: Direction,
    pub start_position: Point,
    pub position: Point,
    pub position_old: Point,
    /// `position - start_position`.
    pub movement: Point,
    /// `position - position_old`.
    pub delta: Point,
    /// Seconds since the previous frame.
    pub delta_time: f64,
    pub modifiers: Modifiers,
    /// Native button that started the drag (`0` for touch).
    pub button: i16,
}

impl Default for DragInfo {
    fn default() -> Self {
        Self {
            direction: Direction::Horizontal,
            start_position: Point::ZERO,
            position: Point::ZERO,
            position_old: Point::ZERO,
            movement: Point::ZERO,
            delta: Point::ZERO,
            delta_time: FIRST_FRAME_DELTA_TIME,
            modifiers: Modifiers::NONE,
            button: 0,
        }
    }
}

/// Options and callbacks for [`handle_drag`].
#[derive(Clone, Default)]
pub struct DragParams {
    pub config: DragConfig,
    pub on_drag_start: Option<Callback<DragInfo>>,
    pub on_drag: Option<Callback<DragInfo>>,
    pub on_drag_stop: Option<Callback<DragInfo>>,
    pub on_horizontal_drag_start: Option<Callback<DragInfo>>,
    pub on_horizontal_drag: Option<Callback<DragInfo>>,
    pub on_horizontal_drag_stop: Option<Callback<DragInfo>>,
    pub on_vertical_drag_start: Option<Callback<DragInfo>>,
    pub on_vertical_drag: Option<Callback<DragInfo>>,
    pub on_vertical_drag_stop: Option<Callback<DragInfo>>,
}

impl core::fmt::Debug for DragParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragParams")
            .field("config", &self.config)
            .field("has_callbacks", &self.has_callbacks())
            .finish()
    }
}

impl DragParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: DragConfig) -> Self {
        self.config = config;
        self
    }

    callback_setters!(DragInfo;
        on_drag_start,
        on_drag,
        on_drag_stop,
        on_horizontal_drag_start,
        on_horizontal_drag,
        on_horizontal_drag_stop,
        on_vertical_drag_start,
        on_vertical_drag,
        on_vertical_drag_stop,
    );

    /// Whether any callback is set.
    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        [
            &self.on_drag_start,
            &self.on_drag,
            &self.on_drag_stop,
            &self.on_horizontal_drag_start,
            &self.on_horizontal_drag,
            &self.on_horizontal_drag_stop,
            &self.on_vertical_drag_start,
            &self.on_vertical_drag,
            &self.on_vertical_drag_stop,
        ]
        .iter()
        .any(|cb| cb.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Mouse,
    Touch(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notify {
    Start,
    Drag,
    Stop,
}

#[derive(Debug, Default)]
struct DragState {
    phase: DragPhase,
    source: Option<Source>,
    pointer: Point,
    long_enough: bool,
    last_frame: Option<Duration>,
    info: DragInfo,
}

struct Drag {
    host: SharedHost,
    params: DragParams,
    ease_factor: f64,
    frames: FrameScheduler,
    state: RefCell<DragState>,
    window_move: ListenerSlot,
    window_up: ListenerSlot,
}

impl Drag {
    fn notify(&self, which: Notify, info: &DragInfo) {
        let p = &self.params;
        let (any, horizontal, vertical) = match which {
            Notify::Start => (
                &p.on_drag_start,
                &p.on_horizontal_drag_start,
                &p.on_vertical_drag_start,
            ),
            Notify::Drag => (&p.on_drag, &p.on_horizontal_drag, &p.on_vertical_drag),
            Notify::Stop => (
                &p.on_drag_stop,
                &p.on_horizontal_drag_stop,
                &p.on_vertical_drag_stop,
            ),
        };
        emit(any, info);
        match info.direction {
            Direction::Horizontal => emit(horizontal, info),
            Direction::Vertical => emit(vertical, info),
        }
    }

    fn is_idle(&self) -> bool {
        self.state.borrow().phase == DragPhase::Idle
    }

    fn begin(self: &Rc<Self>, source: Source, at: Point, button: i16, modifiers: Modifiers) {
        {
            let mut s = self.state.borrow_mut();
            s.phase = DragPhase::Down;
            s.source = Some(source);
            s.pointer = at;
            s.long_enough = false;
            s.last_frame = None;
            s.info = DragInfo {
                start_position: at,
                position: at,
                position_old: at,
                modifiers,
                button,
                ..DragInfo::default()
            };
        }
        self.request_frame();
    }

    fn request_frame(self: &Rc<Self>) {
        let this = Rc::clone(self);
        self.frames.request(move |timestamp| this.frame(timestamp));
    }

    fn frame(self: &Rc<Self>, timestamp: Duration) {
        let mut pending = Vec::with_capacity(2);
        {
            let mut s = self.state.borrow_mut();
            let delta_time = match s.last_frame {
                Some(previous) => timestamp.saturating_sub(previous).as_secs_f64(),
                None => FIRST_FRAME_DELTA_TIME,
            };
            s.last_frame = Some(timestamp);
            s.info.delta_time = delta_time;
            if s.phase == DragPhase::Idle {
                return;
            }

            let offset = s.info.start_position - s.pointer;
            s.long_enough = offset.length() > self.params.config.distance_threshold;

            if s.phase == DragPhase::Down && s.long_enough {
                s.phase = DragPhase::Dragging;
                let start = s.info.start_position;
                let info = &mut s.info;
                info.direction = Direction::classify(offset.x, offset.y);
                info.delta = Point::ZERO;
                info.movement = Point::ZERO;
                info.position = start;
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    message = "drag.start",
                    direction = ?info.direction,
                    button = info.button
                );
                pending.push((Notify::Start, info.clone()));
            }

            if s.phase == DragPhase::Dragging {
                let target = if s.long_enough || !self.params.config.snap_to_start {
                    s.pointer
                } else {
                    s.info.start_position
                };
                let info = &mut s.info;
                info.position_old = info.position;
                info.position = info.position.ease_toward(target, self.ease_factor);
                info.delta = info.position - info.position_old;
                info.movement = info.position - info.start_position;
                pending.push((Notify::Drag, info.clone()));
            }
        }
        self.request_frame();
        for (which, info) in pending {
            self.notify(which, &info);
        }
    }

    fn track(&self, at: Point, event: &DeviceEvent) {
        let dragging = {
            let mut s = self.state.borrow_mut();
            s.pointer = at;
            s.info.modifiers = event.modifiers;
            s.phase == DragPhase::Dragging
        };
        if dragging && self.params.config.prevent_default {
            event.prevent_default();
        }
    }

    fn end(&self) {
        self.window_move.detach_in_handler(&*self.host);
        self.window_up.detach_in_handler(&*self.host);
        self.frames.cancel();
        let stopped = {
            let mut s = self.state.borrow_mut();
            let was_dragging = s.phase == DragPhase::Dragging;
            s.phase = DragPhase::Idle;
            s.source = None;
            was_dragging.then(|| s.info.clone())
        };
        if let Some(info) = stopped {
            #[cfg(feature = "tracing")]
            tracing::debug!(message = "drag.stop", movement = ?info.movement);
            self.notify(Notify::Stop, &info);
        }
    }

    fn tracked_touch(&self) -> Option<i64> {
        match self.state.borrow().source {
            Some(Source::Touch(id)) => Some(id),
            _ => None,
        }
    }
}

fn on_mouse_down(drag: &Rc<Drag>, event: &DeviceEvent) {
    if !drag.is_idle() || !drag.params.config.buttons.allows_code(event.button) {
        return;
    }
    drag.window_move.attach(
        &*drag.host,
        EventTarget::Window,
        EventKind::MouseMove,
        ListenOptions::ACTIVE,
        bind(drag, on_mouse_move),
    );
    drag.window_up.attach(
        &*drag.host,
        EventTarget::Window,
        EventKind::MouseUp,
        ListenOptions::PASSIVE,
        bind(drag, on_mouse_up),
    );
    drag.begin(Source::Mouse, event.client, event.button, event.modifiers);
}

fn on_mouse_move(drag: &Rc<Drag>, event: &DeviceEvent) {
    drag.track(event.client, event);
}

fn on_mouse_up(drag: &Rc<Drag>, _event: &DeviceEvent) {
    drag.end();
}

fn on_touch_start(drag: &Rc<Drag>, event: &DeviceEvent) {
    if !drag.is_idle() || !drag.params.config.buttons.contains(ButtonMask::MAIN) {
        return;
    }
    let Some(touch) = event.first_changed_touch() else {
        return;
    };
    drag.window_move.attach(
        &*drag.host,
        EventTarget::Window,
        EventKind::TouchMove,
        ListenOptions::ACTIVE,
        bind(drag, on_touch_move),
    );
    drag.window_up.attach(
        &*drag.host,
        EventTarget::Window,
        EventKind::TouchEnd,
        ListenOptions::PASSIVE,
        bind(drag, on_touch_end),
    );
    drag.begin(
        Source::Touch(touch.identifier),
        touch.client,
        0,
        event.modifiers,
    );
}

fn on_touch_move(drag: &Rc<Drag>, event: &DeviceEvent) {
    let Some(id) = drag.tracked_touch() else {
        return;
    };
    if let Some(touch) = event.changed_touches.iter().find(|t| t.identifier == id) {
        drag.track(touch.client, event);
    }
}

fn on_touch_end(drag: &Rc<Drag>, event: &DeviceEvent) {
    let Some(id) = drag.tracked_touch() else {
        return;
    };
    if event.changed_touches.iter().any(|t| t.identifier == id) {
        drag.end();
    }
}

/// Recognize drags starting on `element`.
pub fn handle_drag(host: &SharedHost, element: ElementId, params: DragParams) -> Teardown {
    let drag = Rc::new(Drag {
        host: SharedHost::clone(host),
        ease_factor: params.config.effective_ease_factor(),
        frames: FrameScheduler::new(SharedHost::clone(host), params.config.tick_order),
        params,
        state: RefCell::new(DragState::default()),
        window_move: ListenerSlot::default(),
        window_up: ListenerSlot::default(),
    });
    let teardown = Teardown::new();
    listen_for_lifetime(
        host,
        &teardown,
        element,
        EventKind::MouseDown,
        ListenOptions::ACTIVE,
        &drag,
        on_mouse_down,
    );
    listen_for_lifetime(
        host,
        &teardown,
        element,
        EventKind::TouchStart,
        ListenOptions::ACTIVE,
        &drag,
        on_touch_start,
    );
    teardown.push(move || {
        drag.frames.cancel();
        let moved = drag.window_move.detach(&*drag.host);
        let up = drag.window_up.detach(&*drag.host);
        let mut s = drag.state.borrow_mut();
        s.phase = DragPhase::Idle;
        s.source = None;
        moved.and(up)
    });
    teardown
}
