#![forbid(unsafe_code)]

//! Press tracker: follows a mouse or touch press frame by frame until it is
//! released, wherever the pointer goes.
//!
//! The element rect is captured once on down; `pointer_is_inside` is
//! measured against that captured rect, not the live layout.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use pointerkit_backend::{FrameScheduler, ListenOptions, SharedHost, element_rect};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventTarget, Point, Rect};

use crate::teardown::{ListenerSlot, Teardown, bind, listen_for_lifetime};
use crate::{Callback, emit};

/// Snapshot handed to press callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct PressInfo {
    /// Pointer position as of the last frame.
    pub position: Point,
    /// Movement since the previous frame.
    pub delta: Point,
    pub target: ElementId,
    pub target_rect_on_down: Rect,
    /// Whether the pointer lies inside `target_rect_on_down`.
    pub pointer_is_inside: bool,
    /// Time since the press started; zero on `on_press_start`.
    pub press_duration: Duration,
}

/// Callbacks for [`handle_press`].
#[derive(Clone, Default)]
pub struct PressParams {
    pub on_press_start: Option<Callback<PressInfo>>,
    pub on_press_frame: Option<Callback<PressInfo>>,
    pub on_press_stop: Option<Callback<PressInfo>>,
}

impl core::fmt::Debug for PressParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PressParams")
            .field("has_callbacks", &self.has_callbacks())
            .finish()
    }
}

impl PressParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    callback_setters!(PressInfo;
        on_press_start,
        on_press_frame,
        on_press_stop,
    );

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.on_press_start.is_some() || self.on_press_frame.is_some() || self.on_press_stop.is_some()
    }
}

#[derive(Debug, Default)]
struct PressState {
    pressed: bool,
    /// Latest raw pointer position.
    pointer: Point,
    position: Point,
    delta: Point,
    rect: Rect,
    down_time: Duration,
    duration: Duration,
}

impl PressState {
    fn snapshot(&self, target: ElementId) -> PressInfo {
        PressInfo {
            position: self.position,
            delta: self.delta,
            target,
            target_rect_on_down: self.rect,
            pointer_is_inside: self.rect.contains(self.pointer),
            press_duration: self.duration,
        }
    }
}

struct Press {
    host: SharedHost,
    element: ElementId,
    params: PressParams,
    frames: FrameScheduler,
    state: RefCell<PressState>,
    window_move: ListenerSlot,
    window_end: ListenerSlot,
}

impl Press {
    fn request_frame(self: &Rc<Self>) {
        let this = Rc::clone(self);
        self.frames.request(move |_| this.frame());
    }

    fn frame(self: &Rc<Self>) {
        let info = {
            let mut s = self.state.borrow_mut();
            if !s.pressed {
                return;
            }
            s.delta = s.pointer - s.position;
            s.position = s.pointer;
            s.duration = self.host.now().saturating_sub(s.down_time);
            s.snapshot(self.element)
        };
        self.request_frame();
        emit(&self.params.on_press_frame, &info);
    }

    fn start(self: &Rc<Self>, position: Point, move_kind: EventKind, end_kind: EventKind) {
        let rect = match element_rect(&*self.host, self.element) {
            Ok(rect) => rect,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(message = "press.unknown_rect", error = %_err);
                Rect::default()
            }
        };
        let info = {
            let mut s = self.state.borrow_mut();
            *s = PressState {
                pressed: true,
                pointer: position,
                position,
                delta: Point::ZERO,
                rect,
                down_time: self.host.now(),
                duration: Duration::ZERO,
            };
            s.snapshot(self.element)
        };
        self.window_move.attach(
            &*self.host,
            EventTarget::Window,
            move_kind,
            ListenOptions::PASSIVE,
            bind(self, on_window_move),
        );
        self.window_end.attach(
            &*self.host,
            EventTarget::Window,
            end_kind,
            ListenOptions::PASSIVE,
            bind(self, on_window_end),
        );
        self.request_frame();
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "press.start", x = position.x, y = position.y);
        emit(&self.params.on_press_start, &info);
    }

    fn stop(&self) {
        self.window_move.detach_in_handler(&*self.host);
        self.window_end.detach_in_handler(&*self.host);
        self.frames.cancel();
        let info = {
            let mut s = self.state.borrow_mut();
            s.pressed = false;
            s.duration = self.host.now().saturating_sub(s.down_time);
            s.snapshot(self.element)
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "press.stop", duration_ms = info.press_duration.as_millis() as u64);
        emit(&self.params.on_press_stop, &info);
    }

    fn is_pressed(&self) -> bool {
        self.state.borrow().pressed
    }
}

fn on_mouse_down(press: &Rc<Press>, event: &DeviceEvent) {
    if press.is_pressed() {
        return;
    }
    press.start(event.client, EventKind::MouseMove, EventKind::MouseUp);
}

fn on_touch_start(press: &Rc<Press>, event: &DeviceEvent) {
    // Keeps the browser from synthesizing mouse events for this touch.
    event.prevent_default();
    if press.is_pressed() {
        return;
    }
    if let Some(touch) = event.first_touch() {
        press.start(touch.client, EventKind::TouchMove, EventKind::TouchEnd);
    }
}

fn on_window_move(press: &Rc<Press>, event: &DeviceEvent) {
    let position = if event.kind.is_touch() {
        match event.first_touch() {
            Some(touch) => touch.client,
            None => return,
        }
    } else {
        event.client
    };
    press.state.borrow_mut().pointer = position;
}

fn on_window_end(press: &Rc<Press>, _event: &DeviceEvent) {
    press.stop();
}

/// Track presses starting on `element`.
pub fn handle_press(host: &SharedHost, element: ElementId, params: PressParams) -> Teardown {
    let press = Rc::new(Press {
        host: SharedHost::clone(host),
        element,
        params,
        frames: FrameScheduler::new(SharedHost::clone(host), None),
        state: RefCell::new(PressState::default()),
        window_move: ListenerSlot::default(),
        window_end: ListenerSlot::default(),
    });
    let teardown = Teardown::new();
    listen_for_lifetime(
        host,
        &teardown,
        element,
        EventKind::MouseDown,
        ListenOptions::ACTIVE,
        &press,
        on_mouse_down,
    );
    listen_for_lifetime(
        host,
        &teardown,
        element,
        EventKind::TouchStart,
        ListenOptions::ACTIVE,
        &press,
        on_touch_start,
    );
    teardown.push(move || {
        press.frames.cancel();
        press.state.borrow_mut().pressed = false;
        let moved = press.window_move.detach(&*press.host);
        let ended = press.window_end.detach(&*press.host);
        moved.and(ended)
    });
    teardown
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointerkit_core::Touch;
    use pointerkit_web::DeterministicHost;
    use pretty_assertions::assert_eq;

    const FRAME: Duration = Duration::from_millis(16);

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Start(PressInfo),
        Frame(PressInfo),
        Stop(PressInfo),
    }

    struct Fixture {
        web: Rc<DeterministicHost>,
        el: ElementId,
        log: Rc<RefCell<Vec<Seen>>>,
        teardown: Teardown,
    }

    fn fixture() -> Fixture {
        let web = Rc::new(DeterministicHost::new());
        let host: SharedHost = web.clone();
        let el = web.add_element(None, Rect::new(0.0, 0.0, 100.0, 100.0));
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let teardown = handle_press(
            &host,
            el,
            PressParams::new()
                .on_press_start(move |i| l1.borrow_mut().push(Seen::Start(i.clone())))
                .on_press_frame(move |i| l2.borrow_mut().push(Seen::Frame(i.clone())))
                .on_press_stop(move |i| l3.borrow_mut().push(Seen::Stop(i.clone()))),
        );
        Fixture {
            web,
            el,
            log,
            teardown,
        }
    }

    #[test]
    fn mouse_press_reports_frames_until_release() {
        let f = fixture();
        f.web
            .dispatch(DeviceEvent::mouse(EventKind::MouseDown, f.el, 10.0, 10.0));
        f.web.tick_frame(FRAME);
        f.web.dispatch(DeviceEvent::mouse(
            EventKind::MouseMove,
            EventTarget::Document,
            150.0,
            40.0,
        ));
        f.web.tick_frame(FRAME);
        f.web.dispatch(DeviceEvent::mouse(
            EventKind::MouseUp,
            EventTarget::Document,
            150.0,
            40.0,
        ));
        f.web.tick_frame(FRAME);

        let log = f.log.borrow();
        assert_eq!(log.len(), 4);
        let Seen::Start(start) = &log[0] else {
            panic!("expected start, got {:?}", log[0]);
        };
        assert_eq!(start.position, Point::new(10.0, 10.0));
        assert_eq!(start.target_rect_on_down, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(start.pointer_is_inside);
        assert_eq!(start.press_duration, Duration::ZERO);

        let Seen::Frame(moved) = &log[2] else {
            panic!("expected frame, got {:?}", log[2]);
        };
        assert_eq!(moved.delta, Point::new(140.0, 30.0));
        assert!(!moved.pointer_is_inside);

        let Seen::Stop(stop) = &log[3] else {
            panic!("expected stop, got {:?}", log[3]);
        };
        assert_eq!(stop.press_duration, Duration::from_millis(32));
        assert_eq!(f.web.listener_count(), 2);
        assert_eq!(f.web.pending_frame_count(), 0);
    }

    #[test]
    fn touch_press_prevents_default_and_tracks_first_touch() {
        let f = fixture();
        let out = f.web.dispatch(DeviceEvent::touch(
            EventKind::TouchStart,
            f.el,
            vec![Touch::new(3, 20.0, 20.0)],
            vec![Touch::new(3, 20.0, 20.0)],
        ));
        assert!(out.default_prevented);
        f.web.dispatch(DeviceEvent::touch(
            EventKind::TouchMove,
            f.el,
            vec![Touch::new(3, 25.0, 30.0)],
            vec![Touch::new(3, 25.0, 30.0)],
        ));
        f.web.tick_frame(FRAME);
        f.web.dispatch(DeviceEvent::touch(
            EventKind::TouchEnd,
            f.el,
            vec![],
            vec![Touch::new(3, 25.0, 30.0)],
        ));

        let log = f.log.borrow();
        assert_eq!(log.len(), 3);
        let Seen::Frame(frame) = &log[1] else {
            panic!("expected frame, got {:?}", log[1]);
        };
        assert_eq!(frame.position, Point::new(25.0, 30.0));
        assert_eq!(frame.delta, Point::new(5.0, 10.0));
        assert!(matches!(log[2], Seen::Stop(_)));
    }

    #[test]
    fn second_down_while_pressed_is_ignored() {
        let f = fixture();
        f.web
            .dispatch(DeviceEvent::mouse(EventKind::MouseDown, f.el, 10.0, 10.0));
        f.web
            .dispatch(DeviceEvent::mouse(EventKind::MouseDown, f.el, 50.0, 50.0));
        let starts = f
            .log
            .borrow()
            .iter()
            .filter(|s| matches!(s, Seen::Start(_)))
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn teardown_mid_press_stops_frames_silently() {
        let f = fixture();
        f.web
            .dispatch(DeviceEvent::mouse(EventKind::MouseDown, f.el, 10.0, 10.0));
        assert_eq!(f.web.listener_count(), 4);
        f.teardown.destroy().unwrap();
        assert_eq!(f.web.listener_count(), 0);
        assert_eq!(f.web.pending_frame_count(), 0);
        f.web.tick_frame(FRAME);
        assert_eq!(f.log.borrow().len(), 1);
    }
}
