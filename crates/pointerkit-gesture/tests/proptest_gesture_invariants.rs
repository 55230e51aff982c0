//! Property-based invariants for the gesture recognizers.
//!
//! 1. **Threshold**: a drag whose pointer never leaves the threshold
//!    circle fires no drag callback.
//! 2. **Change dedupe**: `on_change` fires exactly once per distinct
//!    consecutive position.
//! 3. **Stable direction**: the direction reported by every callback of a
//!    drag equals the one reported by `on_drag_start`.
//! 4. **Teardown**: any event sequence followed by `destroy` leaves no
//!    listener, frame or timer behind, and a second `destroy` is a no-op.
//! 5. **Wheel settle**: the smoothed wheel position ends exactly on the
//!    accumulated target.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pointerkit_backend::SharedHost;
use pointerkit_core::{
    DeviceEvent, Direction, ElementId, EventKind, EventPhase, EventTarget, Point, Rect, Touch,
    WheelDelta,
};
use pointerkit_gesture::{
    BasicPointerParams, DragParams, FocusParams, OutsideParams, PointerParams, PressParams,
    TapParams, WheelFrameParams, WheelParams, handle_basic_pointer, handle_drag, handle_pointer,
    handle_wheel_frame,
};
use pointerkit_web::DeterministicHost;
use proptest::prelude::*;

const FRAME: Duration = Duration::from_millis(16);

fn setup() -> (Rc<DeterministicHost>, SharedHost, ElementId) {
    let web = Rc::new(DeterministicHost::new());
    let host: SharedHost = web.clone();
    let el = web.add_element(None, Rect::new(0.0, 0.0, 400.0, 400.0));
    (web, host, el)
}

// ── Strategies ──────────────────────────────────────────────────────────

/// Offsets strictly inside a circle of radius `r`.
fn offset_within(r: f64) -> impl Strategy<Value = (f64, f64)> {
    (-r..r, -r..r).prop_filter("inside circle", move |(x, y)| (x * x + y * y).sqrt() <= r)
}

#[derive(Debug, Clone)]
enum Step {
    Mouse(EventKind, bool, f64, f64),
    Touch(EventKind, u8, f64, f64),
    Wheel(f64),
    Focus(EventKind),
    Frame,
    Wait(u16),
}

fn step() -> impl Strategy<Value = Step> {
    let coord = 0.0..400.0f64;
    prop_oneof![
        (
            prop::sample::select(vec![
                EventKind::MouseDown,
                EventKind::MouseMove,
                EventKind::MouseUp,
                EventKind::MouseOver,
                EventKind::MouseOut,
                EventKind::PointerDown,
                EventKind::PointerUp,
            ]),
            any::<bool>(),
            coord.clone(),
            coord.clone(),
        )
            .prop_map(|(k, on_el, x, y)| Step::Mouse(k, on_el, x, y)),
        (
            prop::sample::select(vec![
                EventKind::TouchStart,
                EventKind::TouchMove,
                EventKind::TouchEnd,
            ]),
            0u8..3,
            coord.clone(),
            coord,
        )
            .prop_map(|(k, n, x, y)| Step::Touch(k, n, x, y)),
        (-50.0..50.0f64).prop_map(Step::Wheel),
        prop::sample::select(vec![EventKind::Focus, EventKind::Blur]).prop_map(Step::Focus),
        Just(Step::Frame),
        (0u16..1500).prop_map(Step::Wait),
    ]
}

fn apply(web: &DeterministicHost, el: ElementId, step: &Step) {
    match *step {
        Step::Mouse(kind, on_el, x, y) => {
            let target = if on_el {
                EventTarget::Element(el)
            } else {
                EventTarget::Document
            };
            web.dispatch(DeviceEvent::mouse(kind, target, x, y));
        }
        Step::Touch(kind, count, x, y) => {
            let touches: Vec<Touch> = (0..i64::from(count))
                .map(|id| Touch::new(id, x + id as f64, y))
                .collect();
            let changed = vec![Touch::new(0, x, y)];
            web.dispatch(DeviceEvent::touch(kind, el, touches, changed));
        }
        Step::Wheel(dy) => {
            web.dispatch(DeviceEvent::wheel(el, WheelDelta::pixels(0.0, dy)));
        }
        Step::Focus(kind) => {
            web.dispatch(DeviceEvent::focus(kind, el));
        }
        Step::Frame => {
            web.tick_frame(FRAME);
        }
        Step::Wait(ms) => {
            web.advance(Duration::from_millis(u64::from(ms)));
        }
    }
}

fn full_params() -> PointerParams {
    PointerParams::new()
        .basic(BasicPointerParams::new().on_change(|_| {}))
        .drag(DragParams::new().on_drag(|_| {}))
        .focus(FocusParams::new().on_focus_leave(|_| {}))
        .press(PressParams::new().on_press_frame(|_| {}))
        .tap(TapParams::new().on_tap(|_| {}))
        .wheel(WheelParams::new().on_wheel_end(|_| {}))
        .wheel_frame(WheelFrameParams::new().on_wheel_frame(|_| {}))
        .outside(OutsideParams::new().on_down_outside(|_| {}))
}

proptest! {
    #[test]
    fn no_drag_within_threshold(
        start in (50.0..350.0f64, 50.0..350.0f64),
        moves in prop::collection::vec(offset_within(10.0), 1..20),
    ) {
        let (web, host, el) = setup();
        let fired = Rc::new(RefCell::new(0u32));
        let (f1, f2, f3) = (fired.clone(), fired.clone(), fired.clone());
        let _teardown = handle_drag(
            &host,
            el,
            DragParams::new()
                .on_drag_start(move |_| *f1.borrow_mut() += 1)
                .on_drag(move |_| *f2.borrow_mut() += 1)
                .on_drag_stop(move |_| *f3.borrow_mut() += 1),
        );
        web.dispatch(DeviceEvent::mouse(EventKind::MouseDown, el, start.0, start.1));
        for (dx, dy) in &moves {
            web.dispatch(DeviceEvent::mouse(
                EventKind::MouseMove,
                EventTarget::Document,
                start.0 + dx,
                start.1 + dy,
            ));
            web.tick_frame(FRAME);
        }
        web.dispatch(DeviceEvent::mouse(EventKind::MouseUp, EventTarget::Document, 0.0, 0.0));
        prop_assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn change_fires_once_per_distinct_position(
        positions in prop::collection::vec((0u8..4, 0u8..4), 1..40),
    ) {
        let (web, host, el) = setup();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c2 = changes.clone();
        let _teardown = handle_basic_pointer(
            &host,
            el,
            BasicPointerParams::new().on_change(move |i| {
                if let Some(p) = i.position {
                    c2.borrow_mut().push(p);
                }
            }),
        );
        let mut expected: Vec<Point> = Vec::new();
        for (x, y) in &positions {
            let p = Point::new(f64::from(*x), f64::from(*y));
            if expected.last() != Some(&p) {
                expected.push(p);
            }
            web.dispatch(DeviceEvent::mouse(EventKind::MouseMove, el, p.x, p.y));
        }
        prop_assert_eq!(&*changes.borrow(), &expected);
    }

    #[test]
    fn direction_is_fixed_for_the_whole_drag(
        first in (-40.0..40.0f64, -40.0..40.0f64),
        rest in prop::collection::vec((-80.0..80.0f64, -80.0..80.0f64), 0..10),
    ) {
        let origin = (200.0, 200.0);
        // Same arithmetic the recognizer applies: start minus pointer.
        let offset = Point::new(origin.0, origin.1) - Point::new(origin.0 + first.0, origin.1 + first.1);
        prop_assume!(offset.length() > 10.0);
        let (web, host, el) = setup();
        let seen = Rc::new(RefCell::new(Vec::<Direction>::new()));
        let (s1, s2, s3) = (seen.clone(), seen.clone(), seen.clone());
        let _teardown = handle_drag(
            &host,
            el,
            DragParams::new()
                .on_drag_start(move |i| s1.borrow_mut().push(i.direction))
                .on_drag(move |i| s2.borrow_mut().push(i.direction))
                .on_drag_stop(move |i| s3.borrow_mut().push(i.direction)),
        );
        web.dispatch(DeviceEvent::mouse(EventKind::MouseDown, el, origin.0, origin.1));
        for (dx, dy) in std::iter::once(&first).chain(rest.iter()) {
            web.dispatch(DeviceEvent::mouse(
                EventKind::MouseMove,
                EventTarget::Document,
                origin.0 + dx,
                origin.1 + dy,
            ));
            web.tick_frame(FRAME);
        }
        web.dispatch(DeviceEvent::mouse(EventKind::MouseUp, EventTarget::Document, 0.0, 0.0));

        let seen = seen.borrow();
        prop_assert!(seen.len() >= 3);
        let expected = Direction::classify(offset.x, offset.y);
        prop_assert!(seen.iter().all(|d| *d == expected));
    }

    #[test]
    fn teardown_leaves_nothing_behind(steps in prop::collection::vec(step(), 0..60)) {
        let (web, host, el) = setup();
        let teardown = handle_pointer(&host, [el], &full_params());
        for step in &steps {
            apply(&web, el, step);
        }
        prop_assert!(teardown.destroy().is_ok());
        prop_assert_eq!(web.listener_count(), 0);
        prop_assert_eq!(web.pending_frame_count(), 0);
        prop_assert_eq!(web.pending_timer_count(), 0);
        prop_assert!(teardown.destroy().is_ok());
    }

    #[test]
    fn wheel_position_settles_on_target(
        deltas in prop::collection::vec((-200.0..200.0f64, 0u8..4), 1..12),
    ) {
        let (web, host, el) = setup();
        let ends = Rc::new(RefCell::new(Vec::new()));
        let e2 = ends.clone();
        let _teardown = handle_wheel_frame(
            &host,
            el,
            WheelFrameParams::new().on_wheel_frame(move |i| {
                if i.phase == EventPhase::End {
                    e2.borrow_mut().push((i.position, i.target));
                }
            }),
        );
        let mut total = 0.0;
        for (dy, frames) in &deltas {
            web.dispatch(DeviceEvent::wheel(el, WheelDelta::pixels(0.0, *dy)));
            total += dy;
            for _ in 0..*frames {
                web.tick_frame(FRAME);
            }
        }
        for _ in 0..12 {
            web.tick_frame(FRAME);
        }
        let ends = ends.borrow();
        let (position, target) = *ends.last().expect("session ended");
        prop_assert_eq!(position, target);
        prop_assert!((target.y - total).abs() < 1e-6);
    }
}
