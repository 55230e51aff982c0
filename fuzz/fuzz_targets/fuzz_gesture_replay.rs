#![no_main]

use std::rc::Rc;
use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pointerkit_backend::SharedHost;
use pointerkit_core::{
    DeltaMode, DeviceEvent, EventKind, EventTarget, Modifiers, Point3, Rect, Touch, WheelDelta,
};
use pointerkit_gesture::{
    BasicPointerParams, DragParams, FocusParams, KeyboardConfig, KeyboardFilter, KeyboardParams,
    OutsideParams, PointerParams, PressParams, TapParams, Teardown, WheelFrameParams, WheelParams,
    handle_any_user_interaction, handle_keyboard, handle_pointer,
};
use pointerkit_web::DeterministicHost;

#[derive(Debug, Arbitrary)]
enum Target {
    Parent,
    Child,
    Sibling,
    Document,
    Window,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Mouse { kind: u8, target: Target, x: i16, y: i16, button: i8 },
    Touch { kind: u8, count: u8, changed_id: u8, x: i16, y: i16 },
    Wheel { dx: i16, dy: i16, mode: u8 },
    Focus { blur: bool, target: Target },
    Key { up: bool, target: Target, key: u8, mods: u8 },
    Resize,
    Frame { ms: u8 },
    Wait { ms: u16 },
    Teardown,
}

const MOUSE_KINDS: [EventKind; 7] = [
    EventKind::MouseDown,
    EventKind::MouseMove,
    EventKind::MouseUp,
    EventKind::MouseOver,
    EventKind::MouseOut,
    EventKind::PointerDown,
    EventKind::PointerUp,
];

const TOUCH_KINDS: [EventKind; 3] = [EventKind::TouchStart, EventKind::TouchMove, EventKind::TouchEnd];

fuzz_target!(|ops: Vec<Op>| {
    let web = Rc::new(DeterministicHost::new());
    let host: SharedHost = web.clone();
    let parent = web.add_element(None, Rect::new(0.0, 0.0, 300.0, 300.0));
    let child = web.add_element(Some(parent), Rect::new(50.0, 50.0, 100.0, 100.0));
    let sibling = web.add_element(None, Rect::new(400.0, 0.0, 100.0, 100.0));

    let params = PointerParams::new()
        .basic(BasicPointerParams::new().on_change(|_| {}).on_leave(|_| {}))
        .drag(DragParams::new().on_drag(|i| assert!(i.delta_time >= 0.0)))
        .focus(FocusParams::new().on_focus_enter(|_| {}))
        .press(PressParams::new().on_press_frame(|_| {}))
        .tap(TapParams::new().on_tap(|_| {}))
        .wheel(WheelParams::new().on_wheel(|i| {
            assert!(i.delta_time >= 1.0 / 240.0 && i.delta_time <= 1.0 / 30.0);
        }))
        .wheel_frame(WheelFrameParams::new().on_wheel_frame(|i| {
            if i.phase == pointerkit_core::EventPhase::End {
                assert_eq!(i.position, i.target);
            }
        }))
        .outside(OutsideParams::new().on_down_outside(|_| {}));
    let keyboard = KeyboardParams::new()
        .with_config(KeyboardConfig::default().with_strict_target(true))
        .bind(KeyboardFilter::key(["a", "b"]).with_no_modifiers(), |e| {
            assert!(e.modifiers.is_empty());
        })
        .bind(KeyboardFilter::code("KeyC").with_modifiers(Modifiers::CTRL), |e| {
            assert_eq!(e.modifiers, Modifiers::CTRL);
        });
    let teardown: Teardown = [
        handle_pointer(&host, [parent, child], &params),
        handle_keyboard(&host, parent, keyboard),
        handle_any_user_interaction(&host, EventTarget::Window, |_| {}),
    ]
    .into_iter()
    .collect();

    let resolve = |target: &Target| -> EventTarget {
        match target {
            Target::Parent => parent.into(),
            Target::Child => child.into(),
            Target::Sibling => sibling.into(),
            Target::Document => EventTarget::Document,
            Target::Window => EventTarget::Window,
        }
    };

    for op in ops.iter().take(512) {
        match op {
            Op::Mouse { kind, target, x, y, button } => {
                let kind = MOUSE_KINDS[usize::from(*kind) % MOUSE_KINDS.len()];
                let event = DeviceEvent::mouse(kind, resolve(target), f64::from(*x), f64::from(*y))
                    .with_button(i16::from(*button));
                web.dispatch(event);
            }
            Op::Touch { kind, count, changed_id, x, y } => {
                let kind = TOUCH_KINDS[usize::from(*kind) % TOUCH_KINDS.len()];
                let (x, y) = (f64::from(*x), f64::from(*y));
                let touches = (0..i64::from(*count % 4)).map(|id| Touch::new(id, x, y)).collect();
                let changed = vec![Touch::new(i64::from(*changed_id % 4), x, y)];
                web.dispatch(DeviceEvent::touch(kind, child, touches, changed));
            }
            Op::Wheel { dx, dy, mode } => {
                let delta = WheelDelta {
                    delta: Point3::new(f64::from(*dx), f64::from(*dy), 0.0),
                    mode: DeltaMode::from_code(u32::from(*mode % 3)),
                };
                web.dispatch(DeviceEvent::wheel(parent, delta));
            }
            Op::Focus { blur, target } => {
                let kind = if *blur { EventKind::Blur } else { EventKind::Focus };
                web.dispatch(DeviceEvent::focus(kind, resolve(target)));
            }
            Op::Key { up, target, key, mods } => {
                let kind = if *up { EventKind::KeyUp } else { EventKind::KeyDown };
                let (key, code) = [("a", "KeyA"), ("B", "KeyB"), ("c", "KeyC"), ("Enter", "Enter")]
                    [usize::from(*key) % 4];
                let event = DeviceEvent::key(kind, resolve(target), key, code)
                    .with_modifiers(Modifiers::from_bits_truncate(*mods));
                web.dispatch(event);
            }
            Op::Resize => {
                web.dispatch(DeviceEvent::resize());
            }
            Op::Frame { ms } => {
                web.tick_frame(Duration::from_millis(u64::from(*ms)));
            }
            Op::Wait { ms } => {
                web.advance(Duration::from_millis(u64::from(*ms)));
            }
            Op::Teardown => {
                assert!(teardown.destroy().is_ok());
            }
        }
    }

    assert!(teardown.destroy().is_ok());
    assert_eq!(web.listener_count(), 0, "listeners leaked");
    assert_eq!(web.pending_frame_count(), 0, "frames leaked");
    assert_eq!(web.pending_timer_count(), 0, "timers leaked");
});
