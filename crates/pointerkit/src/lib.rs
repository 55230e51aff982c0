#![forbid(unsafe_code)]

//! pointerkit public facade crate.
//!
//! Re-exports the value types, host traits, recognizers and the deterministic
//! host under one roof, plus a prelude for day-to-day use.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use pointerkit_core::{
    ButtonMask, DeltaMode, DeviceEvent, Direction, ElementId, EventKind, EventPhase, EventTarget,
    Modifiers, Point, Point3, PointerButton, PointerError, Rect, Touch, WheelDelta,
};

// --- Backend re-exports ----------------------------------------------------

pub use pointerkit_backend::{
    AnimationFrames, Clock, ElementTree, EventSource, FrameHandle, FrameScheduler, Host,
    ListenOptions, ListenerId, SharedHost, Ticker, TimerHandle, Timers, WallClock,
};

// --- Gesture re-exports ----------------------------------------------------

pub use pointerkit_gesture::{
    BasicPointerInfo, BasicPointerParams, Callback, DragConfig, DragInfo, DragParams, FocusInfo,
    FocusParams, InteractionInfo, KeyMatcher, KeyboardConfig, KeyboardFilter, KeyboardParams,
    ModifierMatcher, OutsideInfo, OutsideParams, PointerParams, PressInfo, PressParams, TapConfig,
    TapInfo, TapParams, Teardown, WheelConfig, WheelFrameConfig, WheelFrameInfo, WheelFrameParams,
    WheelInfo, WheelParams, handle_any_user_interaction, handle_basic_pointer, handle_drag,
    handle_focus, handle_keyboard, handle_outside, handle_pointer, handle_press, handle_tap,
    handle_wheel, handle_wheel_frame,
};

// --- Web re-exports --------------------------------------------------------

pub use pointerkit_web::{DeterministicHost, DispatchOutcome};

#[cfg(feature = "input-parser")]
pub use pointerkit_web::input_parser::{InputParseError, parse_device_event, replay_jsonl};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for pointerkit consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Contract violation reported by a recognizer or host.
    Pointer(PointerError),
    /// Malformed encoded input.
    #[cfg(feature = "input-parser")]
    Input(InputParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer(err) => write!(f, "{err}"),
            #[cfg(feature = "input-parser")]
            Self::Input(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pointer(err) => Some(err),
            #[cfg(feature = "input-parser")]
            Self::Input(err) => Some(err),
        }
    }
}

impl From<PointerError> for Error {
    fn from(err: PointerError) -> Self {
        Self::Pointer(err)
    }
}

#[cfg(feature = "input-parser")]
impl From<InputParseError> for Error {
    fn from(err: InputParseError) -> Self {
        Self::Input(err)
    }
}

/// Standard result type for pointerkit APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience prelude for pointerkit users.
pub mod prelude {
    pub use crate::{
        DeterministicHost, DeviceEvent, Direction, ElementId, Error, EventKind, EventPhase,
        EventTarget, Point, PointerParams, Rect, Result, SharedHost, Teardown, handle_pointer,
    };

    pub use crate::{
        BasicPointerParams, DragParams, FocusParams, KeyboardFilter, KeyboardParams, Modifiers,
        OutsideParams, PressParams, TapParams, WheelFrameParams, WheelParams,
        handle_any_user_interaction, handle_keyboard,
    };

    pub use crate::{backend, core, gesture, web};
}

pub use pointerkit_backend as backend;
pub use pointerkit_core as core;
pub use pointerkit_gesture as gesture;
pub use pointerkit_web as web;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn drag_distance(host: &Rc<DeterministicHost>) -> Result<f64> {
        let shared: SharedHost = host.clone();
        let el = host.add_element(None, Rect::new(0.0, 0.0, 100.0, 100.0));
        let moved = Rc::new(Cell::new(0.0));
        let m2 = moved.clone();
        let teardown = handle_pointer(
            &shared,
            [el],
            &PointerParams::new().drag(DragParams::new().on_drag_stop(move |i| m2.set(i.movement.length()))),
        );
        host.dispatch(DeviceEvent::mouse(EventKind::MouseDown, el, 10.0, 10.0));
        host.dispatch(DeviceEvent::mouse(EventKind::MouseMove, EventTarget::Window, 40.0, 50.0));
        host.tick_frame(Duration::from_millis(16));
        host.dispatch(DeviceEvent::mouse(EventKind::MouseUp, EventTarget::Window, 40.0, 50.0));
        teardown.destroy()?;
        Ok(moved.get())
    }

    #[test]
    fn prelude_drives_a_drag() {
        let host = Rc::new(DeterministicHost::new());
        assert_eq!(drag_distance(&host), Ok(50.0));
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn prelude_binds_a_shortcut() {
        let host = Rc::new(DeterministicHost::new());
        let shared: SharedHost = host.clone();
        let saved = Rc::new(Cell::new(0));
        let s2 = saved.clone();
        let filter = KeyboardFilter::key("s")
            .with_modifier_combination("ctrl")
            .map_err(Error::from);
        assert!(filter.is_ok());
        let teardown = handle_keyboard(
            &shared,
            EventTarget::Document,
            KeyboardParams::new().bind(filter.unwrap(), move |_| s2.set(s2.get() + 1)),
        );
        let key = |mods: Modifiers| {
            DeviceEvent::key(EventKind::KeyDown, EventTarget::Document, "S", "KeyS")
                .with_modifiers(mods)
        };
        host.dispatch(key(Modifiers::CTRL));
        host.dispatch(key(Modifiers::CTRL | Modifiers::ALT));
        assert_eq!(saved.get(), 1);
        assert_eq!(teardown.destroy(), Ok(()));
    }

    #[test]
    fn pointer_errors_convert() {
        let err: Error = crate::PointerError::NoEventObserved.into();
        assert!(matches!(err, Error::Pointer(_)));
        assert_eq!(err.to_string(), crate::PointerError::NoEventObserved.to_string());
        assert!(std::error::Error::source(&err).is_some());
    }
}
