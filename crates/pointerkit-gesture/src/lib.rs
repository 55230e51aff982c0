#![forbid(unsafe_code)]

//! Pointer gesture recognizers.
//!
//! Each `handle_*` function attaches listeners for one element through a
//! [`SharedHost`](pointerkit_backend::SharedHost) and returns a [`Teardown`]
//! that detaches them again.
//!
//! | Handler | Input | Output |
//! |---------|-------|--------|
//! | [`handle_basic_pointer`] | mouse + touch | unified down/up/change/enter/leave |
//! | [`handle_drag`] | mouse/touch down + window move/up | thresholded, eased, per-frame drag |
//! | [`handle_wheel_frame`] | wheel | per-frame momentum stream |
//! | [`handle_wheel`] | wheel | per-event stream with timed end |
//! | [`handle_tap`] | pointer down/up | short, stationary taps |
//! | [`handle_press`] | mouse/touch down | per-frame press tracking |
//! | [`handle_outside`] | document pointer down | presses outside the element |
//! | [`handle_focus`] | focus/blur | focus enter/leave |
//! | [`handle_keyboard`] | keydown | filtered key bindings |
//! | [`handle_any_user_interaction`] | mouse, touch, wheel, key, resize | activity ping |
//! | [`handle_pointer`] | any of the above | combined registration |
//!
//! Callbacks run synchronously on the host's event or frame dispatch. A
//! callback may destroy its own registration.

use std::rc::Rc;

/// Builder methods storing a callback for each named field.
macro_rules! callback_setters {
    ($info:ty; $($name:ident),+ $(,)?) => {
        $(
            #[must_use]
            pub fn $name(mut self, f: impl Fn(&$info) + 'static) -> Self {
                self.$name = Some(Rc::new(f));
                self
            }
        )+
    };
}

pub mod basic;
pub mod drag;
pub mod focus;
pub mod interaction;
pub mod keyboard;
pub mod outside;
pub mod pointer;
pub mod press;
pub mod tap;
pub mod teardown;
pub mod wheel;
pub mod wheel_frame;

pub use basic::{
    BasicPointerInfo, BasicPointerParams, SINGLE_TOUCH, TOUCH_MOUSE_SUPPRESSION_WINDOW,
    TouchArbitration, handle_basic_pointer,
};
pub use drag::{DragConfig, DragInfo, DragParams, DragPhase, handle_drag};
pub use focus::{FocusInfo, FocusParams, handle_focus};
pub use interaction::{INTERACTION_KINDS, InteractionInfo, handle_any_user_interaction};
pub use keyboard::{
    KeyMatcher, KeyboardConfig, KeyboardFilter, KeyboardParams, ModifierMatcher, handle_keyboard,
};
pub use outside::{OutsideInfo, OutsideParams, handle_outside};
pub use pointer::{PointerParams, handle_pointer};
pub use press::{PressInfo, PressParams, handle_press};
pub use tap::{TapConfig, TapInfo, TapParams, handle_tap};
pub use teardown::Teardown;
pub use wheel::{WheelConfig, WheelInfo, WheelParams, handle_wheel};
pub use wheel_frame::{
    VelocityWindow, WheelFrameConfig, WheelFrameInfo, WheelFrameParams, handle_wheel_frame,
};

/// Shared gesture callback.
pub type Callback<T> = Rc<dyn Fn(&T)>;

/// Delta time reported for the first frame of a gesture, in seconds.
pub const FIRST_FRAME_DELTA_TIME: f64 = 1.0 / 60.0;

#[inline]
pub(crate) fn emit<T>(callback: &Option<Callback<T>>, info: &T) {
    if let Some(callback) = callback {
        callback(info);
    }
}
