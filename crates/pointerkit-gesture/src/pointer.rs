#![forbid(unsafe_code)]

//! One-call registration of every handler a parameter set asks for.

use pointerkit_backend::SharedHost;
use pointerkit_core::ElementId;

use crate::basic::{BasicPointerParams, handle_basic_pointer};
use crate::drag::{DragParams, handle_drag};
use crate::focus::{FocusParams, handle_focus};
use crate::outside::{OutsideParams, handle_outside};
use crate::press::{PressParams, handle_press};
use crate::tap::{TapParams, handle_tap};
use crate::teardown::Teardown;
use crate::wheel::{WheelParams, handle_wheel};
use crate::wheel_frame::{WheelFrameParams, handle_wheel_frame};

/// Parameters for every handler. A handler is registered only when its
/// params carry at least one callback.
#[derive(Debug, Clone, Default)]
pub struct PointerParams {
    pub basic: BasicPointerParams,
    pub drag: DragParams,
    pub focus: FocusParams,
    pub press: PressParams,
    pub tap: TapParams,
    pub wheel: WheelParams,
    pub wheel_frame: WheelFrameParams,
    pub outside: OutsideParams,
}

impl PointerParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn basic(mut self, params: BasicPointerParams) -> Self {
        self.basic = params;
        self
    }

    #[must_use]
    pub fn drag(mut self, params: DragParams) -> Self {
        self.drag = params;
        self
    }

    #[must_use]
    pub fn focus(mut self, params: FocusParams) -> Self {
        self.focus = params;
        self
    }

    #[must_use]
    pub fn press(mut self, params: PressParams) -> Self {
        self.press = params;
        self
    }

    #[must_use]
    pub fn tap(mut self, params: TapParams) -> Self {
        self.tap = params;
        self
    }

    #[must_use]
    pub fn wheel(mut self, params: WheelParams) -> Self {
        self.wheel = params;
        self
    }

    #[must_use]
    pub fn wheel_frame(mut self, params: WheelFrameParams) -> Self {
        self.wheel_frame = params;
        self
    }

    #[must_use]
    pub fn outside(mut self, params: OutsideParams) -> Self {
        self.outside = params;
        self
    }

    /// Whether any handler would be registered.
    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.basic.has_callbacks()
            || self.drag.has_callbacks()
            || self.focus.has_callbacks()
            || self.press.has_callbacks()
            || self.tap.has_callbacks()
            || self.wheel.has_callbacks()
            || self.wheel_frame.has_callbacks()
            || self.outside.has_callbacks()
    }
}

fn register(host: &SharedHost, element: ElementId, params: &PointerParams) -> Teardown {
    let teardown = Teardown::new();
    if params.basic.has_callbacks() {
        teardown.join(handle_basic_pointer(host, element, params.basic.clone()));
    }
    if params.drag.has_callbacks() {
        teardown.join(handle_drag(host, element, params.drag.clone()));
    }
    if params.focus.has_callbacks() {
        teardown.join(handle_focus(host, element, params.focus.clone()));
    }
    if params.press.has_callbacks() {
        teardown.join(handle_press(host, element, params.press.clone()));
    }
    if params.tap.has_callbacks() {
        teardown.join(handle_tap(host, element, params.tap.clone()));
    }
    if params.wheel.has_callbacks() {
        teardown.join(handle_wheel(host, element, params.wheel.clone()));
    }
    if params.wheel_frame.has_callbacks() {
        teardown.join(handle_wheel_frame(host, element, params.wheel_frame.clone()));
    }
    if params.outside.has_callbacks() {
        teardown.join(handle_outside(host, element, params.outside.clone()));
    }
    teardown
}

/// Register the requested handlers on every target; one teardown releases
/// them all.
pub fn handle_pointer(
    host: &SharedHost,
    targets: impl IntoIterator<Item = ElementId>,
    params: &PointerParams,
) -> Teardown {
    let teardown: Teardown = targets
        .into_iter()
        .map(|element| register(host, element, params))
        .collect();
    #[cfg(feature = "tracing")]
    tracing::debug!(message = "pointer.register", teardown = ?teardown);
    teardown
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;

    use pointerkit_core::{DeviceEvent, EventKind, EventTarget, Rect};
    use pointerkit_web::DeterministicHost;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_params_register_nothing() {
        let web = Rc::new(DeterministicHost::new());
        let host: SharedHost = web.clone();
        let el = web.add_element(None, Rect::new(0.0, 0.0, 10.0, 10.0));
        let params = PointerParams::new();
        assert!(!params.has_callbacks());
        let teardown = handle_pointer(&host, [el], &params);
        assert_eq!(web.listener_count(), 0);
        teardown.destroy().unwrap();
    }

    #[test]
    fn registers_requested_handlers_per_target() {
        let web = Rc::new(DeterministicHost::new());
        let host: SharedHost = web.clone();
        let a = web.add_element(None, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = web.add_element(None, Rect::new(20.0, 0.0, 10.0, 10.0));
        let taps = Rc::new(Cell::new(0));
        let t2 = taps.clone();
        let params = PointerParams::new()
            .tap(TapParams::new().on_tap(move |_| t2.set(t2.get() + 1)))
            .focus(FocusParams::new().on_focus_enter(|_| {}));
        let teardown = handle_pointer(&host, [a, b], &params);

        // pointerdown + focus per target
        assert_eq!(web.listener_count(), 4);
        assert_eq!(web.listener_count_for(EventTarget::Element(a), EventKind::PointerDown), 1);
        assert_eq!(web.listener_count_for(EventTarget::Element(b), EventKind::Focus), 1);

        for el in [a, b] {
            web.dispatch(DeviceEvent::mouse(EventKind::PointerDown, el, 25.0, 5.0));
            web.dispatch(DeviceEvent::mouse(EventKind::PointerUp, el, 25.0, 5.0));
        }
        assert_eq!(taps.get(), 2);

        teardown.destroy().unwrap();
        assert_eq!(web.listener_count(), 0);
    }
}
