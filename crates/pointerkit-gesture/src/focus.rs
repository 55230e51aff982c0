#![forbid(unsafe_code)]

//! Focus enter/leave notifications for one element.
//!
//! The blur listener only exists while the element holds focus, so each
//! `on_focus_leave` pairs with exactly one preceding `on_focus_enter`.

use std::rc::Rc;

use pointerkit_backend::{ListenOptions, SharedHost};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventTarget};

use crate::teardown::{ListenerSlot, Teardown, bind, listen_for_lifetime};
use crate::{Callback, emit};

/// Snapshot handed to focus callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusInfo {
    pub target: ElementId,
}

/// Callbacks for [`handle_focus`].
#[derive(Clone, Default)]
pub struct FocusParams {
    pub on_focus_enter: Option<Callback<FocusInfo>>,
    pub on_focus_leave: Option<Callback<FocusInfo>>,
}

impl core::fmt::Debug for FocusParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FocusParams")
            .field("has_callbacks", &self.has_callbacks())
            .finish()
    }
}

impl FocusParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    callback_setters!(FocusInfo; on_focus_enter, on_focus_leave);

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.on_focus_enter.is_some() || self.on_focus_leave.is_some()
    }
}

struct Focus {
    host: SharedHost,
    element: ElementId,
    params: FocusParams,
    blur: ListenerSlot,
}

fn on_focus(focus: &Rc<Focus>, _event: &DeviceEvent) {
    focus.blur.attach(
        &*focus.host,
        EventTarget::Element(focus.element),
        EventKind::Blur,
        ListenOptions::PASSIVE,
        bind(focus, on_blur),
    );
    #[cfg(feature = "tracing")]
    tracing::trace!(message = "focus.enter", element = focus.element.0);
    emit(
        &focus.params.on_focus_enter,
        &FocusInfo {
            target: focus.element,
        },
    );
}

fn on_blur(focus: &Rc<Focus>, _event: &DeviceEvent) {
    focus.blur.detach_in_handler(&*focus.host);
    #[cfg(feature = "tracing")]
    tracing::trace!(message = "focus.leave", element = focus.element.0);
    emit(
        &focus.params.on_focus_leave,
        &FocusInfo {
            target: focus.element,
        },
    );
}

/// Report focus entering and leaving `element`.
pub fn handle_focus(host: &SharedHost, element: ElementId, params: FocusParams) -> Teardown {
    let focus = Rc::new(Focus {
        host: SharedHost::clone(host),
        element,
        params,
        blur: ListenerSlot::default(),
    });
    let teardown = Teardown::new();
    listen_for_lifetime(
        host,
        &teardown,
        element,
        EventKind::Focus,
        ListenOptions::PASSIVE,
        &focus,
        on_focus,
    );
    teardown.push(move || focus.blur.detach(&*focus.host));
    teardown
}
