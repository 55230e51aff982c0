#![forbid(unsafe_code)]

//! A single notification for any user activity, e.g. to reset an
//! inactivity timer.
//!
//! Every listener is passive; nothing here prevents a default action.

use core::time::Duration;
use std::rc::Rc;

use pointerkit_backend::{ListenOptions, SharedHost};
use pointerkit_core::{DeviceEvent, EventKind, EventTarget};

use crate::Callback;
use crate::teardown::{Teardown, listen_for_lifetime};

/// Event kinds watched on the target. `resize` is always watched on the window.
pub const INTERACTION_KINDS: [EventKind; 8] = [
    EventKind::MouseMove,
    EventKind::MouseDown,
    EventKind::MouseUp,
    EventKind::TouchStart,
    EventKind::TouchMove,
    EventKind::Wheel,
    EventKind::KeyDown,
    EventKind::KeyUp,
];

/// What triggered an interaction notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionInfo {
    pub kind: EventKind,
    pub time_stamp: Duration,
}

struct Interaction {
    callback: Callback<InteractionInfo>,
}

fn on_interaction(interaction: &Rc<Interaction>, event: &DeviceEvent) {
    (interaction.callback)(&InteractionInfo {
        kind: event.kind,
        time_stamp: event.time_stamp,
    });
}

/// Call `callback` on every mouse, touch, wheel or key event reaching
/// `target`, and on every window resize. Pass [`EventTarget::Window`] to
/// watch the whole page.
pub fn handle_any_user_interaction(
    host: &SharedHost,
    target: impl Into<EventTarget>,
    callback: impl Fn(&InteractionInfo) + 'static,
) -> Teardown {
    let target = target.into();
    let interaction = Rc::new(Interaction {
        callback: Rc::new(callback),
    });
    let teardown = Teardown::new();
    let watched = INTERACTION_KINDS
        .iter()
        .map(|kind| (target, *kind))
        .chain(core::iter::once((EventTarget::Window, EventKind::Resize)));
    for (on, kind) in watched {
        listen_for_lifetime(
            host,
            &teardown,
            on,
            kind,
            ListenOptions::PASSIVE,
            &interaction,
            on_interaction,
        );
    }
    teardown
}
