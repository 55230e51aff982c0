#![forbid(unsafe_code)]

//! Tap recognizer: a pointer press released quickly, close to where it went
//! down.
//!
//! The release is observed on the window, so a press that leaves the element
//! still resolves. A tap fires when the travel is at most
//! [`max_distance`](TapConfig::max_distance) and the press lasted strictly
//! less than [`max_duration`](TapConfig::max_duration).

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use pointerkit_backend::{ElementTree, ListenOptions, SharedHost, element_rect};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventTarget, Point, PointerError};

use crate::teardown::{ListenerSlot, Teardown, bind, listen_for_lifetime};
use crate::{Callback, emit};

/// Tap thresholds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TapConfig {
    /// Maximum travel between down and up, in pixels.
    pub max_distance: f64,
    /// Presses lasting this long or longer are not taps.
    pub max_duration: Duration,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            max_distance: 10.0,
            max_duration: Duration::from_millis(300),
        }
    }
}

impl TapConfig {
    #[must_use]
    pub fn with_max_distance(mut self, distance: f64) -> Self {
        self.max_distance = distance;
        self
    }

    #[must_use]
    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }
}

/// Snapshot handed to `on_tap`, describing the press that became a tap.
#[derive(Debug, Clone, PartialEq)]
pub struct TapInfo {
    /// Host time of the down event.
    pub timestamp: Duration,
    /// Element the handler is registered on.
    pub tap_target: ElementId,
    /// Element the down event was dispatched to (may be a descendant).
    pub down_target: EventTarget,
    pub down_position: Point,
    /// Native button of the down event.
    pub button: i16,
}

impl TapInfo {
    /// Down position relative to [`tap_target`](Self::tap_target).
    pub fn local_down_position(&self, tree: &dyn ElementTree) -> Result<Point, PointerError> {
        Ok(element_rect(tree, self.tap_target)?.to_local(self.down_position))
    }
}

/// Options and callbacks for [`handle_tap`].
#[derive(Clone, Default)]
pub struct TapParams {
    pub config: TapConfig,
    pub on_tap: Option<Callback<TapInfo>>,
}

impl core::fmt::Debug for TapParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TapParams")
            .field("config", &self.config)
            .field("has_callbacks", &self.has_callbacks())
            .finish()
    }
}

impl TapParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: TapConfig) -> Self {
        self.config = config;
        self
    }

    callback_setters!(TapInfo; on_tap);

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.on_tap.is_some()
    }
}

struct Tap {
    host: SharedHost,
    element: ElementId,
    params: TapParams,
    down: RefCell<Option<TapInfo>>,
    window_up: ListenerSlot,
}

fn on_pointer_down(tap: &Rc<Tap>, event: &DeviceEvent) {
    *tap.down.borrow_mut() = Some(TapInfo {
        timestamp: tap.host.now(),
        tap_target: tap.element,
        down_target: event.target,
        down_position: event.client,
        button: event.button,
    });
    tap.window_up.attach(
        &*tap.host,
        EventTarget::Window,
        EventKind::PointerUp,
        ListenOptions::PASSIVE,
        bind(tap, on_window_pointer_up),
    );
}

fn on_window_pointer_up(tap: &Rc<Tap>, event: &DeviceEvent) {
    tap.window_up.detach_in_handler(&*tap.host);
    let Some(info) = tap.down.borrow_mut().take() else {
        return;
    };
    let duration = tap.host.now().saturating_sub(info.timestamp);
    let distance = event.client.distance(info.down_position);
    let config = &tap.params.config;
    if distance <= config.max_distance && duration < config.max_duration {
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "tap.fire", distance, duration_ms = duration.as_millis() as u64);
        emit(&tap.params.on_tap, &info);
    } else {
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "tap.rejected", distance, duration_ms = duration.as_millis() as u64);
    }
}

/// Recognize taps on `element`.
pub fn handle_tap(host: &SharedHost, element: ElementId, params: TapParams) -> Teardown {
    let tap = Rc::new(Tap {
        host: SharedHost::clone(host),
        element,
        params,
        down: RefCell::new(None),
        window_up: ListenerSlot::default(),
    });
    let teardown = Teardown::new();
    listen_for_lifetime(
        host,
        &teardown,
        element,
        EventKind::PointerDown,
        ListenOptions::PASSIVE,
        &tap,
        on_pointer_down,
    );
    teardown.push(move || {
        tap.down.borrow_mut().take();
        tap.window_up.detach(&*tap.host)
    });
    teardown
}
