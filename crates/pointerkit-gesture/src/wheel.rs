#![forbid(unsafe_code)]

//! Event-driven wheel handler.
//!
//! Reports every wheel event as it arrives, with a normalized delta time,
//! and closes a burst with a synthetic `End` once no event arrived for
//! [`end_delay`](WheelConfig::end_delay). Use
//! [`handle_wheel_frame`](crate::handle_wheel_frame) for per-frame smoothing.

use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::rc::Rc;

use pointerkit_backend::{ListenOptions, SharedHost, TimerHandle};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventPhase, Point3};

use crate::teardown::{Teardown, listen_for_lifetime};
use crate::{Callback, FIRST_FRAME_DELTA_TIME, emit};

/// Wheel handler options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WheelConfig {
    /// Call `prevent_default` on wheel events (registers a non-passive listener).
    pub prevent_default: bool,
    /// Quiet period after which the burst ends.
    pub end_delay: Duration,
    pub min_delta_time: f64,
    pub max_delta_time: f64,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            prevent_default: false,
            end_delay: Duration::from_millis(100),
            min_delta_time: 1.0 / 240.0,
            max_delta_time: 1.0 / 30.0,
        }
    }
}

impl WheelConfig {
    #[must_use]
    pub fn with_prevent_default(mut self, prevent: bool) -> Self {
        self.prevent_default = prevent;
        self
    }

    #[must_use]
    pub fn with_end_delay(mut self, delay: Duration) -> Self {
        self.end_delay = delay;
        self
    }
}

/// Snapshot handed to wheel callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInfo {
    /// Event time in seconds.
    pub time: f64,
    /// Seconds since the previous event of the burst, unclamped.
    pub raw_delta_time: f64,
    pub delta_time: f64,
    /// Event delta in pixels; zero on `End`.
    pub delta: Point3,
    pub phase: EventPhase,
}

/// Options and callbacks for [`handle_wheel`].
#[derive(Clone, Default)]
pub struct WheelParams {
    pub config: WheelConfig,
    pub on_wheel: Option<Callback<WheelInfo>>,
    pub on_wheel_start: Option<Callback<WheelInfo>>,
    pub on_wheel_end: Option<Callback<WheelInfo>>,
}

impl core::fmt::Debug for WheelParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WheelParams")
            .field("config", &self.config)
            .field("has_callbacks", &self.has_callbacks())
            .finish()
    }
}

impl WheelParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: WheelConfig) -> Self {
        self.config = config;
        self
    }

    callback_setters!(WheelInfo;
        on_wheel,
        on_wheel_start,
        on_wheel_end,
    );

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.on_wheel.is_some() || self.on_wheel_start.is_some() || self.on_wheel_end.is_some()
    }
}

struct Wheel {
    host: SharedHost,
    params: WheelParams,
    /// Time of the previous event; `None` outside a burst.
    last_time: Cell<Option<f64>>,
    end_timer: Cell<Option<TimerHandle>>,
    info: RefCell<WheelInfo>,
}

impl Wheel {
    fn clear_end_timer(&self) {
        if let Some(handle) = self.end_timer.take() {
            self.host.clear_timeout(handle);
        }
    }

    fn arm_end_timer(self: &Rc<Self>) {
        self.clear_end_timer();
        let this = Rc::clone(self);
        let handle = self
            .host
            .set_timeout(self.params.config.end_delay, Box::new(move || this.end()));
        self.end_timer.set(Some(handle));
    }

    fn end(&self) {
        self.end_timer.set(None);
        self.last_time.set(None);
        let delay = self.params.config.end_delay.as_secs_f64();
        let info = {
            let mut info = self.info.borrow_mut();
            info.phase = EventPhase::End;
            info.delta_time = delay;
            info.time += delay;
            info.delta = Point3::ZERO;
            *info
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "wheel.end", time = info.time);
        emit(&self.params.on_wheel_end, &info);
    }
}

fn on_wheel(wheel: &Rc<Wheel>, event: &DeviceEvent) {
    let Some(delta) = event.wheel else {
        return;
    };
    let config = &wheel.params.config;
    if config.prevent_default {
        event.prevent_default();
    }
    let time = event.time_stamp.as_secs_f64();
    let (phase, raw_delta_time) = match wheel.last_time.replace(Some(time)) {
        Some(previous) => (EventPhase::Continue, time - previous),
        None => (EventPhase::Start, FIRST_FRAME_DELTA_TIME),
    };
    let info = WheelInfo {
        time,
        raw_delta_time,
        delta_time: raw_delta_time
            .clamp(config.min_delta_time, config.max_delta_time.max(config.min_delta_time)),
        delta: delta.in_pixels(),
        phase,
    };
    *wheel.info.borrow_mut() = info;

    if phase == EventPhase::Start {
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "wheel.start", time);
        emit(&wheel.params.on_wheel_start, &info);
    }
    emit(&wheel.params.on_wheel, &info);
    wheel.arm_end_timer();
}

/// Report wheel events on `element` with start/end bracketing.
pub fn handle_wheel(host: &SharedHost, element: ElementId, params: WheelParams) -> Teardown {
    let options = ListenOptions {
        passive: !params.config.prevent_default,
    };
    let wheel = Rc::new(Wheel {
        host: SharedHost::clone(host),
        params,
        last_time: Cell::new(None),
        end_timer: Cell::new(None),
        info: RefCell::new(WheelInfo {
            time: 0.0,
            raw_delta_time: FIRST_FRAME_DELTA_TIME,
            delta_time: FIRST_FRAME_DELTA_TIME,
            delta: Point3::ZERO,
            phase: EventPhase::Start,
        }),
    });
    let teardown = Teardown::new();
    listen_for_lifetime(
        host,
        &teardown,
        element,
        EventKind::Wheel,
        options,
        &wheel,
        on_wheel,
    );
    teardown.push(move || {
        wheel.clear_end_timer();
        wheel.last_time.set(None);
        Ok(())
    });
    teardown
}
