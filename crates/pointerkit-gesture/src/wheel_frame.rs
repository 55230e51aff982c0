#![forbid(unsafe_code)]

//! Wheel momentum integrator.
//!
//! Discrete wheel events accumulate into a target position and a short
//! velocity history. A per-frame loop moves a smoothed position along the
//! average velocity and damps it toward the target, and keeps running for
//! [`idle_frames`](WheelFrameConfig::idle_frames) frames after the last wheel
//! event to simulate inertial scrolling.
//!
//! # Invariants
//!
//! 1. Frame phases run `Start → Continue* → End`. `on_wheel_frame_start` and
//!    `on_wheel_frame_end` fire once per session; `on_wheel_frame` fires on
//!    every frame, including the start and end frames.
//! 2. `End` is reached when `idle_frames` frames have elapsed since the last
//!    wheel event; on that frame the smoothed position equals the target
//!    exactly and the frame loop stops.
//! 3. `delta_time` is `1/60` on `Start`, otherwise the frame interval clamped
//!    to `[min_delta_time, max_delta_time]`.
//!
//! The damping and velocity constants are empirical defaults, exposed in
//! [`WheelFrameConfig`].

use core::cell::RefCell;
use core::time::Duration;
use std::collections::VecDeque;
use std::rc::Rc;

use pointerkit_backend::{FrameScheduler, ListenOptions, SharedHost};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventPhase, Point3};

use crate::teardown::{Teardown, listen_for_lifetime};
use crate::{Callback, FIRST_FRAME_DELTA_TIME, emit};

/// Shortest interval used when two wheel events share a timestamp.
const MIN_EVENT_DELTA_TIME: f64 = 0.001;

/// Integrator options.
///
/// The velocity average only changes when a wheel event arrives; it does not
/// decay on idle frames. Between events the position keeps moving at
/// `average * velocity_boost` and can run well past the target, then snaps
/// back on `End`. With the defaults a single 100 px event peaks more than ten
/// times past its target before the snap. Lower `velocity_boost` or `idle_frames` to shorten the
/// overshoot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WheelFrameConfig {
    /// Call `prevent_default` on wheel events (registers a non-passive listener).
    pub prevent_default: bool,
    /// Ticker order; `None` uses the default animation frame.
    pub tick_order: Option<i32>,
    /// Frames without a wheel event before the session ends.
    pub idle_frames: u32,
    /// Capacity of the velocity history.
    pub velocity_window: usize,
    /// Multiplier on the average velocity per second of frame time.
    pub velocity_boost: f64,
    /// Base of the per-frame damping factor `base^(rate * delta_time)`.
    pub damping_base: f64,
    pub damping_rate: f64,
    pub min_delta_time: f64,
    pub max_delta_time: f64,
}

impl Default for WheelFrameConfig {
    fn default() -> Self {
        Self {
            prevent_default: false,
            tick_order: None,
            idle_frames: 8,
            velocity_window: 5,
            velocity_boost: 8.0,
            damping_base: 0.1,
            damping_rate: 30.0,
            min_delta_time: 1.0 / 240.0,
            max_delta_time: 1.0 / 30.0,
        }
    }
}

impl WheelFrameConfig {
    #[must_use]
    pub fn with_prevent_default(mut self, prevent: bool) -> Self {
        self.prevent_default = prevent;
        self
    }

    #[must_use]
    pub fn with_tick_order(mut self, order: i32) -> Self {
        self.tick_order = Some(order);
        self
    }

    #[must_use]
    pub fn with_idle_frames(mut self, frames: u32) -> Self {
        self.idle_frames = frames;
        self
    }

    #[must_use]
    pub fn with_velocity_window(mut self, capacity: usize) -> Self {
        self.velocity_window = capacity;
        self
    }

    #[must_use]
    pub fn with_velocity_boost(mut self, boost: f64) -> Self {
        self.velocity_boost = boost;
        self
    }

    #[must_use]
    pub fn with_damping(mut self, base: f64, rate: f64) -> Self {
        self.damping_base = base;
        self.damping_rate = rate;
        self
    }

    /// Fraction of the gap to the target closed in one frame of `delta_time`.
    #[must_use]
    pub fn frame_damping(&self, delta_time: f64) -> f64 {
        self.damping_base.powf(self.damping_rate * delta_time)
    }

    fn clamp_delta_time(&self, raw: f64) -> f64 {
        raw.clamp(self.min_delta_time, self.max_delta_time.max(self.min_delta_time))
    }
}

/// Bounded velocity history with an incrementally maintained average.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityWindow {
    capacity: usize,
    samples: VecDeque<Point3>,
    sum: Point3,
    average: Point3,
}

impl VelocityWindow {
    /// A window holding at most `capacity` samples (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            sum: Point3::ZERO,
            average: Point3::ZERO,
        }
    }

    pub fn push(&mut self, sample: Point3) {
        if self.samples.len() == self.capacity
            && let Some(evicted) = self.samples.pop_front()
        {
            self.sum -= evicted;
        }
        self.samples.push_back(sample);
        self.sum += sample;
        self.average = self.sum * (1.0 / self.samples.len() as f64);
    }

    #[must_use]
    pub fn average(&self) -> Point3 {
        self.average
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = Point3::ZERO;
        self.average = Point3::ZERO;
    }
}

/// Snapshot handed to wheel-frame callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelFrameInfo {
    /// Integrated frame time of the session clock, in seconds.
    pub time: f64,
    pub delta_time: f64,
    /// Smoothed displacement since the previous frame.
    pub delta: Point3,
    pub phase: EventPhase,
    /// Smoothed position.
    pub position: Point3,
    /// Accumulated wheel position the smoothed one converges to.
    pub target: Point3,
}

/// Options and callbacks for [`handle_wheel_frame`].
#[derive(Clone, Default)]
pub struct WheelFrameParams {
    pub config: WheelFrameConfig,
    pub on_wheel_frame: Option<Callback<WheelFrameInfo>>,
    pub on_wheel_frame_start: Option<Callback<WheelFrameInfo>>,
    pub on_wheel_frame_end: Option<Callback<WheelFrameInfo>>,
}

impl core::fmt::Debug for WheelFrameParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WheelFrameParams")
            .field("config", &self.config)
            .field("has_callbacks", &self.has_callbacks())
            .finish()
    }
}

impl WheelFrameParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: WheelFrameConfig) -> Self {
        self.config = config;
        self
    }

    callback_setters!(WheelFrameInfo;
        on_wheel_frame,
        on_wheel_frame_start,
        on_wheel_frame_end,
    );

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.on_wheel_frame.is_some()
            || self.on_wheel_frame_start.is_some()
            || self.on_wheel_frame_end.is_some()
    }
}

#[derive(Debug)]
struct WheelFrameState {
    /// Frames run in this session (end frame excluded).
    frame: u64,
    event_count: u64,
    /// `event_count` as seen by the previous frame; zero means no frame ran yet.
    event_count_old: u64,
    /// Value of `frame` when the last wheel event arrived.
    event_frame: u64,
    last_event: Option<Duration>,
    last_frame: Option<Duration>,
    time: f64,
    position: Point3,
    position_old: Point3,
    target: Point3,
    velocities: VelocityWindow,
}

struct WheelFrame {
    params: WheelFrameParams,
    frames: FrameScheduler,
    state: RefCell<WheelFrameState>,
}

impl WheelFrame {
    fn request_frame(self: &Rc<Self>) {
        let this = Rc::clone(self);
        self.frames.request(move |timestamp| this.frame(timestamp));
    }

    fn frame(self: &Rc<Self>, timestamp: Duration) {
        let config = &self.params.config;
        let info = {
            let mut s = self.state.borrow_mut();
            let phase = if s.event_count_old == 0 {
                EventPhase::Start
            } else if s.frame >= s.event_frame + u64::from(config.idle_frames) {
                EventPhase::End
            } else {
                EventPhase::Continue
            };
            let delta_time = match (phase, s.last_frame) {
                (EventPhase::Start, _) | (_, None) => FIRST_FRAME_DELTA_TIME,
                (_, Some(previous)) => {
                    config.clamp_delta_time(timestamp.saturating_sub(previous).as_secs_f64())
                }
            };
            s.last_frame = Some(timestamp);
            s.time += delta_time;

            if phase == EventPhase::End {
                s.position = s.target;
            } else {
                let velocity = s.velocities.average();
                s.position += velocity * (delta_time * config.velocity_boost);
                let gap = s.target - s.position;
                s.position += gap * config.frame_damping(delta_time);
            }

            let info = WheelFrameInfo {
                time: s.time,
                delta_time,
                delta: s.position - s.position_old,
                phase,
                position: s.position,
                target: s.target,
            };
            s.position_old = s.position;
            if phase == EventPhase::End {
                s.frame = 0;
                s.event_count = 0;
                s.event_count_old = 0;
                s.last_event = None;
                s.last_frame = None;
                s.velocities.clear();
            } else {
                s.event_count_old = s.event_count;
                s.frame += 1;
            }
            info
        };

        if info.phase == EventPhase::End {
            self.frames.cancel();
        } else {
            self.request_frame();
        }

        #[cfg(feature = "tracing")]
        if info.phase != EventPhase::Continue {
            tracing::debug!(
                message = if info.phase == EventPhase::Start {
                    "wheel_frame.start"
                } else {
                    "wheel_frame.end"
                },
                time = info.time,
                target_y = info.target.y
            );
        }

        if info.phase == EventPhase::Start {
            emit(&self.params.on_wheel_frame_start, &info);
        }
        emit(&self.params.on_wheel_frame, &info);
        if info.phase == EventPhase::End {
            emit(&self.params.on_wheel_frame_end, &info);
        }
    }
}

fn on_wheel(wheel: &Rc<WheelFrame>, event: &DeviceEvent) {
    let Some(delta) = event.wheel else {
        return;
    };
    if wheel.params.config.prevent_default {
        event.prevent_default();
    }
    let delta = delta.in_pixels();
    let first = {
        let mut s = wheel.state.borrow_mut();
        let first = s.event_count == 0;
        let event_delta_time = match (first, s.last_event) {
            (false, Some(previous)) => event
                .time_stamp
                .saturating_sub(previous)
                .as_secs_f64()
                .max(MIN_EVENT_DELTA_TIME),
            _ => FIRST_FRAME_DELTA_TIME,
        };
        s.target += delta;
        s.velocities.push(delta * (1.0 / event_delta_time));
        s.event_count += 1;
        s.event_frame = s.frame;
        s.last_event = Some(event.time_stamp);
        first
    };
    if first {
        wheel.request_frame();
    }
}

/// Integrate wheel events on `element` into a per-frame momentum stream.
pub fn handle_wheel_frame(
    host: &SharedHost,
    element: ElementId,
    params: WheelFrameParams,
) -> Teardown {
    let config = &params.config;
    let wheel = Rc::new(WheelFrame {
        frames: FrameScheduler::new(SharedHost::clone(host), config.tick_order),
        state: RefCell::new(WheelFrameState {
            frame: 0,
            event_count: 0,
            event_count_old: 0,
            event_frame: 0,
            last_event: None,
            last_frame: None,
            time: 0.0,
            position: Point3::ZERO,
            position_old: Point3::ZERO,
            target: Point3::ZERO,
            velocities: VelocityWindow::new(config.velocity_window),
        }),
        params,
    });
    let options = ListenOptions {
        passive: !wheel.params.config.prevent_default,
    };
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
        wheel.frames.cancel();
        Ok(())
    });
    teardown
}
