#![forbid(unsafe_code)]

//! Core: device event model, geometry, and error types.
//!
//! # Role in pointerkit
//! `pointerkit-core` is the value layer. It owns the canonical representation
//! of raw browser input ([`event::DeviceEvent`]), screen-space geometry, pointer
//! buttons, and the error taxonomy shared by every recognizer.
//!
//! # How it fits in the system
//! `pointerkit-backend` defines the host capabilities in terms of these types,
//! `pointerkit-gesture` turns sequences of [`event::DeviceEvent`] into gesture
//! notifications, and `pointerkit-web` provides a deterministic host that
//! dispatches them.

pub mod error;
pub mod event;
pub mod geometry;
pub mod phase;

pub use error::PointerError;
pub use event::{
    ButtonMask, DeltaMode, DeviceEvent, ElementId, EventKind, EventTarget, Modifiers,
    PointerButton, Touch, WheelDelta,
};
pub use geometry::{Point, Point3, Rect};
pub use phase::{Direction, EventPhase};
