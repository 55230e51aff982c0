#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! Only programmer-facing contract violations are errors. Expected runtime
//! conditions (multi-touch, rapid device switching, out-of-range options) are
//! handled by suppression inside the recognizers and never surface here.

use core::fmt;

use crate::event::EventTarget;

/// Contract violations reported by pointerkit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// A value derived from "the last event" was requested before any event
    /// was observed.
    NoEventObserved,
    /// The last event target is not an element (document or window).
    NotAnElement(EventTarget),
    /// The host has no bounding box for the element.
    UnknownElement(EventTarget),
    /// Teardown referenced a registration the host does not know about.
    MissingRegistration {
        resource: &'static str,
        id: u64,
    },
    /// A configuration value outside the supported vocabulary, e.g. an
    /// unknown modifier name in a key filter.
    Unsupported(&'static str),
}

impl fmt::Display for PointerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEventObserved => write!(f, "no event has been observed yet"),
            Self::NotAnElement(target) => write!(f, "target {target:?} is not an element"),
            Self::UnknownElement(target) => write!(f, "target {target:?} has no layout box"),
            Self::MissingRegistration { resource, id } => {
                write!(f, "missing {resource} registration #{id}")
            }
            Self::Unsupported(what) => write!(f, "unsupported {what}"),
        }
    }
}

impl std::error::Error for PointerError {}
