#![forbid(unsafe_code)]

//! JSON input parser for replaying recorded DOM events into a
//! [`DeterministicHost`].
//!
//! Each record is one JSON object:
//!
//! ```json
//! {"type":"mousedown","target":3,"t":120.5,"x":10,"y":20,"button":0}
//! {"type":"touchstart","target":3,"touches":[{"id":1,"x":5,"y":5}]}
//! {"type":"wheel","target":"window","dy":100,"mode":0}
//! {"type":"keydown","target":"document","key":"z","code":"KeyZ","mods":4}
//! {"type":"resize","target":"window"}
//! ```
//!
//! `target` is an element id, `"document"` or `"window"`. `t` is milliseconds
//! on the host clock; when present the host clock is moved there before the
//! event is dispatched.
//!
//! # Failure Modes
//!
//! - Malformed JSON → [`InputParseError::Json`].
//! - Unknown `type` → [`InputParseError::UnknownKind`].
//! - Bad `target` → [`InputParseError::BadTarget`].
//! - Wheel events without any delta field → [`InputParseError::MissingField`].

use core::time::Duration;

use pointerkit_core::{
    DeltaMode, DeviceEvent, ElementId, EventKind, EventTarget, Modifiers, Point3, Touch,
    WheelDelta,
};
use serde::Deserialize;

use crate::{DeterministicHost, DispatchOutcome};

/// Errors from parsing encoded input JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
    /// Unknown event type string.
    UnknownKind(String),
    /// Target was neither an element id nor `"document"` / `"window"`.
    BadTarget(String),
    /// Error on a specific line of a JSONL replay (1-based).
    AtLine(usize, Box<InputParseError>),
}

impl core::fmt::Display for InputParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::UnknownKind(kind) => write!(f, "unknown event type: {kind}"),
            Self::BadTarget(target) => write!(f, "bad event target: {target}"),
            Self::AtLine(line, err) => write!(f, "line {line}: {err}"),
        }
    }
}

impl std::error::Error for InputParseError {}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Element(u64),
    Named(String),
}

#[derive(Debug, Deserialize)]
struct RawTouch {
    id: i64,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    #[serde(rename = "type")]
    kind: String,
    target: RawTarget,
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    button: Option<i16>,
    #[serde(default)]
    mods: Option<u8>,
    #[serde(default)]
    touches: Vec<RawTouch>,
    #[serde(default)]
    changed: Vec<RawTouch>,
    #[serde(default)]
    dx: Option<f64>,
    #[serde(default)]
    dy: Option<f64>,
    #[serde(default)]
    dz: Option<f64>,
    #[serde(default)]
    mode: Option<u32>,
    #[serde(default)]
    key: String,
    #[serde(default)]
    code: String,
}

/// A parsed record: the event plus its optional host timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInput {
    pub event: DeviceEvent,
    pub at: Option<Duration>,
}

fn parse_target(raw: RawTarget) -> Result<EventTarget, InputParseError> {
    match raw {
        RawTarget::Element(id) => Ok(EventTarget::Element(ElementId(id))),
        RawTarget::Named(name) => match name.as_str() {
            "document" | "body" => Ok(EventTarget::Document),
            "window" => Ok(EventTarget::Window),
            _ => Err(InputParseError::BadTarget(name)),
        },
    }
}

fn touches(raw: Vec<RawTouch>) -> Vec<Touch> {
    raw.into_iter()
        .map(|t| Touch::new(t.id, t.x, t.y))
        .collect()
}

fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_nanos((ms * 1_000_000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

/// Parse one JSON-encoded DOM event.
pub fn parse_device_event(json: &str) -> Result<ParsedInput, InputParseError> {
    let raw: RawInput =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;
    let kind =
        EventKind::from_name(&raw.kind).ok_or_else(|| InputParseError::UnknownKind(raw.kind))?;
    let target = parse_target(raw.target)?;
    let modifiers = Modifiers::from_bits_truncate(raw.mods.unwrap_or(0));

    let event = if kind.is_touch() {
        DeviceEvent::touch(kind, target, touches(raw.touches), touches(raw.changed))
    } else if kind == EventKind::Wheel {
        if raw.dx.is_none() && raw.dy.is_none() && raw.dz.is_none() {
            return Err(InputParseError::MissingField("dx|dy|dz"));
        }
        let delta = WheelDelta {
            delta: Point3::new(
                raw.dx.unwrap_or(0.0),
                raw.dy.unwrap_or(0.0),
                raw.dz.unwrap_or(0.0),
            ),
            mode: DeltaMode::from_code(raw.mode.unwrap_or(0)),
        };
        let mut ev = DeviceEvent::wheel(target, delta);
        ev.client.x = raw.x.unwrap_or(0.0);
        ev.client.y = raw.y.unwrap_or(0.0);
        ev
    } else if kind.is_key() {
        DeviceEvent::key(kind, target, raw.key, raw.code)
    } else if matches!(kind, EventKind::Focus | EventKind::Blur | EventKind::Resize) {
        DeviceEvent::focus(kind, target)
    } else {
        DeviceEvent::mouse(kind, target, raw.x.unwrap_or(0.0), raw.y.unwrap_or(0.0))
            .with_button(raw.button.unwrap_or(0))
    };

    Ok(ParsedInput {
        event: event.with_modifiers(modifiers),
        at: raw.t.map(millis),
    })
}

/// Replay newline-delimited JSON records into `host`.
///
/// Blank lines are skipped. Records with `t` move the host clock (firing due
/// timers) before dispatch. Stops at the first bad line.
pub fn replay_jsonl(
    host: &DeterministicHost,
    text: &str,
) -> Result<Vec<DispatchOutcome>, InputParseError> {
    let mut outcomes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed =
            parse_device_event(line).map_err(|e| InputParseError::AtLine(idx + 1, Box::new(e)))?;
        if let Some(at) = parsed.at {
            let now = pointerkit_backend::Clock::now(host);
            if at > now {
                host.advance(at - now);
            }
        }
        outcomes.push(host.dispatch(parsed.event));
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(message = "input.replay", events = outcomes.len());
    Ok(outcomes)
}
