#![forbid(unsafe_code)]

//! Canonical device event types.
//!
//! This module defines the raw input model consumed by every recognizer: one
//! [`DeviceEvent`] struct covering mouse, pointer, touch, wheel, focus,
//! keyboard and resize events, tagged by [`EventKind`].
//!
//! # Design Notes
//!
//! - Coordinates are client-space CSS pixels (`clientX` / `clientY`).
//! - `button` is the raw DOM `MouseEvent.button` code; touch and wheel events
//!   carry `0`.
//! - `key` / `code` mirror `KeyboardEvent.key` / `KeyboardEvent.code` and are
//!   empty for every other kind.
//! - `prevent_default` uses interior mutability so listeners can receive a
//!   shared reference, matching DOM semantics.

use core::cell::Cell;
use core::fmt;
use core::time::Duration;

use bitflags::bitflags;

use crate::error::PointerError;
use crate::geometry::{Point, Point3};

/// Opaque identity of a DOM element known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Where a listener is attached or where an event was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventTarget {
    Element(ElementId),
    /// `document` (and `document.body`, which the core never distinguishes).
    Document,
    /// `window`.
    Window,
}

impl EventTarget {
    /// The element id, if this target is an element.
    #[inline]
    #[must_use]
    pub const fn element(self) -> Option<ElementId> {
        match self {
            Self::Element(id) => Some(id),
            Self::Document | Self::Window => None,
        }
    }
}

impl From<ElementId> for EventTarget {
    fn from(id: ElementId) -> Self {
        Self::Element(id)
    }
}

/// Native event names the core listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    PointerDown,
    PointerUp,
    MouseDown,
    MouseMove,
    MouseUp,
    MouseOver,
    MouseOut,
    TouchStart,
    TouchMove,
    TouchEnd,
    Wheel,
    Focus,
    Blur,
    KeyDown,
    KeyUp,
    Resize,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::PointerDown,
        Self::PointerUp,
        Self::MouseDown,
        Self::MouseMove,
        Self::MouseUp,
        Self::MouseOver,
        Self::MouseOut,
        Self::TouchStart,
        Self::TouchMove,
        Self::TouchEnd,
        Self::Wheel,
        Self::Focus,
        Self::Blur,
        Self::KeyDown,
        Self::KeyUp,
        Self::Resize,
    ];

    /// The DOM event type string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::PointerUp => "pointerup",
            Self::MouseDown => "mousedown",
            Self::MouseMove => "mousemove",
            Self::MouseUp => "mouseup",
            Self::MouseOver => "mouseover",
            Self::MouseOut => "mouseout",
            Self::TouchStart => "touchstart",
            Self::TouchMove => "touchmove",
            Self::TouchEnd => "touchend",
            Self::Wheel => "wheel",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
            Self::Resize => "resize",
        }
    }

    /// Look up a kind by its DOM event type string.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Mouse-family events (`mouse*`).
    #[must_use]
    pub const fn is_mouse(self) -> bool {
        matches!(
            self,
            Self::MouseDown | Self::MouseMove | Self::MouseUp | Self::MouseOver | Self::MouseOut
        )
    }

    /// Touch-family events (`touch*`).
    #[must_use]
    pub const fn is_touch(self) -> bool {
        matches!(self, Self::TouchStart | Self::TouchMove | Self::TouchEnd)
    }

    /// Pointer-family events (`pointer*`).
    #[must_use]
    pub const fn is_pointer(self) -> bool {
        matches!(self, Self::PointerDown | Self::PointerUp)
    }

    /// Keyboard events (`keydown` / `keyup`).
    #[must_use]
    pub const fn is_key(self) -> bool {
        matches!(self, Self::KeyDown | Self::KeyUp)
    }

    /// Whether the event propagates to ancestors. `focus`, `blur` and
    /// `resize` do not.
    #[must_use]
    pub const fn bubbles(self) -> bool {
        !matches!(self, Self::Focus | Self::Blur | Self::Resize)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Modifier keys held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Meta/Command/Windows key.
        const META  = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

impl Modifiers {
    /// Parse a combination such as `"ctrl-shift"` or `"alt+meta"`.
    ///
    /// Names are case-insensitive and joined by `-` or `+`; the empty string
    /// is [`Modifiers::NONE`].
    ///
    /// # Errors
    ///
    /// [`PointerError::Unsupported`] for a name other than `ctrl`, `alt`,
    /// `shift` or `meta`.
    pub fn parse_combination(text: &str) -> Result<Self, PointerError> {
        let mut modifiers = Self::NONE;
        for name in text.split(['-', '+']).map(str::trim).filter(|n| !n.is_empty()) {
            modifiers |= match name.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => Self::CTRL,
                "alt" | "option" => Self::ALT,
                "shift" => Self::SHIFT,
                "meta" | "cmd" => Self::META,
                _ => return Err(PointerError::Unsupported("modifier name")),
            };
        }
        Ok(modifiers)
    }
}

/// Pointer buttons, numbered like DOM `MouseEvent.button`.
///
/// See <https://developer.mozilla.org/en-US/docs/Web/API/MouseEvent/button>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PointerButton {
    /// Usually the left button, or the un-initialized state. Also a single touch.
    Main = 0,
    /// Usually the wheel or middle button.
    Aux = 1,
    /// Usually the right button.
    Second = 2,
    /// Usually the browser "back" button.
    Fourth = 3,
    /// Usually the browser "forward" button.
    Fifth = 4,
    /// Two-finger touch (not a DOM code).
    DoubleTouch = 5,
}

impl PointerButton {
    pub const LEFT: Self = Self::Main;
    pub const MIDDLE: Self = Self::Aux;
    pub const RIGHT: Self = Self::Second;

    /// Map a DOM button code to a known button.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Main),
            1 => Some(Self::Aux),
            2 => Some(Self::Second),
            3 => Some(Self::Fourth),
            4 => Some(Self::Fifth),
            5 => Some(Self::DoubleTouch),
            _ => None,
        }
    }

    /// DOM button code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// The single-bit mask for this button.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> ButtonMask {
        ButtonMask::from_bits_retain(1 << (self as u8))
    }
}

bitflags! {
    /// Set of buttons allowed to arm a recognizer (`1 << button`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ButtonMask: u32 {
        const MAIN = 1 << 0;
        const AUX = 1 << 1;
        const SECOND = 1 << 2;
        const FOURTH = 1 << 3;
        const FIFTH = 1 << 4;
        const DOUBLE_TOUCH = 1 << 5;
    }
}

impl ButtonMask {
    /// Bit for a raw DOM button code. Codes outside `0..32` map to no bit.
    #[must_use]
    pub const fn from_code(code: i16) -> Self {
        if code >= 0 && code < 32 {
            Self::from_bits_retain(1u32 << (code as u32))
        } else {
            Self::empty()
        }
    }

    /// Whether the raw DOM button code is part of this mask.
    #[inline]
    #[must_use]
    pub const fn allows_code(self, code: i16) -> bool {
        self.intersects(Self::from_code(code))
    }
}

impl Default for ButtonMask {
    fn default() -> Self {
        Self::MAIN
    }
}

/// One touch point of a touch event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Touch {
    /// Stable identifier for the lifetime of this touch.
    pub identifier: i64,
    /// Client-space position.
    pub client: Point,
}

impl Touch {
    /// Create a touch point.
    #[must_use]
    pub const fn new(identifier: i64, x: f64, y: f64) -> Self {
        Self {
            identifier,
            client: Point::new(x, y),
        }
    }
}

/// Unit of a wheel delta (`WheelEvent.deltaMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

impl DeltaMode {
    /// Map a DOM `deltaMode` code; unknown codes are treated as pixels.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Line,
            2 => Self::Page,
            _ => Self::Pixel,
        }
    }

    /// Pixels per delta unit.
    #[must_use]
    pub const fn scalar(self) -> f64 {
        match self {
            Self::Pixel => 1.0,
            Self::Line => 16.0,
            Self::Page => 1000.0,
        }
    }
}

/// Wheel delta vector and its unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WheelDelta {
    pub delta: Point3,
    pub mode: DeltaMode,
}

impl WheelDelta {
    /// Create a pixel-mode delta.
    #[must_use]
    pub const fn pixels(x: f64, y: f64) -> Self {
        Self {
            delta: Point3::new(x, y, 0.0),
            mode: DeltaMode::Pixel,
        }
    }

    /// Delta converted to pixels.
    #[must_use]
    pub fn in_pixels(&self) -> Point3 {
        self.delta * self.mode.scalar()
    }
}

/// A raw input event as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEvent {
    pub kind: EventKind,
    /// The innermost target the event was dispatched to.
    pub target: EventTarget,
    /// `Event.timeStamp`, relative to the host time origin.
    pub time_stamp: Duration,
    /// Client position (`clientX` / `clientY`); zero for touch and focus events.
    pub client: Point,
    /// Raw DOM button code (mouse/pointer events only).
    pub button: i16,
    pub modifiers: Modifiers,
    /// Touches currently on the surface (`TouchEvent.touches`).
    pub touches: Vec<Touch>,
    /// Touches that changed in this event (`TouchEvent.changedTouches`).
    pub changed_touches: Vec<Touch>,
    /// Wheel payload (wheel events only).
    pub wheel: Option<WheelDelta>,
    /// `KeyboardEvent.key`, e.g. `"s"` or `"Enter"`.
    pub key: String,
    /// `KeyboardEvent.code`, the layout-independent physical key, e.g. `"KeyS"`.
    pub code: String,
    default_prevented: Cell<bool>,
}

impl DeviceEvent {
    fn base(kind: EventKind, target: EventTarget) -> Self {
        Self {
            kind,
            target,
            time_stamp: Duration::ZERO,
            client: Point::ZERO,
            button: 0,
            modifiers: Modifiers::NONE,
            touches: Vec::new(),
            changed_touches: Vec::new(),
            wheel: None,
            key: String::new(),
            code: String::new(),
            default_prevented: Cell::new(false),
        }
    }

    /// A mouse or pointer event at `(x, y)` with the primary button.
    #[must_use]
    pub fn mouse(kind: EventKind, target: impl Into<EventTarget>, x: f64, y: f64) -> Self {
        Self {
            client: Point::new(x, y),
            ..Self::base(kind, target.into())
        }
    }

    /// A touch event.
    ///
    /// `touches` is the list of touches still on the surface after this event;
    /// `changed` the touches that started, moved or ended.
    #[must_use]
    pub fn touch(
        kind: EventKind,
        target: impl Into<EventTarget>,
        touches: Vec<Touch>,
        changed: Vec<Touch>,
    ) -> Self {
        Self {
            touches,
            changed_touches: changed,
            ..Self::base(kind, target.into())
        }
    }

    /// A wheel event.
    #[must_use]
    pub fn wheel(target: impl Into<EventTarget>, delta: WheelDelta) -> Self {
        Self {
            wheel: Some(delta),
            ..Self::base(EventKind::Wheel, target.into())
        }
    }

    /// A focus or blur event.
    #[must_use]
    pub fn focus(kind: EventKind, target: impl Into<EventTarget>) -> Self {
        Self::base(kind, target.into())
    }

    /// A `keydown` / `keyup` event.
    #[must_use]
    pub fn key(
        kind: EventKind,
        target: impl Into<EventTarget>,
        key: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            ..Self::base(kind, target.into())
        }
    }

    /// A window `resize` event.
    #[must_use]
    pub fn resize() -> Self {
        Self::base(EventKind::Resize, EventTarget::Window)
    }

    /// Set the timestamp.
    #[must_use]
    pub fn at(mut self, time_stamp: Duration) -> Self {
        self.time_stamp = time_stamp;
        self
    }

    /// Set the raw button code.
    #[must_use]
    pub fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }

    /// Set the modifier keys.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Retarget the event (used by hosts while bubbling is not modeled).
    #[must_use]
    pub fn with_target(mut self, target: impl Into<EventTarget>) -> Self {
        self.target = target.into();
        self
    }

    /// `Event.preventDefault()`.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// `Event.defaultPrevented`.
    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Restore the default-prevented flag (hosts use this around passive listeners).
    pub fn set_default_prevented(&self, prevented: bool) {
        self.default_prevented.set(prevented);
    }

    /// First touch still on the surface.
    #[must_use]
    pub fn first_touch(&self) -> Option<&Touch> {
        self.touches.first()
    }

    /// First changed touch.
    #[must_use]
    pub fn first_changed_touch(&self) -> Option<&Touch> {
        self.changed_touches.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("keypress"), None);
    }

    #[test]
    fn event_kind_families() {
        assert!(EventKind::MouseOut.is_mouse());
        assert!(!EventKind::PointerDown.is_mouse());
        assert!(EventKind::TouchEnd.is_touch());
        assert!(EventKind::PointerUp.is_pointer());
        assert!(!EventKind::Wheel.is_touch());
        assert!(EventKind::MouseOver.bubbles());
        assert!(!EventKind::Blur.bubbles());
        assert!(!EventKind::Resize.bubbles());
        assert!(EventKind::KeyUp.is_key());
        assert!(!EventKind::KeyDown.is_mouse());
    }

    #[test]
    fn modifier_combinations_parse() {
        assert_eq!(Modifiers::parse_combination(""), Ok(Modifiers::NONE));
        assert_eq!(
            Modifiers::parse_combination("ctrl-shift"),
            Ok(Modifiers::CTRL | Modifiers::SHIFT)
        );
        assert_eq!(
            Modifiers::parse_combination("Meta+alt"),
            Ok(Modifiers::META | Modifiers::ALT)
        );
        assert_eq!(
            Modifiers::parse_combination("ctrl-hyper"),
            Err(PointerError::Unsupported("modifier name"))
        );
    }

    #[test]
    fn key_events_carry_key_and_code() {
        let ev = DeviceEvent::key(EventKind::KeyDown, ElementId(2), "s", "KeyS")
            .with_modifiers(Modifiers::CTRL);
        assert_eq!(ev.key, "s");
        assert_eq!(ev.code, "KeyS");
        assert!(ev.kind.is_key());
        let resize = DeviceEvent::resize();
        assert_eq!(resize.target, EventTarget::Window);
        assert!(resize.key.is_empty());
    }

    #[test]
    fn button_mask_from_code() {
        assert_eq!(ButtonMask::from_code(0), ButtonMask::MAIN);
        assert_eq!(ButtonMask::from_code(2), ButtonMask::SECOND);
        assert_eq!(ButtonMask::from_code(-1), ButtonMask::empty());
        assert_eq!(ButtonMask::from_code(40), ButtonMask::empty());
        assert!(ButtonMask::MAIN.allows_code(0));
        assert!(!ButtonMask::MAIN.allows_code(2));
        assert!((ButtonMask::MAIN | ButtonMask::SECOND).allows_code(2));
    }

    #[test]
    fn pointer_button_aliases() {
        assert_eq!(PointerButton::LEFT, PointerButton::Main);
        assert_eq!(PointerButton::RIGHT.code(), 2);
        assert_eq!(PointerButton::MIDDLE.mask(), ButtonMask::AUX);
        assert_eq!(PointerButton::from_code(5), Some(PointerButton::DoubleTouch));
        assert_eq!(PointerButton::from_code(9), None);
    }

    #[test]
    fn delta_mode_scalars() {
        assert_eq!(DeltaMode::from_code(0).scalar(), 1.0);
        assert_eq!(DeltaMode::from_code(1).scalar(), 16.0);
        assert_eq!(DeltaMode::from_code(2).scalar(), 1000.0);
        assert_eq!(DeltaMode::from_code(7), DeltaMode::Pixel);

        let d = WheelDelta {
            delta: Point3::new(1.0, 2.0, 0.0),
            mode: DeltaMode::Line,
        };
        assert_eq!(d.in_pixels(), Point3::new(16.0, 32.0, 0.0));
    }

    #[test]
    fn prevent_default_through_shared_ref() {
        let ev = DeviceEvent::mouse(EventKind::MouseMove, EventTarget::Window, 1.0, 2.0);
        let r = &ev;
        assert!(!r.is_default_prevented());
        r.prevent_default();
        assert!(ev.is_default_prevented());
    }

    #[test]
    fn builders_set_fields() {
        let ev = DeviceEvent::mouse(EventKind::MouseDown, ElementId(3), 4.0, 5.0)
            .at(Duration::from_millis(12))
            .with_button(2)
            .with_modifiers(Modifiers::SHIFT | Modifiers::CTRL);
        assert_eq!(ev.target, EventTarget::Element(ElementId(3)));
        assert_eq!(ev.time_stamp, Duration::from_millis(12));
        assert_eq!(ev.button, 2);
        assert!(ev.modifiers.contains(Modifiers::CTRL));
        assert_eq!(ev.client, Point::new(4.0, 5.0));
    }
}
