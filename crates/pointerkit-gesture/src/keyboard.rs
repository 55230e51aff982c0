#![forbid(unsafe_code)]

//! Filtered `keydown` bindings.
//!
//! A [`KeyboardParams`] holds an ordered list of `(filter, callback)`
//! bindings. Every `keydown` reaching the target is tested against each
//! filter in order and every matching callback runs, so one key press can
//! fire several bindings.
//!
//! `key` is the produced character (`"s"`, `"S"`, `"Enter"`) and is compared
//! case-insensitively by default; `code` is the layout-independent physical
//! key (`"KeyS"`) and is always compared exactly.
//!
//! # Example
//!
//! ```ignore
//! let params = KeyboardParams::new()
//!     .bind(
//!         KeyboardFilter::key("z").with_modifier_predicate(|m| {
//!             !m.contains(Modifiers::SHIFT) && m.intersects(Modifiers::CTRL | Modifiers::META)
//!         }),
//!         |event| undo(event),
//!     )
//!     .bind(KeyboardFilter::key("Escape").with_no_modifiers(), |_| close());
//! let teardown = handle_keyboard(&host, EventTarget::Document, params);
//! ```

use std::rc::Rc;

use pointerkit_backend::{ListenOptions, SharedHost};
use pointerkit_core::{DeviceEvent, EventKind, EventTarget, Modifiers, PointerError};

use crate::Callback;
use crate::teardown::{Teardown, listen_for_lifetime};

/// Matches a `key` or `code` string.
#[derive(Clone, Default)]
pub enum KeyMatcher {
    /// Every value (`"*"`).
    #[default]
    Any,
    Exact(String),
    OneOf(Vec<String>),
    Predicate(Rc<dyn Fn(&str) -> bool>),
}

impl core::fmt::Debug for KeyMatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            Self::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for KeyMatcher {
    /// `"*"` matches everything, anything else matches exactly.
    fn from(value: &str) -> Self {
        if value == "*" {
            Self::Any
        } else {
            Self::Exact(value.to_owned())
        }
    }
}

impl From<String> for KeyMatcher {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl<const N: usize> From<[&str; N]> for KeyMatcher {
    fn from(values: [&str; N]) -> Self {
        Self::OneOf(values.iter().map(|v| (*v).to_owned()).collect())
    }
}

impl KeyMatcher {
    /// Match `value`, folding case on both sides when `ignore_case` is set.
    #[must_use]
    pub fn matches(&self, value: &str, ignore_case: bool) -> bool {
        let same = |expected: &str| {
            if ignore_case {
                expected.to_lowercase() == value.to_lowercase()
            } else {
                expected == value
            }
        };
        match self {
            Self::Any => true,
            Self::Exact(expected) => same(expected.as_str()),
            Self::OneOf(expected) => expected.iter().any(|e| same(e.as_str())),
            Self::Predicate(predicate) => {
                if ignore_case {
                    predicate(&value.to_lowercase())
                } else {
                    predicate(value)
                }
            }
        }
    }
}

/// Matches the modifier keys held during a key press.
#[derive(Clone, Default)]
pub enum ModifierMatcher {
    /// Any combination.
    #[default]
    Any,
    /// Exactly this set: every listed modifier held, every other one released.
    Exactly(Modifiers),
    Predicate(Rc<dyn Fn(Modifiers) -> bool>),
}

impl core::fmt::Debug for ModifierMatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Exactly(m) => f.debug_tuple("Exactly").field(m).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl ModifierMatcher {
    #[must_use]
    pub fn matches(&self, modifiers: Modifiers) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(expected) => *expected == modifiers,
            Self::Predicate(predicate) => predicate(modifiers),
        }
    }
}

/// Conditions a `keydown` must meet to fire a binding. All of them must hold.
#[derive(Debug, Clone)]
pub struct KeyboardFilter {
    pub key: KeyMatcher,
    /// Compare `key` ignoring case (default `true`).
    pub key_case_insensitive: bool,
    pub code: KeyMatcher,
    /// Require that no modifier is held.
    pub no_modifiers: bool,
    pub modifiers: ModifierMatcher,
}

impl Default for KeyboardFilter {
    fn default() -> Self {
        Self {
            key: KeyMatcher::Any,
            key_case_insensitive: true,
            code: KeyMatcher::Any,
            no_modifiers: false,
            modifiers: ModifierMatcher::Any,
        }
    }
}

impl KeyboardFilter {
    /// A filter matching every key press.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// A filter on `key` alone.
    #[must_use]
    pub fn key(key: impl Into<KeyMatcher>) -> Self {
        Self::default().with_key(key)
    }

    /// A filter on `code` alone.
    #[must_use]
    pub fn code(code: impl Into<KeyMatcher>) -> Self {
        Self::default().with_code(code)
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<KeyMatcher>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<KeyMatcher>) -> Self {
        self.code = code.into();
        self
    }

    #[must_use]
    pub fn with_key_case_insensitive(mut self, insensitive: bool) -> Self {
        self.key_case_insensitive = insensitive;
        self
    }

    #[must_use]
    pub fn with_no_modifiers(mut self) -> Self {
        self.no_modifiers = true;
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = ModifierMatcher::Exactly(modifiers);
        self
    }

    /// Exact modifiers from a combination such as `"ctrl-shift"`. The empty
    /// string leaves modifiers unconstrained.
    ///
    /// # Errors
    ///
    /// [`PointerError::Unsupported`] for an unknown modifier name.
    pub fn with_modifier_combination(mut self, combination: &str) -> Result<Self, PointerError> {
        self.modifiers = if combination.trim().is_empty() {
            ModifierMatcher::Any
        } else {
            ModifierMatcher::Exactly(Modifiers::parse_combination(combination)?)
        };
        Ok(self)
    }

    #[must_use]
    pub fn with_modifier_predicate(mut self, predicate: impl Fn(Modifiers) -> bool + 'static) -> Self {
        self.modifiers = ModifierMatcher::Predicate(Rc::new(predicate));
        self
    }

    /// Whether `event` satisfies every condition.
    #[must_use]
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        self.key.matches(&event.key, self.key_case_insensitive)
            && self.code.matches(&event.code, false)
            && (!self.no_modifiers || event.modifiers.is_empty())
            && self.modifiers.matches(event.modifiers)
    }
}

/// Listener options for [`handle_keyboard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KeyboardConfig {
    /// Call `prevent_default` on every matched key press.
    pub prevent_default: bool,
    /// Ignore key presses dispatched to a descendant of the target, e.g. typing
    /// in a nested input.
    pub strict_target: bool,
}

impl KeyboardConfig {
    #[must_use]
    pub fn with_prevent_default(mut self, prevent: bool) -> Self {
        self.prevent_default = prevent;
        self
    }

    #[must_use]
    pub fn with_strict_target(mut self, strict: bool) -> Self {
        self.strict_target = strict;
        self
    }
}

/// Ordered key bindings for [`handle_keyboard`].
#[derive(Clone, Default)]
pub struct KeyboardParams {
    pub config: KeyboardConfig,
    pub bindings: Vec<(KeyboardFilter, Callback<DeviceEvent>)>,
}

impl core::fmt::Debug for KeyboardParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyboardParams")
            .field("config", &self.config)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

impl KeyboardParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: KeyboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a binding; the callback receives the matched `keydown`.
    #[must_use]
    pub fn bind(mut self, filter: KeyboardFilter, callback: impl Fn(&DeviceEvent) + 'static) -> Self {
        self.bindings.push((filter, Rc::new(callback)));
        self
    }

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        !self.bindings.is_empty()
    }
}

struct Keyboard {
    target: EventTarget,
    params: KeyboardParams,
}

fn on_key_down(keyboard: &Rc<Keyboard>, event: &DeviceEvent) {
    if keyboard.params.config.strict_target && event.target != keyboard.target {
        return;
    }
    for (_index, (filter, callback)) in keyboard.params.bindings.iter().enumerate() {
        if !filter.matches(event) {
            continue;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "keyboard.match", key = %event.key, binding = _index);
        if keyboard.params.config.prevent_default {
            event.prevent_default();
        }
        callback(event);
    }
}

/// Run the matching bindings of `params` for every `keydown` reaching
/// `target`. Pass [`EventTarget::Document`] for page-wide shortcuts.
pub fn handle_keyboard(
    host: &SharedHost,
    target: impl Into<EventTarget>,
    params: KeyboardParams,
) -> Teardown {
    let target = target.into();
    let keyboard = Rc::new(Keyboard { target, params });
    let teardown = Teardown::new();
    listen_for_lifetime(
        host,
        &teardown,
        target,
        EventKind::KeyDown,
        ListenOptions::ACTIVE,
        &keyboard,
        on_key_down,
    );
    teardown
}
