#![forbid(unsafe_code)]

//! Gesture lifecycle phases and drag axis classification.

/// Lifecycle phase of a continuous gesture notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventPhase {
    #[default]
    Start,
    Continue,
    End,
}

impl EventPhase {
    /// Lowercase name used in logs and encoded traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Continue => "continue",
            Self::End => "end",
        }
    }
}

/// Dominant axis of a drag, fixed once when the drag is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Horizontal,
    Vertical,
}

impl Direction {
    /// Classify a displacement.
    ///
    /// Horizontal when `|dx / dy| >= 1`. A purely horizontal displacement
    /// (`dy == 0`) is horizontal, including the degenerate `(0, 0)` case.
    #[must_use]
    pub fn classify(dx: f64, dy: f64) -> Self {
        if dy == 0.0 {
            return Self::Horizontal;
        }
        if (dx / dy).abs() >= 1.0 {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }

    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Horizontal)
    }

    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Vertical)
    }
}
