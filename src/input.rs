//! Input model: tools, modifier keys, mouse buttons, and keyboard events.
//!
//! These types capture the user's intent at the time of a pointer or key
//! event. The host translates raw DOM events into them and hands them to
//! [`crate::engine::Engine`].

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Drag to pan the viewport.
    Pan,
    /// Click to stamp a panel (sized from the active catalog item).
    AddPanel,
    /// Click to stamp a prop.
    AddProp,
    /// Drag to draw a beam line.
    DrawBeam,
    /// Click to accumulate polygon vertices.
    DrawPolygon,
    /// Click to trace a slab outline over the background.
    TraceSlab,
    /// Drag to draw a plain rectangle.
    Rectangle,
}

impl Tool {
    /// Whether this tool commits a shape on a single click.
    #[must_use]
    pub fn is_stamp(self) -> bool {
        matches!(self, Self::AddPanel | Self::AddProp)
    }

    /// Whether this tool accumulates vertices across clicks.
    #[must_use]
    pub fn is_trace(self) -> bool {
        matches!(self, Self::DrawPolygon | Self::TraceSlab)
    }

    /// Whether drawing with this tool magnetically attaches to reference
    /// geometry vertices.
    #[must_use]
    pub fn snaps(self) -> bool {
        matches!(self, Self::DrawPolygon | Self::TraceSlab | Self::DrawBeam)
    }

    /// Single-letter keyboard shortcut for this tool, if it has one.
    #[must_use]
    pub fn from_shortcut(key: &str) -> Option<Self> {
        match key {
            "v" => Some(Self::Select),
            "h" => Some(Self::Pan),
            "b" => Some(Self::DrawBeam),
            "m" => Some(Self::TraceSlab),
            "p" => Some(Self::DrawPolygon),
            "s" => Some(Self::AddProp),
            _ => None,
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key. Treated like Ctrl for shortcuts.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl or Cmd, whichever the platform uses for shortcuts.
    #[must_use]
    pub fn primary(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key, holding the name as reported by the browser
/// (e.g. `"Delete"`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// Lower-cased key name for matching.
    #[must_use]
    pub fn lower(&self) -> String {
        self.0.to_lowercase()
    }
}

/// Wheel / trackpad scroll delta in screen pixels.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive = scroll down = zoom out.
    pub dy: f64,
}
