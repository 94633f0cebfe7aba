//! The action vocabulary understood by the agent loop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Largest coordinate value on the relative grid (inclusive).
pub const RELATIVE_COORDINATE_MAX: i64 = 999;

/// How the model expresses screen positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSystem {
    /// Raw device pixels.
    #[default]
    Absolute,
    /// A 0..=999 grid stretched over the screen, as AutoGLM models emit.
    Relative,
}

impl CoordinateSystem {
    /// Parse a setting value ("absolute"/"abs", "relative"/"rel").
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "absolute" | "abs" => Some(CoordinateSystem::Absolute),
            "relative" | "rel" => Some(CoordinateSystem::Relative),
            _ => None,
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSystem::Absolute => write!(f, "absolute"),
            CoordinateSystem::Relative => write!(f, "relative"),
        }
    }
}

/// One atomic instruction decided by the model.
///
/// Coordinates are kept signed so that out-of-range values survive parsing
/// and are rejected by the translator instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    LaunchApp { app: String },
    Tap { x: i64, y: i64 },
    Swipe { x1: i64, y1: i64, x2: i64, y2: i64 },
    TypeText { text: String },
    Wait { duration: Duration },
    Finish { message: String },
    Fail { reason: String },
}

impl Action {
    /// Whether this action ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Finish { .. } | Action::Fail { .. })
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::LaunchApp { .. } => "launch-app",
            Action::Tap { .. } => "tap",
            Action::Swipe { .. } => "swipe",
            Action::TypeText { .. } => "type-text",
            Action::Wait { .. } => "wait",
            Action::Finish { .. } => "finish",
            Action::Fail { .. } => "fail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_system_from_name() {
        assert_eq!(CoordinateSystem::from_name("abs"), Some(CoordinateSystem::Absolute));
        assert_eq!(CoordinateSystem::from_name("Relative"), Some(CoordinateSystem::Relative));
        assert_eq!(CoordinateSystem::from_name("polar"), None);
    }

    #[test]
    fn test_terminal_actions() {
        assert!(Action::Finish { message: "done".into() }.is_terminal());
        assert!(Action::Fail { reason: "stuck".into() }.is_terminal());
        assert!(!Action::Tap { x: 1, y: 2 }.is_terminal());
    }

    #[test]
    fn test_action_serializes_with_tag() {
        let value = serde_json::to_value(Action::Tap { x: 10, y: 20 }).unwrap();
        assert_eq!(value["action"], "tap");
        assert_eq!(value["x"], 10);
    }
}
