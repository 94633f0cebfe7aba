//! Translation of model actions into device commands.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::action::{Action, CoordinateSystem, RELATIVE_COORDINATE_MAX};
use crate::config::AppRegistry;
use crate::device::{DeviceCommand, ScreenBounds};

/// Translation errors. Both are reported back to the model, not fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("App not found: {0}")]
    UnknownApp(String),
    #[error(
        "Coordinates ({x}, {y}) are outside the {system} range for a {}x{} screen",
        .bounds.width,
        .bounds.height
    )]
    InvalidCoordinates {
        x: i64,
        y: i64,
        system: CoordinateSystem,
        bounds: ScreenBounds,
    },
}

/// What the loop should do with a translated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Issue exactly one device command.
    Execute(DeviceCommand),
    /// Pause without touching the device.
    Pause(Duration),
    /// Stop: the task succeeded.
    Finish(String),
    /// Stop: the model gave up.
    Fail(String),
}

/// Turns [`Action`] values into [`Directive`]s.
#[derive(Debug, Clone)]
pub struct ActionTranslator {
    registry: Arc<AppRegistry>,
    coordinate_system: CoordinateSystem,
}

impl ActionTranslator {
    pub fn new(registry: Arc<AppRegistry>, coordinate_system: CoordinateSystem) -> Self {
        Self {
            registry,
            coordinate_system,
        }
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    /// Translate an action against the last observed screen bounds.
    pub fn translate(
        &self,
        action: &Action,
        bounds: ScreenBounds,
    ) -> Result<Directive, TranslateError> {
        let command = match action {
            Action::LaunchApp { app } => {
                let package = self
                    .registry
                    .resolve(app)
                    .ok_or_else(|| TranslateError::UnknownApp(app.clone()))?;
                DeviceCommand::Launch {
                    package: package.to_string(),
                }
            }
            Action::Tap { x, y } => {
                let (x, y) = self.map_point(*x, *y, bounds)?;
                DeviceCommand::Tap { x, y }
            }
            Action::Swipe { x1, y1, x2, y2 } => {
                let (x1, y1) = self.map_point(*x1, *y1, bounds)?;
                let (x2, y2) = self.map_point(*x2, *y2, bounds)?;
                DeviceCommand::Swipe { x1, y1, x2, y2 }
            }
            Action::TypeText { text } => DeviceCommand::TypeText { text: text.clone() },
            Action::Wait { duration } => return Ok(Directive::Pause(*duration)),
            Action::Finish { message } => return Ok(Directive::Finish(message.clone())),
            Action::Fail { reason } => return Ok(Directive::Fail(reason.clone())),
        };

        Ok(Directive::Execute(command))
    }

    /// Validate a point and convert it to device pixels. Never clamps.
    fn map_point(&self, x: i64, y: i64, bounds: ScreenBounds) -> Result<(u32, u32), TranslateError> {
        let invalid = || TranslateError::InvalidCoordinates {
            x,
            y,
            system: self.coordinate_system,
            bounds,
        };

        match self.coordinate_system {
            CoordinateSystem::Absolute => {
                if !bounds.contains(x, y) {
                    return Err(invalid());
                }
                Ok((x as u32, y as u32))
            }
            CoordinateSystem::Relative => {
                let in_grid = |v: i64| (0..=RELATIVE_COORDINATE_MAX).contains(&v);
                if !in_grid(x) || !in_grid(y) || bounds.width == 0 || bounds.height == 0 {
                    return Err(invalid());
                }
                let scale = RELATIVE_COORDINATE_MAX + 1;
                let px = x * bounds.width as i64 / scale;
                let py = y * bounds.height as i64 / scale;
                Ok((px as u32, py as u32))
            }
        }
    }
}
