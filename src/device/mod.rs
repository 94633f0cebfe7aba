//! Device capability interface.
//!
//! The agent loop drives a device only through [`DeviceDriver`]. The ADB
//! implementation lives in [`crate::adb`]; tests substitute their own doubles.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Device driver errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// A glitch worth retrying (device busy, truncated output, ...).
    #[error("Transient device error: {0}")]
    Transient(String),
    /// The device or its transport cannot be used at all.
    #[error("Device unavailable: {0}")]
    Unavailable(String),
}

impl DeviceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeviceError::Transient(_))
    }
}

/// Represents a captured screenshot.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub base64_data: String,
    pub width: u32,
    pub height: u32,
    pub is_sensitive: bool,
}

impl Screenshot {
    /// Create a new screenshot.
    pub fn new(base64_data: String, width: u32, height: u32, is_sensitive: bool) -> Self {
        Self {
            base64_data,
            width,
            height,
            is_sensitive,
        }
    }

    pub fn bounds(&self) -> ScreenBounds {
        ScreenBounds {
            width: self.width,
            height: self.height,
        }
    }
}

/// Pixel dimensions of the last observed screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
}

impl ScreenBounds {
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }
}

/// Capabilities the agent loop needs from a device.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    async fn capture_screenshot(&self) -> Result<Screenshot, DeviceError>;

    async fn launch(&self, package: &str) -> Result<(), DeviceError>;

    async fn tap(&self, x: u32, y: u32) -> Result<(), DeviceError>;

    async fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<(), DeviceError>;

    /// Type into the focused input field. The text is passed verbatim;
    /// escaping is up to the implementation.
    async fn type_text(&self, text: &str) -> Result<(), DeviceError>;

    /// Package of the foreground app, if the driver can tell.
    ///
    /// Must not change device state.
    async fn current_package(&self) -> Result<Option<String>, DeviceError> {
        Ok(None)
    }
}

/// A single device-mutating call produced by the action translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeviceCommand {
    Launch { package: String },
    Tap { x: u32, y: u32 },
    Swipe { x1: u32, y1: u32, x2: u32, y2: u32 },
    TypeText { text: String },
}

impl DeviceCommand {
    /// Issue this command against a driver.
    pub async fn execute<D: DeviceDriver + ?Sized>(&self, driver: &D) -> Result<(), DeviceError> {
        match self {
            DeviceCommand::Launch { package } => driver.launch(package).await,
            DeviceCommand::Tap { x, y } => driver.tap(*x, *y).await,
            DeviceCommand::Swipe { x1, y1, x2, y2 } => driver.swipe(*x1, *y1, *x2, *y2).await,
            DeviceCommand::TypeText { text } => driver.type_text(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_bounds_contains() {
        let bounds = ScreenBounds {
            width: 1080,
            height: 1920,
        };
        assert!(bounds.contains(0, 0));
        assert!(bounds.contains(1079, 1919));
        assert!(!bounds.contains(1080, 10));
        assert!(!bounds.contains(10, 1920));
        assert!(!bounds.contains(-5, 10));
    }

    #[test]
    fn test_device_error_classification() {
        assert!(DeviceError::Transient("busy".into()).is_transient());
        assert!(!DeviceError::Unavailable("gone".into()).is_transient());
    }
}
