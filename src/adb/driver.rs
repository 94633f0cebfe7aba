//! [`DeviceDriver`] over the `adb` command line.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Output;
use std::time::Duration;
use tracing::{debug, warn};

use super::connection::{adb_command, check_status};
use super::screenshot::{decode_screencap, parse_wm_size, sensitive_placeholder, FALLBACK_BOUNDS};
use crate::device::{DeviceDriver, DeviceError, ScreenBounds, Screenshot};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

static FOCUSED_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s([A-Za-z_][\w]*(?:\.[\w]+)+)/").expect("focused package regex is valid")
});

/// An Android device reached through `adb`.
#[derive(Debug, Clone)]
pub struct AdbDevice {
    adb_path: String,
    device_id: Option<String>,
    /// Settle time after each input so the next screenshot sees its effect.
    action_delay: Duration,
}

impl AdbDevice {
    pub fn new(device_id: Option<String>) -> Self {
        Self {
            adb_path: "adb".to_string(),
            device_id,
            action_delay: Duration::from_secs(1),
        }
    }

    pub fn with_adb_path(mut self, adb_path: impl Into<String>) -> Self {
        self.adb_path = adb_path.into();
        self
    }

    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = delay;
        self
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Run `adb [-s id] <args>` without looking at its exit status.
    async fn run(&self, args: &[&str], what: &str) -> Result<Output, DeviceError> {
        let mut cmd = adb_command(&self.adb_path, self.device_id.as_deref());
        cmd.args(args);
        debug!(?args, "adb");

        match tokio::time::timeout(COMMAND_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DeviceError::Unavailable(format!("cannot run adb: {}", e))),
            Err(_) => Err(DeviceError::Transient(format!(
                "{} timed out after {}s",
                what,
                COMMAND_TIMEOUT.as_secs()
            ))),
        }
    }

    pub(super) async fn adb(&self, args: &[&str], what: &str) -> Result<Output, DeviceError> {
        let output = self.run(args, what).await?;
        check_status(output, what)
    }

    pub(super) async fn shell(&self, args: &[&str], what: &str) -> Result<Output, DeviceError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("shell");
        full.extend_from_slice(args);
        self.adb(&full, what).await
    }

    /// Display size reported by `wm size`, for sizing placeholders.
    async fn screen_size(&self) -> ScreenBounds {
        match self.shell(&["wm", "size"], "wm size").await {
            Ok(output) => {
                parse_wm_size(&String::from_utf8_lossy(&output.stdout)).unwrap_or(FALLBACK_BOUNDS)
            }
            Err(err) => {
                debug!(error = %err, "could not read screen size");
                FALLBACK_BOUNDS
            }
        }
    }

    async fn settle(&self) {
        tokio::time::sleep(self.action_delay).await;
    }
}

#[async_trait]
impl DeviceDriver for AdbDevice {
    async fn capture_screenshot(&self) -> Result<Screenshot, DeviceError> {
        // A refused capture can exit non-zero, so the status is judged after decoding.
        let output = self.run(&["exec-out", "screencap", "-p"], "screencap").await?;
        match decode_screencap(&output) {
            Ok(Some(screenshot)) => Ok(screenshot),
            Ok(None) => {
                warn!("screen refused capture, using placeholder");
                sensitive_placeholder(self.screen_size().await)
            }
            Err(err) => check_status(output, "screencap").and(Err(err)),
        }
    }

    async fn launch(&self, package: &str) -> Result<(), DeviceError> {
        self.shell(
            &["monkey", "-p", package, "-c", "android.intent.category.LAUNCHER", "1"],
            "launch",
        )
        .await?;
        self.settle().await;
        Ok(())
    }

    async fn tap(&self, x: u32, y: u32) -> Result<(), DeviceError> {
        self.shell(&["input", "tap", &x.to_string(), &y.to_string()], "tap")
            .await?;
        self.settle().await;
        Ok(())
    }

    async fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<(), DeviceError> {
        let duration = swipe_duration_ms(x1, y1, x2, y2).to_string();
        self.shell(
            &[
                "input",
                "swipe",
                &x1.to_string(),
                &y1.to_string(),
                &x2.to_string(),
                &y2.to_string(),
                &duration,
            ],
            "swipe",
        )
        .await?;
        self.settle().await;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), DeviceError> {
        let original_ime = self.switch_to_adb_keyboard().await?;
        let typed = match self.clear_text().await {
            Ok(()) => self.broadcast_text(text).await,
            Err(err) => Err(err),
        };
        self.restore_keyboard(&original_ime).await;
        typed?;
        self.settle().await;
        Ok(())
    }

    async fn current_package(&self) -> Result<Option<String>, DeviceError> {
        let output = self.shell(&["dumpsys", "window"], "dumpsys").await?;
        Ok(focused_package(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Longer swipes get more time, within 1-2 seconds.
fn swipe_duration_ms(x1: u32, y1: u32, x2: u32, y2: u32) -> u64 {
    let dx = i64::from(x1) - i64::from(x2);
    let dy = i64::from(y1) - i64::from(y2);
    let dist_sq = (dx * dx + dy * dy) as u64;
    (dist_sq / 1000).clamp(1000, 2000)
}

/// Package of the focused window in `dumpsys window` output.
fn focused_package(dumpsys: &str) -> Option<String> {
    ["mCurrentFocus", "mFocusedApp"].iter().find_map(|key| {
        dumpsys
            .lines()
            .filter(|line| line.contains(key))
            .find_map(|line| FOCUSED_PACKAGE.captures(line))
            .map(|caps| caps[1].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focused_package_prefers_current_focus() {
        let dumpsys = "  mFocusedApp=ActivityRecord{7a1 u0 com.android.launcher3/.Launcher t1}\n\
                       \x20 mCurrentFocus=Window{b2c3 u0 com.tencent.mm/com.tencent.mm.ui.LauncherUI}\n";
        assert_eq!(focused_package(dumpsys).as_deref(), Some("com.tencent.mm"));
    }

    #[test]
    fn test_focused_package_falls_back_to_focused_app() {
        let dumpsys = "  mCurrentFocus=null\n  mFocusedApp=ActivityRecord{7a1 u0 com.android.settings/.Settings t9}\n";
        assert_eq!(focused_package(dumpsys).as_deref(), Some("com.android.settings"));
    }

    #[test]
    fn test_focused_package_missing() {
        assert_eq!(focused_package("  mCurrentFocus=null\n"), None);
        assert_eq!(focused_package(""), None);
    }

    #[test]
    fn test_swipe_duration_is_clamped() {
        assert_eq!(swipe_duration_ms(0, 0, 10, 10), 1000);
        assert_eq!(swipe_duration_ms(540, 1800, 540, 200), 2000);
        assert_eq!(swipe_duration_ms(0, 0, 0, 1200), 1440);
    }

    #[test]
    fn test_device_builder() {
        let device = AdbDevice::new(Some("emulator-5554".to_string()))
            .with_action_delay(Duration::ZERO)
            .with_adb_path("/opt/android/adb");
        assert_eq!(device.device_id(), Some("emulator-5554"));
        assert_eq!(device.adb_path, "/opt/android/adb");
        assert_eq!(device.action_delay, Duration::ZERO);
    }
}
