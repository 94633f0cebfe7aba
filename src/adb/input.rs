//! Text entry through the ADB Keyboard IME.
//!
//! Requires ADB Keyboard to be installed on the device.
//! See: https://github.com/senzhk/ADBKeyBoard

use base64::{engine::general_purpose::STANDARD, Engine};
use std::time::Duration;
use tracing::warn;

use super::driver::AdbDevice;
use crate::device::DeviceError;

const ADB_KEYBOARD_IME: &str = "com.android.adbkeyboard/.AdbIME";
const IME_SETTLE: Duration = Duration::from_millis(500);

impl AdbDevice {
    /// Make ADB Keyboard the active IME. Returns the previous IME id.
    pub(super) async fn switch_to_adb_keyboard(&self) -> Result<String, DeviceError> {
        let output = self
            .shell(&["settings", "get", "secure", "default_input_method"], "read ime")
            .await?;
        let current = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !current.contains(ADB_KEYBOARD_IME) {
            self.shell(&["ime", "set", ADB_KEYBOARD_IME], "set ime").await?;
            tokio::time::sleep(IME_SETTLE).await;
        }
        Ok(current)
    }

    pub(super) async fn clear_text(&self) -> Result<(), DeviceError> {
        self.shell(&["am", "broadcast", "-a", "ADB_CLEAR_TEXT"], "clear text")
            .await?;
        Ok(())
    }

    /// Send text base64 encoded so any Unicode survives the shell.
    pub(super) async fn broadcast_text(&self, text: &str) -> Result<(), DeviceError> {
        let encoded = encode_text(text);
        self.shell(
            &["am", "broadcast", "-a", "ADB_INPUT_B64", "--es", "msg", &encoded],
            "type text",
        )
        .await?;
        Ok(())
    }

    /// Put back the IME that was active before typing. Best effort.
    pub(super) async fn restore_keyboard(&self, ime: &str) {
        if ime.is_empty() || ime.contains(ADB_KEYBOARD_IME) {
            return;
        }
        if let Err(err) = self.shell(&["ime", "set", ime], "restore ime").await {
            warn!(ime, error = %err, "could not restore keyboard");
        }
    }
}

fn encode_text(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}
