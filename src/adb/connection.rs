//! ADB connection management for local and remote devices.

use std::io;
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;

use crate::device::DeviceError;

/// Type of ADB connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Usb,
    Wifi,
    Remote,
}

/// Information about a connected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub status: String,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
}

/// ADB connection errors.
#[derive(Error, Debug)]
pub enum AdbError {
    #[error("Failed to run adb: {0}")]
    Spawn(#[from] io::Error),
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Lists and connects devices known to the local ADB server.
///
/// # Example
/// ```rust,no_run
/// use phone_agent_core::adb::AdbConnection;
///
/// # async fn demo() -> Result<(), phone_agent_core::adb::AdbError> {
/// let conn = AdbConnection::new();
/// conn.connect("192.168.1.100:5555").await?;
/// for device in conn.list_devices().await? {
///     println!("{} {}", device.device_id, device.status);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AdbConnection {
    adb_path: String,
}

impl Default for AdbConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl AdbConnection {
    pub fn new() -> Self {
        Self::with_path("adb")
    }

    /// Use a custom ADB binary.
    pub fn with_path(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    /// Connect to a remote device via TCP/IP. Port 5555 is assumed when
    /// the address has none.
    pub async fn connect(&self, address: &str) -> Result<String, AdbError> {
        let address = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:5555", address)
        };

        let output = Command::new(&self.adb_path)
            .args(["connect", &address])
            .output()
            .await?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let lowered = combined.to_lowercase();

        if lowered.contains("connected to") || lowered.contains("already connected") {
            Ok(format!("Connected to {}", address))
        } else {
            Err(AdbError::Connection(combined.trim().to_string()))
        }
    }

    /// List all devices the ADB server reports.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>, AdbError> {
        let output = Command::new(&self.adb_path)
            .args(["devices", "-l"])
            .output()
            .await?;
        Ok(parse_device_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_device_list(stdout: &str) -> Vec<DeviceInfo> {
    stdout
        .lines()
        .skip_while(|line| !line.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device_id = parts.next()?.to_string();
            let status = parts.next()?.to_string();
            let rest: Vec<&str> = parts.collect();

            let connection_type = if device_id.contains(':') {
                ConnectionType::Remote
            } else if rest.iter().any(|p| p.starts_with("usb:")) {
                ConnectionType::Usb
            } else {
                ConnectionType::Wifi
            };

            let model = rest
                .iter()
                .find_map(|p| p.strip_prefix("model:"))
                .map(str::to_string);

            Some(DeviceInfo {
                device_id,
                status,
                connection_type,
                model,
            })
        })
        .collect()
}

/// Build an `adb` command targeting one device.
pub(crate) fn adb_command(adb_path: &str, device_id: Option<&str>) -> Command {
    let mut cmd = Command::new(adb_path);
    if let Some(id) = device_id {
        cmd.args(["-s", id]);
    }
    cmd.kill_on_drop(true);
    cmd
}

/// Classify the exit status of a finished adb invocation.
pub(crate) fn check_status(output: Output, what: &str) -> Result<Output, DeviceError> {
    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let lowered = stderr.to_lowercase();
    if lowered.contains("no devices")
        || lowered.contains("not found")
        || lowered.contains("offline")
        || lowered.contains("unauthorized")
    {
        Err(DeviceError::Unavailable(stderr))
    } else {
        Err(DeviceError::Transient(format!("{} failed: {}", what, stderr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    #[test]
    fn test_parse_device_list() {
        let stdout = "* daemon started successfully\n\
                      List of devices attached\n\
                      emulator-5554          device product:sdk model:Pixel_7 device:emu64 transport_id:1\n\
                      R58M123ABC             device usb:1-1 product:beyond model:SM_G973F transport_id:2\n\
                      192.168.1.100:5555     offline\n\
                      \n";
        let devices = parse_device_list(stdout);

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].device_id, "emulator-5554");
        assert_eq!(devices[0].model.as_deref(), Some("Pixel_7"));
        assert_eq!(devices[0].connection_type, ConnectionType::Wifi);
        assert_eq!(devices[1].connection_type, ConnectionType::Usb);
        assert_eq!(devices[2].connection_type, ConnectionType::Remote);
        assert_eq!(devices[2].status, "offline");
        assert_eq!(devices[2].model, None);
    }

    #[test]
    fn test_parse_empty_device_list() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
    }

    fn output(code: i32, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_check_status_classification() {
        assert!(check_status(output(0, ""), "tap").is_ok());
        assert_eq!(
            check_status(output(1, "error: device 'abc' not found"), "tap").unwrap_err(),
            DeviceError::Unavailable("error: device 'abc' not found".to_string())
        );
        assert!(check_status(output(1, "Killed"), "tap").unwrap_err().is_transient());
    }
}
