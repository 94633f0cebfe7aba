//! ADB (Android Debug Bridge) module for device interaction.

mod connection;
mod driver;
mod input;
mod screenshot;

pub use connection::{AdbConnection, AdbError, ConnectionType, DeviceInfo};
pub use driver::AdbDevice;
pub use screenshot::{sensitive_placeholder, FALLBACK_BOUNDS};
