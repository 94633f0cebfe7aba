// Copyright 2025 Zhipu AI (Original Python implementation)
// Copyright 2025 ModerRAS (Rust implementation)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Phone Agent Core
//!
//! The control loop of a vision-language phone agent. Each step captures the
//! screen, asks the model for one action, validates and translates it, and
//! executes at most one device command before looking again.
//!
//! * [`config`] holds the app registry, system prompts and UI strings.
//! * [`actions`] parses model answers and translates them into device commands.
//! * [`agent`] runs the loop and reports a [`RunOutcome`].
//! * [`device`] is the driver contract; [`adb`] implements it over ADB.
//!
//! ## Example
//!
//! ```rust,no_run
//! use phone_agent_core::{AdbDevice, AgentConfig, ModelClient, ModelConfig, PhoneAgent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let model = ModelClient::new(ModelConfig::default())?;
//!     let device = AdbDevice::new(None);
//!     let agent = PhoneAgent::new(model, device, AgentConfig::default().with_max_steps(20));
//!
//!     let outcome = agent.run("打开微信").await;
//!     println!("{} after {} steps: {:?}", outcome.status, outcome.steps, outcome.message);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod adb;
pub mod agent;
pub mod config;
pub mod device;
pub mod model;
pub mod settings;

pub use actions::{Action, ActionTranslator, CoordinateSystem, Directive, RELATIVE_COORDINATE_MAX};
pub use adb::AdbDevice;
pub use agent::{
    run, AgentConfig, AgentError, ErrorKind, PhoneAgent, RunOutcome, StepOutcome, StepRecord,
    TaskStatus,
};
pub use config::{AppRegistry, RegistryError};
pub use device::{DeviceCommand, DeviceDriver, DeviceError, ScreenBounds, Screenshot};
pub use model::{ModelClient, ModelConfig, ModelError, ModelInference, ModelResponse};
pub use settings::AppSettings;
