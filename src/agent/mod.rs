//! Agent module for orchestrating phone automation.

mod error;
mod phone_agent;
mod prompt;
mod task;

pub use error::{AgentError, ErrorKind};
pub use phone_agent::{run, AgentConfig, PhoneAgent};
pub use prompt::{build_messages, SYSTEM_HOME};
pub use task::{Observation, RunOutcome, StepOutcome, StepRecord, Task, TaskStatus};
