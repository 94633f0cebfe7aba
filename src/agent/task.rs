//! Per-run task state and history.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::error::AgentError;
use crate::actions::Action;
use crate::device::DeviceCommand;
use crate::model::ModelResponse;

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Running,
    Succeeded,
    Failed,
    StepLimitExceeded,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::StepLimitExceeded => "step-limit-exceeded",
        };
        f.write_str(name)
    }
}

/// What the loop saw before asking the model. The image itself is not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub width: u32,
    pub height: u32,
    pub current_app: String,
    pub is_sensitive: bool,
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The device command completed.
    Executed,
    /// A wait elapsed (or was cut short by cancellation).
    Paused,
    /// The model declared success.
    Finished(String),
    /// The model declared failure.
    GaveUp(String),
    /// Something went wrong; the error is shown to the model next turn.
    Error(AgentError),
}

/// One observe/infer/act cycle, kept for the model's context and for audit.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: u32,
    pub observation: Observation,
    pub response: ModelResponse,
    pub action: Option<Action>,
    pub command: Option<DeviceCommand>,
    pub outcome: StepOutcome,
}

impl StepRecord {
    /// Error text to surface to the model on the following turn.
    pub fn feedback(&self) -> Option<String> {
        match &self.outcome {
            StepOutcome::Error(err) => Some(format!("[{}] {}", err.kind(), err)),
            _ => None,
        }
    }
}

/// A natural-language instruction plus its execution context.
#[derive(Debug)]
pub struct Task {
    id: Uuid,
    instruction: String,
    lang: String,
    max_steps: u32,
    step: u32,
    history: Vec<StepRecord>,
    status: TaskStatus,
    message: Option<String>,
    error: Option<AgentError>,
}

impl Task {
    pub fn new(instruction: impl Into<String>, max_steps: u32, lang: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instruction: instruction.into(),
            lang: lang.into(),
            max_steps,
            step: 0,
            history: Vec::new(),
            status: TaskStatus::Running,
            message: None,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Steps of budget consumed so far.
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub(crate) fn record(&mut self, record: StepRecord) {
        self.history.push(record);
    }

    /// Consume one step of budget. Returns `true` once the budget is spent.
    pub(crate) fn advance(&mut self) -> bool {
        self.step += 1;
        self.step >= self.max_steps
    }

    pub(crate) fn succeed(&mut self, message: String) {
        self.terminate(TaskStatus::Succeeded, Some(message), None);
    }

    pub(crate) fn give_up(&mut self, reason: String) {
        self.terminate(TaskStatus::Failed, Some(reason), None);
    }

    pub(crate) fn fail(&mut self, error: AgentError) {
        let message = error.to_string();
        self.terminate(TaskStatus::Failed, Some(message), Some(error));
    }

    pub(crate) fn exceed_step_limit(&mut self) {
        let message = format!("Step limit of {} reached", self.max_steps);
        self.terminate(TaskStatus::StepLimitExceeded, Some(message), None);
    }

    fn terminate(&mut self, status: TaskStatus, message: Option<String>, error: Option<AgentError>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.message = message;
        self.error = error;
    }

    pub fn into_outcome(self) -> RunOutcome {
        RunOutcome {
            task_id: self.id,
            status: self.status,
            message: self.message,
            error: self.error,
            steps: self.step,
            history: self.history,
        }
    }
}

/// What a run returns to its caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub task_id: Uuid,
    pub status: TaskStatus,
    /// Finish text on success, otherwise the failure reason.
    pub message: Option<String>,
    /// Cause of an error termination. `None` when the model itself finished
    /// or gave up, or the step budget ran out.
    pub error: Option<AgentError>,
    /// Steps of budget consumed.
    pub steps: u32,
    pub history: Vec<StepRecord>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    /// Number of device commands that were issued.
    pub fn device_actions(&self) -> usize {
        self.history.iter().filter(|r| r.command.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::error::ErrorKind;

    #[test]
    fn test_advance_reports_exhaustion() {
        let mut task = Task::new("open settings", 2, "en");
        assert!(!task.advance());
        assert!(task.advance());
        assert_eq!(task.step(), 2);
    }

    #[test]
    fn test_terminal_status_is_absorbing() {
        let mut task = Task::new("open settings", 5, "en");
        task.succeed("done".into());
        task.fail(AgentError::Cancelled);
        task.exceed_step_limit();

        let outcome = task.into_outcome();
        assert_eq!(outcome.status, TaskStatus::Succeeded);
        assert_eq!(outcome.message.as_deref(), Some("done"));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failure_keeps_reason_and_cause() {
        let mut task = Task::new("open settings", 5, "en");
        task.fail(AgentError::TransientIo("screencap timed out".into()));
        let outcome = task.into_outcome();
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.message.as_deref(), Some("Device I/O failed: screencap timed out"));
        assert_eq!(outcome.error.map(|e| e.kind()), Some(ErrorKind::TransientIo));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::StepLimitExceeded.to_string(), "step-limit-exceeded");
        assert!(!TaskStatus::Running.is_terminal());
    }
}
