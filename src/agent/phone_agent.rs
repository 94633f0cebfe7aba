//! The perceive → infer → act → verify loop.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::error::{AgentError, ErrorKind};
use super::prompt::{build_messages, SYSTEM_HOME};
use super::task::{Observation, RunOutcome, StepOutcome, StepRecord, Task, TaskStatus};
use crate::actions::{parse_action, Action, ActionTranslator, CoordinateSystem, Directive};
use crate::adb::AdbDevice;
use crate::config::{get_messages, system_prompt, AppRegistry};
use crate::device::{DeviceDriver, DeviceError, ScreenBounds, Screenshot};
use crate::model::{ModelClient, ModelConfig, ModelInference, ModelResponse};

/// Longest pause between two model retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Configuration for the PhoneAgent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of steps before stopping.
    pub max_steps: u32,
    /// Optional ADB device ID for multi-device setups.
    pub device_id: Option<String>,
    /// Language code ("en" for English, anything else for Chinese).
    pub lang: String,
    /// Custom system prompt (if None, uses default based on lang).
    pub system_prompt: Option<String>,
    /// Whether to print thinking/action banners to stdout.
    pub verbose: bool,
    /// How the model expresses coordinates.
    pub coordinate_system: CoordinateSystem,
    /// Extra screenshot attempts after a transient failure.
    pub max_screenshot_retries: u32,
    /// Pause between screenshot attempts.
    pub screenshot_retry_delay: Duration,
    /// Extra model attempts after a retryable failure.
    pub max_model_retries: u32,
    /// First backoff delay; doubled after every failed model attempt.
    pub retry_delay: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            device_id: None,
            lang: "cn".to_string(),
            system_prompt: None,
            verbose: true,
            coordinate_system: CoordinateSystem::default(),
            max_screenshot_retries: 3,
            screenshot_retry_delay: Duration::from_millis(500),
            max_model_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl AgentConfig {
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_coordinate_system(mut self, system: CoordinateSystem) -> Self {
        self.coordinate_system = system;
        self
    }

    /// Set model retry count and first backoff delay.
    pub fn with_model_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.max_model_retries = retries;
        self.retry_delay = delay;
        self
    }

    /// Set screenshot retry count and the pause between attempts.
    pub fn with_screenshot_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.max_screenshot_retries = retries;
        self.screenshot_retry_delay = delay;
        self
    }

    /// Disable verbose output.
    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_steps == 0 {
            return Err(AgentError::Fatal("max_steps must be at least 1".to_string()));
        }
        if self.lang.trim().is_empty() {
            return Err(AgentError::Fatal("language tag is empty".to_string()));
        }
        Ok(())
    }

    fn system_prompt_for(&self, width: u32, height: u32) -> String {
        self.system_prompt.clone().unwrap_or_else(|| {
            system_prompt(&self.lang, self.coordinate_system, width, height)
        })
    }
}

/// Drives a device through a task with a vision-language model.
///
/// A run is strictly sequential: each step's device command finishes before
/// the next screenshot, and at most one device command is issued per step.
///
/// # Example
///
/// ```rust,no_run
/// use phone_agent_core::{AdbDevice, AgentConfig, ModelClient, ModelConfig, PhoneAgent};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let model = ModelClient::new(ModelConfig::default())?;
///     let agent = PhoneAgent::new(model, AdbDevice::new(None), AgentConfig::default());
///
///     let outcome = agent.run("打开微信").await;
///     println!("{}: {:?}", outcome.status, outcome.message);
///     Ok(())
/// }
/// ```
pub struct PhoneAgent<M, D> {
    model: M,
    device: D,
    registry: Arc<AppRegistry>,
    translator: ActionTranslator,
    config: AgentConfig,
}

impl<M: ModelInference, D: DeviceDriver> PhoneAgent<M, D> {
    /// Create an agent using the built-in app registry.
    pub fn new(model: M, device: D, config: AgentConfig) -> Self {
        let registry = AppRegistry::builtin();
        let translator = ActionTranslator::new(Arc::clone(&registry), config.coordinate_system);
        Self {
            model,
            device,
            registry,
            translator,
            config,
        }
    }

    /// Replace the app registry.
    pub fn with_registry(mut self, registry: Arc<AppRegistry>) -> Self {
        self.translator = ActionTranslator::new(Arc::clone(&registry), self.config.coordinate_system);
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run a task to completion.
    pub async fn run(&self, task: &str) -> RunOutcome {
        self.run_with_cancellation(task, &CancellationToken::new()).await
    }

    /// Run a task, stopping at the next step boundary once `cancel` fires.
    pub async fn run_with_cancellation(&self, task: &str, cancel: &CancellationToken) -> RunOutcome {
        let task = Task::new(task, self.config.max_steps, self.config.lang.clone());
        let span = info_span!("run", run_id = %task.id(), task = %task.instruction());
        self.drive(task, cancel).instrument(span).await
    }

    async fn drive(&self, mut task: Task, cancel: &CancellationToken) -> RunOutcome {
        if let Err(err) = self.initialize(&task) {
            error!(error = %err, "invalid task or configuration");
            task.fail(err);
            return task.into_outcome();
        }

        info!(max_steps = task.max_steps(), lang = task.lang(), "starting task");

        // Placeholders for refused captures carry no real size.
        let mut last_bounds: Option<ScreenBounds> = None;

        while !task.status().is_terminal() {
            if cancel.is_cancelled() {
                info!(step = task.step(), "run cancelled");
                task.fail(AgentError::Cancelled);
                break;
            }

            let screenshot = match self.observe().await {
                Ok(screenshot) => screenshot,
                Err(err) => {
                    error!(error = %err, "could not observe the device");
                    task.fail(err);
                    break;
                }
            };

            let bounds = match last_bounds {
                Some(known) if screenshot.is_sensitive => known,
                _ => screenshot.bounds(),
            };
            if !screenshot.is_sensitive {
                last_bounds = Some(bounds);
            }

            let observation = Observation {
                width: bounds.width,
                height: bounds.height,
                current_app: self.current_app().await,
                is_sensitive: screenshot.is_sensitive,
            };

            let prompt = self.config.system_prompt_for(bounds.width, bounds.height);
            let messages = build_messages(&task, &prompt, &observation, &screenshot.base64_data);

            let response = match self.infer(&messages, cancel).await {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, "model inference failed");
                    task.fail(err);
                    break;
                }
            };

            let record = self
                .act(task.step() + 1, observation, bounds, response, cancel)
                .await;
            self.verify(&mut task, record);
        }

        self.report(&task);
        task.into_outcome()
    }

    fn initialize(&self, task: &Task) -> Result<(), AgentError> {
        self.config.validate()?;
        if task.instruction().trim().is_empty() {
            return Err(AgentError::Fatal("task text is empty".to_string()));
        }
        Ok(())
    }

    /// Capture a screenshot, retrying transient failures.
    async fn observe(&self) -> Result<Screenshot, AgentError> {
        let attempts = self.config.max_screenshot_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.device.capture_screenshot().await {
                Ok(screenshot) => {
                    debug!(
                        width = screenshot.width,
                        height = screenshot.height,
                        sensitive = screenshot.is_sensitive,
                        "captured screenshot"
                    );
                    return Ok(screenshot);
                }
                Err(DeviceError::Unavailable(msg)) => {
                    return Err(AgentError::Fatal(format!("device unavailable: {}", msg)));
                }
                Err(DeviceError::Transient(msg)) => {
                    warn!(attempt, attempts, error = %msg, "screenshot failed");
                    last_error = msg;
                    if attempt < attempts {
                        tokio::time::sleep(self.config.screenshot_retry_delay).await;
                    }
                }
            }
        }

        Err(AgentError::TransientIo(format!(
            "screenshot failed after {} attempts: {}",
            attempts, last_error
        )))
    }

    /// Display name of the foreground app for the model's screen info.
    async fn current_app(&self) -> String {
        match self.device.current_package().await {
            Ok(Some(package)) => self
                .registry
                .reverse(&package)
                .map(str::to_string)
                .unwrap_or(package),
            Ok(None) => SYSTEM_HOME.to_string(),
            Err(err) => {
                debug!(error = %err, "could not read the foreground app");
                SYSTEM_HOME.to_string()
            }
        }
    }

    /// Ask the model for the next action, retrying with exponential backoff.
    async fn infer(
        &self,
        messages: &[serde_json::Value],
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, AgentError> {
        let attempts = self.config.max_model_retries.saturating_add(1);
        let mut delay = self.config.retry_delay;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.model.request(messages).await {
                Ok(response) => return Ok(response),
                Err(err) if !err.is_retryable() => {
                    return Err(AgentError::Fatal(format!("model request rejected: {}", err)));
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "model request failed");
                    last_error = err.to_string();
                    if attempt < attempts {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                        }
                        delay = next_delay(delay);
                    }
                }
            }
        }

        Err(AgentError::ModelUnavailable {
            attempts,
            message: last_error,
        })
    }

    /// Parse, translate and execute the first action of a response.
    async fn act(
        &self,
        step: u32,
        observation: Observation,
        bounds: ScreenBounds,
        response: ModelResponse,
        cancel: &CancellationToken,
    ) -> StepRecord {
        let mut record = StepRecord {
            step,
            observation,
            response,
            action: None,
            command: None,
            outcome: StepOutcome::Executed,
        };

        let action = match parse_action(&record.response.action) {
            Ok(action) => action,
            Err(err) => {
                record.outcome = StepOutcome::Error(err.into());
                return record;
            }
        };
        self.print_step(step, &record.response, &action);
        record.action = Some(action.clone());

        let directive = match self.translator.translate(&action, bounds) {
            Ok(directive) => directive,
            Err(err) => {
                record.outcome = StepOutcome::Error(err.into());
                return record;
            }
        };

        record.outcome = match directive {
            Directive::Execute(command) => {
                debug!(step, command = ?command, "executing device command");
                let result = command.execute(&self.device).await;
                record.command = Some(command);
                match result {
                    Ok(()) => StepOutcome::Executed,
                    Err(DeviceError::Transient(msg)) => {
                        StepOutcome::Error(AgentError::TransientIo(msg))
                    }
                    Err(DeviceError::Unavailable(msg)) => StepOutcome::Error(AgentError::Fatal(
                        format!("device unavailable: {}", msg),
                    )),
                }
            }
            Directive::Pause(duration) => {
                debug!(step, ?duration, "waiting");
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = cancel.cancelled() => {}
                }
                StepOutcome::Paused
            }
            Directive::Finish(message) => StepOutcome::Finished(message),
            Directive::Fail(reason) => StepOutcome::GaveUp(reason),
        };

        record
    }

    /// Record the step and decide whether the run continues.
    fn verify(&self, task: &mut Task, record: StepRecord) {
        let outcome = record.outcome.clone();
        task.record(record);

        match outcome {
            StepOutcome::Finished(message) => return task.succeed(message),
            StepOutcome::GaveUp(reason) => return task.give_up(reason),
            StepOutcome::Error(err) if err.kind() == ErrorKind::Fatal => {
                error!(error = %err, "fatal step error");
                return task.fail(err);
            }
            StepOutcome::Error(err) => {
                warn!(step = task.step() + 1, kind = %err.kind(), error = %err, "step failed");
                if self.config.verbose {
                    let msgs = get_messages(&self.config.lang);
                    println!("⚠️  {}: {}", msgs.step_error, err);
                }
            }
            StepOutcome::Executed | StepOutcome::Paused => {}
        }

        if task.advance() {
            warn!(steps = task.step(), "step limit reached");
            task.exceed_step_limit();
        }
    }

    fn print_step(&self, step: u32, response: &ModelResponse, action: &Action) {
        if !self.config.verbose {
            return;
        }
        let msgs = get_messages(&self.config.lang);
        println!("\n{}", "=".repeat(50));
        println!("{} {}", msgs.step, step);
        println!("💭 {}:", msgs.thinking);
        println!("{}", "-".repeat(50));
        println!("{}", response.thinking);
        println!("{}", "-".repeat(50));
        println!("🎯 {}:", msgs.action);
        println!("{}", serde_json::to_string_pretty(action).unwrap_or_default());
        println!("{}\n", "=".repeat(50));
    }

    fn report(&self, task: &Task) {
        info!(status = %task.status(), steps = task.step(), "task terminated");
        if !self.config.verbose {
            return;
        }
        let msgs = get_messages(&self.config.lang);
        let label = match task.status() {
            TaskStatus::Succeeded => format!("✅ {}", msgs.task_completed),
            TaskStatus::StepLimitExceeded => format!("⏹️ {}", msgs.step_limit_exceeded),
            _ => format!("❌ {}", msgs.task_failed),
        };
        println!("\n{}", label);
    }
}

/// Double a backoff delay, capped at [`MAX_RETRY_DELAY`].
fn next_delay(delay: Duration) -> Duration {
    delay
        .checked_mul(2)
        .map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY))
}

/// Run one task on the ADB device named in `agent_config`.
pub async fn run(task: &str, model_config: ModelConfig, agent_config: AgentConfig) -> RunOutcome {
    match ModelClient::new(model_config) {
        Ok(model) => {
            let device = AdbDevice::new(agent_config.device_id.clone());
            PhoneAgent::new(model, device, agent_config).run(task).await
        }
        Err(err) => {
            error!(error = %err, "invalid model configuration");
            let mut rejected = Task::new(task, agent_config.max_steps, agent_config.lang);
            rejected.fail(AgentError::Fatal(err.to_string()));
            rejected.into_outcome()
        }
    }
}
