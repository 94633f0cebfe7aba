//! Persisted defaults for the Phone Agent CLI.
//! Stored in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::actions::CoordinateSystem;
use crate::agent::AgentConfig;
use crate::model::ModelConfig;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot determine config directory")]
    NoConfigDir,
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Model API base URL
    pub base_url: String,
    /// Model API key
    pub api_key: String,
    /// Model name
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// ADB device ID (empty for the only attached device)
    pub device_id: String,
    /// Language code ("cn" or "en")
    pub lang: String,
    /// Coordinate system ("absolute" or "relative")
    pub coordinate_system: String,
    /// Maximum retries for model requests
    pub max_retries: u32,
    /// Retry delay in seconds
    pub retry_delay: u64,
    /// Maximum steps for agent
    pub max_steps: u32,
    pub verbose: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        let model = ModelConfig::default();
        let agent = AgentConfig::default();
        Self {
            base_url: model.base_url,
            api_key: model.api_key,
            model_name: model.model_name,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
            device_id: String::new(),
            lang: agent.lang,
            coordinate_system: agent.coordinate_system.to_string(),
            max_retries: agent.max_model_retries,
            retry_delay: agent.retry_delay.as_secs(),
            max_steps: agent.max_steps,
            verbose: agent.verbose,
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "moderras", "phone-agent")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, or defaults when absent or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
            Self::default()
        })
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let dir = Self::config_dir().ok_or(SettingsError::NoConfigDir)?;
        fs::create_dir_all(&dir)?;

        let path = dir.join("settings.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Override fields from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Override fields from `lookup`. Unparseable numbers are ignored.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = text("MODEL_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = text("MODEL_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = text("MODEL_NAME") {
            self.model_name = v;
        }
        if let Some(v) = text("ADB_DEVICE_ID") {
            self.device_id = v;
        }
        if let Some(v) = text("AGENT_LANG") {
            self.lang = v;
        }
        if let Some(v) = text("COORDINATE_SYSTEM") {
            self.coordinate_system = v;
        }
        parse_into(&mut self.temperature, text("MODEL_TEMPERATURE"));
        parse_into(&mut self.max_tokens, text("MODEL_MAX_TOKENS"));
        parse_into(&mut self.max_steps, text("AGENT_MAX_STEPS"));
        parse_into(&mut self.max_retries, text("MODEL_MAX_RETRIES"));
        parse_into(&mut self.retry_delay, text("MODEL_RETRY_DELAY"));
    }

    pub fn to_model_config(&self) -> ModelConfig {
        ModelConfig::default()
            .with_base_url(&self.base_url)
            .with_api_key(&self.api_key)
            .with_model_name(&self.model_name)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    pub fn to_agent_config(&self) -> AgentConfig {
        let coordinate_system = CoordinateSystem::from_name(&self.coordinate_system)
            .unwrap_or_else(|| {
                warn!(value = %self.coordinate_system, "unknown coordinate system, using absolute");
                CoordinateSystem::default()
            });

        let mut config = AgentConfig::default()
            .with_lang(&self.lang)
            .with_max_steps(self.max_steps)
            .with_coordinate_system(coordinate_system)
            .with_model_retries(self.max_retries, Duration::from_secs(self.retry_delay));
        if !self.device_id.is_empty() {
            config = config.with_device_id(&self.device_id);
        }
        config.verbose = self.verbose;
        config
    }
}

fn parse_into<T: FromStr>(field: &mut T, value: Option<String>) {
    if let Some(raw) = value {
        match raw.trim().parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => warn!(value = %raw, "ignoring unparseable setting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_configs() {
        let settings = AppSettings::default();
        assert_eq!(settings.base_url, "http://localhost:8000/v1");
        assert_eq!(settings.coordinate_system, "absolute");
        assert_eq!(settings.max_steps, 100);
        assert_eq!(settings.retry_delay, 2);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = AppSettings::default();
        settings.apply_vars(vars(&[
            ("MODEL_BASE_URL", "https://api.example.com/v1"),
            ("MODEL_NAME", "glm-4v"),
            ("AGENT_MAX_STEPS", "25"),
            ("MODEL_TEMPERATURE", "0.3"),
            ("COORDINATE_SYSTEM", "relative"),
            ("ADB_DEVICE_ID", "emulator-5554"),
        ]));

        assert_eq!(settings.base_url, "https://api.example.com/v1");
        assert_eq!(settings.model_name, "glm-4v");
        assert_eq!(settings.max_steps, 25);
        assert!((settings.temperature - 0.3).abs() < f32::EPSILON);

        let agent = settings.to_agent_config();
        assert_eq!(agent.coordinate_system, CoordinateSystem::Relative);
        assert_eq!(agent.device_id.as_deref(), Some("emulator-5554"));
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let mut settings = AppSettings::default();
        settings.apply_vars(vars(&[("AGENT_MAX_STEPS", "lots"), ("MODEL_NAME", "  ")]));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"lang": "en"}"#).unwrap();
        assert_eq!(settings.lang, "en");
        assert_eq!(settings.max_tokens, 3000);

        let model = settings.to_model_config();
        assert_eq!(model.model_name, "autoglm-phone-9b");
        assert!(settings.to_agent_config().device_id.is_none());
    }
}
