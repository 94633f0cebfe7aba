//! Error taxonomy for agent runs.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::actions::{ParseError, TranslateError};

/// Classification of everything that can go wrong during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    TransientIo,
    ModelUnavailable,
    MalformedResponse,
    UnknownApp,
    InvalidCoordinates,
    Fatal,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientIo => "transient-io",
            ErrorKind::ModelUnavailable => "model-unavailable",
            ErrorKind::MalformedResponse => "malformed-response",
            ErrorKind::UnknownApp => "unknown-app",
            ErrorKind::InvalidCoordinates => "invalid-coordinates",
            ErrorKind::Fatal => "fatal",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Device I/O failed: {0}")]
    TransientIo(String),
    #[error("Model unavailable after {attempts} attempts: {message}")]
    ModelUnavailable { attempts: u32, message: String },
    #[error("Malformed model response: {0}")]
    MalformedResponse(#[from] ParseError),
    #[error(transparent)]
    Translation(#[from] TranslateError),
    #[error("Fatal: {0}")]
    Fatal(String),
    #[error("Run cancelled by caller")]
    Cancelled,
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::TransientIo(_) => ErrorKind::TransientIo,
            AgentError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            AgentError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            AgentError::Translation(TranslateError::UnknownApp(_)) => ErrorKind::UnknownApp,
            AgentError::Translation(TranslateError::InvalidCoordinates { .. }) => {
                ErrorKind::InvalidCoordinates
            }
            AgentError::Fatal(_) => ErrorKind::Fatal,
            AgentError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let err = AgentError::from(TranslateError::UnknownApp("foo".into()));
        assert_eq!(err.kind(), ErrorKind::UnknownApp);
        assert_eq!(err.kind().to_string(), "unknown-app");
        assert_eq!(err.to_string(), "App not found: foo");

        let err = AgentError::from(ParseError::UnknownAction("Teleport".into()));
        assert_eq!(err.kind().as_str(), "malformed-response");
    }
}
