//! Error type shared by the monitor

use std::fmt;

use crate::platform::PlatformError;

/// Errors surfaced by configuration, serialization and lifecycle calls.
///
/// Monitoring itself never fails the host: sampling, detection and policy
/// actions log their problems and carry on.
#[derive(Debug)]
pub enum MonitorError {
    /// A configuration value is out of range
    InvalidConfig(String),
    /// Reading or writing a file failed
    Io(String),
    /// A value could not be (de)serialized
    Serialization(String),
    /// A probe call failed
    Platform(PlatformError),
    /// `start()` was called outside a tokio runtime
    NoRuntime,
    /// A statistics source could not produce its figures
    SourceUnavailable(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            MonitorError::Io(msg) => write!(f, "I/O error: {}", msg),
            MonitorError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            MonitorError::Platform(err) => write!(f, "Platform error: {}", err),
            MonitorError::NoRuntime => write!(f, "Monitoring loop requires a tokio runtime"),
            MonitorError::SourceUnavailable(msg) => write!(f, "Source unavailable: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Platform(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for MonitorError {
    fn from(err: toml::de::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for MonitorError {
    fn from(err: toml::ser::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<PlatformError> for MonitorError {
    fn from(err: PlatformError) -> Self {
        MonitorError::Platform(err)
    }
}

/// Result type alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
