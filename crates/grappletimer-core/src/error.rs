//! Core error types for grappletimer-core.
//!
//! The timer itself never fails at runtime: invalid configurations are
//! rejected once, up front, and everything after that is total arithmetic.
//! The errors here cover that up-front validation plus the surfaces around
//! the engine (configuration files, the async driver, host collaborators).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for grappletimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The async engine driver is gone
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// A host collaborator (music service, notification center) failed
    #[error("Integration error for '{service}': {message}")]
    Integration {
        service: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CoreError {
    /// Build an [`CoreError::Integration`] without an underlying source.
    pub fn integration(service: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Integration {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not determine or create the data directory
    #[error("Failed to prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No preset matches the given name or id
    #[error("No preset named or identified by '{0}'")]
    UnknownPreset(String),

    /// A preset with this name already exists
    #[error("A preset named '{0}' already exists")]
    DuplicatePreset(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field holds a value outside its allowed range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Input could not be parsed at all
    #[error("Could not parse {what}: {message}")]
    Unparseable { what: String, message: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Name of the offending field, if the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidValue { field, .. } => Some(field),
            ValidationError::Unparseable { .. } => None,
        }
    }
}

/// Errors from talking to the engine task through an
/// [`EngineHandle`](crate::timer::EngineHandle).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The engine task exited and no longer accepts commands
    #[error("timer engine task has shut down")]
    EngineGone,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}
