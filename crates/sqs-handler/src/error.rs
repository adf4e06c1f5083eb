//! Error types for SQS handler operations.

use crate::request::Operation;
use std::fmt;
use thiserror::Error;

/// Service error codes that indicate throttling or a temporary service fault.
const TRANSIENT_SERVICE_CODES: &[&str] = &[
    "ThrottlingException",
    "RequestThrottled",
    "ServiceUnavailable",
    "InternalError",
    "InternalFailure",
    "KmsThrottled",
];

/// Comprehensive error type for all handler and provider operations
#[derive(Debug, Error)]
pub enum SqsError {
    #[error("{operation} failed ({code}): {message}")]
    Service {
        operation: Operation,
        code: String,
        message: String,
        status: Option<u16>,
    },

    #[error("{operation} returned unexpected HTTP status {status}")]
    UnexpectedStatus { operation: Operation, status: u16 },

    #[error("{operation} could not reach SQS: {message}")]
    Transport { operation: Operation, message: String },

    #[error("{operation} request could not be built: {message}")]
    InvalidRequest { operation: Operation, message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SqsError {
    /// Error code suitable for structured logging
    pub fn code(&self) -> &str {
        match self {
            Self::Service { code, .. } => code,
            Self::UnexpectedStatus { .. } => "UnexpectedStatus",
            Self::Transport { .. } => "TransportError",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::Configuration(_) => "ConfigurationError",
            Self::Validation(_) => "ValidationError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    /// HTTP status reported by the service, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => *status,
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Operation that produced the error, when it came from the transport
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Service { operation, .. }
            | Self::UnexpectedStatus { operation, .. }
            | Self::Transport { operation, .. }
            | Self::InvalidRequest { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Check if error is transient and the call could be repeated
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Service { code, status, .. } => {
                TRANSIENT_SERVICE_CODES.contains(&code.as_str())
                    || status.map_or(false, |s| s >= 500)
            }
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
            Self::InvalidRequest { .. } => false,
            Self::Configuration(_) => false,
            Self::Validation(_) => false,
            Self::Serialization(_) => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

impl From<::config::ConfigError> for ConfigurationError {
    fn from(error: ::config::ConfigError) -> Self {
        Self::Parsing {
            message: error.to_string(),
        }
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

impl ValidationError {
    /// Name of the field the error refers to
    pub fn field(&self) -> &str {
        match self {
            Self::Required { field }
            | Self::InvalidFormat { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }
}

/// Field-level errors collected while validating a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Check whether any error refers to the given field
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
