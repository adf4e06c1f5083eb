//! Handler configuration and its file/environment loading.
//!
//! [`HandlerConfig`] is an immutable snapshot: every change produces a new
//! value, and the handler builds a fresh provider from each snapshot.
//! [`HandlerSettings`] is the serde form read from files and environment
//! variables.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// SQS API version understood by the handler
pub const DEFAULT_API_VERSION: &str = "2012-11-05";

/// Environment variable prefix, e.g. `SQS_HANDLER__REGION`
pub const ENV_PREFIX: &str = "SQS_HANDLER";

// ============================================================================
// Credentials
// ============================================================================

/// Static AWS credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

// ============================================================================
// Handler Configuration
// ============================================================================

/// Configuration snapshot used to build a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// SQS API version
    pub version: String,
    /// Static credentials; `None` defers to the environment
    pub credentials: Option<Credentials>,
    pub region: Option<String>,
    /// Default queue URL for every operation that does not name one
    pub endpoint: Option<String>,
    /// Per-operation timeout passed through to the transport
    pub timeout: Option<Duration>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_API_VERSION.to_string(),
            credentials: None,
            region: None,
            endpoint: None,
            timeout: None,
        }
    }
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check the snapshot is internally consistent
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.version.is_empty() {
            return Err(ConfigurationError::Invalid {
                message: "version cannot be empty".to_string(),
            });
        }

        if let Some(ref credentials) = self.credentials {
            if credentials.access_key_id.is_empty() {
                return Err(ConfigurationError::Missing {
                    key: "access_key_id".to_string(),
                });
            }
            if credentials.secret_access_key.is_empty() {
                return Err(ConfigurationError::Missing {
                    key: "secret_access_key".to_string(),
                });
            }
        }

        if self.region.as_deref() == Some("") {
            return Err(ConfigurationError::Invalid {
                message: "region cannot be empty".to_string(),
            });
        }

        if self.endpoint.as_deref() == Some("") {
            return Err(ConfigurationError::Invalid {
                message: "endpoint cannot be empty".to_string(),
            });
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigurationError::Invalid {
                message: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// External Settings
// ============================================================================

/// Handler settings as read from a configuration file or the environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerSettings {
    pub version: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub timeout_seconds: Option<f64>,
}

impl HandlerSettings {
    /// Load settings from an optional file overlaid with `SQS_HANDLER__*` variables
    ///
    /// The file format is taken from its extension (TOML, YAML or JSON).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigurationError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(text, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

impl TryFrom<HandlerSettings> for HandlerConfig {
    type Error = ConfigurationError;

    fn try_from(settings: HandlerSettings) -> Result<Self, Self::Error> {
        let credentials = match (settings.access_key_id, settings.secret_access_key) {
            (Some(key), Some(secret)) => Some(Credentials::new(key, secret, settings.session_token)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigurationError::Missing {
                    key: "secret_access_key".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigurationError::Missing {
                    key: "access_key_id".to_string(),
                })
            }
        };

        let timeout = match settings.timeout_seconds {
            Some(seconds) => Some(Duration::try_from_secs_f64(seconds).map_err(|e| {
                ConfigurationError::Invalid {
                    message: format!("timeout_seconds: {}", e),
                }
            })?),
            None => None,
        };

        let config = HandlerConfig {
            version: settings
                .version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            credentials,
            region: settings.region,
            endpoint: settings.endpoint,
            timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
