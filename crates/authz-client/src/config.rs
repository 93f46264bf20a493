//! Oracle connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credentials::ClientCredentials;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleBackend {
    /// Process-local tuple store.
    #[default]
    Memory,
    /// OpenFGA-compatible HTTP API.
    Http,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleSettings {
    #[serde(default)]
    pub backend: OracleBackend,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub authorization_model_id: Option<String>,
    #[serde(default = "default_check_timeout")]
    pub check_timeout: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default)]
    pub credentials: Option<ClientCredentials>,
}

fn default_check_timeout() -> String {
    "2s".to_string()
}

fn default_request_timeout() -> String {
    "10s".to_string()
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            backend: OracleBackend::default(),
            api_url: None,
            store_id: None,
            authorization_model_id: None,
            check_timeout: default_check_timeout(),
            request_timeout: default_request_timeout(),
            credentials: None,
        }
    }
}

/// Errors raised while validating oracle settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration for {field}: {value}")]
    InvalidDuration { field: &'static str, value: String },
    #[error("oracle.{0} is required for the http backend")]
    Missing(&'static str),
    #[error("failed to build oracle transport: {0}")]
    Transport(#[from] crate::OracleError),
}

impl OracleSettings {
    pub fn check_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("check_timeout", &self.check_timeout)
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("request_timeout", &self.request_timeout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_timeout()?;
        self.request_timeout()?;
        if self.backend == OracleBackend::Http {
            if self.api_url.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Missing("api_url"));
            }
            if self.store_id.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Missing("store_id"));
            }
        }
        Ok(())
    }
}

fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|_| ConfigError::InvalidDuration {
        field,
        value: raw.to_string(),
    })
}
