//! Layered application settings.
//!
//! Precedence, lowest first: built-in defaults, the YAML file, `REBAC__*`
//! environment variables, then the `FGA_*` variables understood by hosted
//! oracle deployments.

use std::env;
use std::net::SocketAddr;
use std::path::Path;

use ::config::{Config, Environment, File, FileFormat};
use rebac_authz_client::OracleSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_BASENAME: &str = "config/rebac";
pub const DEFAULT_SUBJECT_HEADER: &str = "x-authenticated-subject";

/// Client-credentials settings read from the hosted oracle's variables.
const FGA_CREDENTIAL_VARS: [(&str, &str); 4] = [
    ("oracle.credentials.client_id", "FGA_CLIENT_ID"),
    ("oracle.credentials.client_secret", "FGA_CLIENT_SECRET"),
    ("oracle.credentials.api_token_issuer", "FGA_API_TOKEN_ISSUER"),
    ("oracle.credentials.api_audience", "FGA_API_AUDIENCE"),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub server: ServerSettings,
    #[serde(default)]
    pub oracle: OracleSettings,
    pub identity: IdentitySettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentitySettings {
    /// Header an upstream identity proxy fills with the verified subject id.
    pub subject_header: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error(transparent)]
    Oracle(#[from] rebac_authz_client::ConfigError),
    #[error("invalid server.bind address '{0}'")]
    InvalidBind(String),
    #[error("invalid identity.subject_header '{0}'")]
    InvalidHeader(String),
}

impl AppSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.server
            .bind
            .parse()
            .map_err(|_| SettingsError::InvalidBind(self.server.bind.clone()))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.bind_addr()?;
        axum::http::HeaderName::try_from(self.identity.subject_header.as_str())
            .map_err(|_| SettingsError::InvalidHeader(self.identity.subject_header.clone()))?;
        self.oracle.validate()?;
        Ok(())
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(credentials) = copy.oracle.credentials.as_mut() {
            credentials.client_secret = "<redacted>".to_string();
        }
        copy
    }
}

/// Load settings from `path`, or from `config/rebac.{yaml,...}` when present.
pub fn load_settings(path: Option<&Path>) -> Result<AppSettings, SettingsError> {
    let mut builder = Config::builder()
        .set_default("server.bind", "127.0.0.1:3000")?
        .set_default("identity.subject_header", DEFAULT_SUBJECT_HEADER)?
        .set_default("logging.level", "info")?
        .set_default("oracle.backend", "memory")?;

    builder = match path {
        Some(path) => builder.add_source(File::from(path).format(FileFormat::Yaml).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false)),
    };

    builder = builder
        .add_source(
            Environment::with_prefix("REBAC")
                .prefix_separator("__")
                .separator("__"),
        )
        .set_override_option("oracle.api_url", env::var("FGA_API_URL").ok())?
        .set_override_option("oracle.store_id", env::var("FGA_STORE_ID").ok())?
        .set_override_option(
            "oracle.authorization_model_id",
            env::var("FGA_MODEL_ID").ok(),
        )?;
    for (key, var) in FGA_CREDENTIAL_VARS {
        builder = builder.set_override_option(key, env::var(var).ok())?;
    }

    let settings: AppSettings = builder.build()?.try_deserialize()?;

    settings.validate()?;
    Ok(settings)
}
