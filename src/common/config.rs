use anyhow::{anyhow, Result};
use axum::http::HeaderName;
use clap::Parser;

use crate::common::logging::LogLevel;

/// Process configuration. Every flag can also be given through the
/// environment variable named next to it.
#[derive(Parser, Debug, Clone)]
#[command(about = "HTTP access to the values of an OPC UA server")]
pub struct Settings {
    /// SQLite database file, `sqlite://` prefix accepted
    #[arg(long = "database-url", env = "DATABASE_URL", default_value = "opcua-web-access.db3")]
    pub database_url: String,

    #[arg(long = "api-key", env = "API_KEY", hide_env_values = true)]
    pub api_key: String,
    /// Request header carrying the api key
    #[arg(long = "api-key-name", env = "API_KEY_NAME", default_value = "X-API-Key")]
    pub api_key_name: String,

    /// Comma separated list, `*` allows every origin
    #[arg(long = "allowed-origins", env = "ALLOWED_ORIGINS", default_value = "")]
    pub allowed_origins: String,

    #[arg(long = "opc-url", env = "OPC_URL")]
    pub opc_url: String,
    #[arg(long = "opc-username", env = "OPC_USERNAME")]
    pub opc_username: Option<String>,
    #[arg(long = "opc-password", env = "OPC_PASSWORD", hide_env_values = true)]
    pub opc_password: Option<String>,
    #[arg(long = "opc-namespace", env = "OPC_NAMESPACE", default_value_t = 2)]
    pub opc_namespace: u16,

    #[arg(long = "api-port", env = "API_PORT", default_value_t = 8000)]
    pub api_port: u16,
    #[arg(long = "log-level", env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    #[arg(long = "log-file", env = "LOG_FILE", default_value = "")]
    pub log_file: String,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow!("API key can't be empty"));
        }

        HeaderName::try_from(self.api_key_name.as_str()).map_err(|_| {
            anyhow!(
                "\"{}\" is not a valid header name for the API key",
                self.api_key_name
            )
        })?;

        if !self.opc_url.starts_with("opc.tcp://") {
            return Err(anyhow!(
                "OPC UA endpoint must be an opc.tcp:// url, {} was provided",
                self.opc_url
            ));
        }

        if self.opc_password.is_some() && self.opc_username.is_none() {
            return Err(anyhow!("An OPC UA password was given without a username"));
        }

        Ok(())
    }

    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Path of the SQLite file behind `database_url`.
    pub fn database_path(&self) -> &str {
        self.database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))
            .unwrap_or(&self.database_url)
    }
}
