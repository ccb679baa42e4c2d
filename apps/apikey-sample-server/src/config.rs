//! Sample server configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. YAML file passed with `--config`
//! 3. `APIKEY_SAMPLE__*` environment variables, `__` separating nested keys
//!    (e.g. `APIKEY_SAMPLE__SERVER__BIND_ADDR=0.0.0.0:8080`)

use std::path::Path;
use std::time::Duration;

use aead_protector_plugin::AeadProtectorConfig;
use anyhow::Context;
use apikey_authn::{ApiKeyAuthConfig, ApiKeyGeneratorConfig, TokenSource};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use secrecy::ExposeSecret;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "APIKEY_SAMPLE__";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub protector: AeadProtectorConfig,
    pub auth: ApiKeyAuthConfig,
    pub generator: ApiKeyGeneratorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            protector: AeadProtectorConfig::default(),
            auth: ApiKeyAuthConfig {
                token_source: TokenSource::Bearer,
                success_ttl: Some(Duration::from_secs(10)),
                failure_ttl: Duration::from_secs(1),
                ..ApiKeyAuthConfig::default()
            },
            generator: ApiKeyGeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional YAML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, or the merged sources do
    /// not form a valid configuration.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            anyhow::ensure!(
                path.is_file(),
                "config file not found: {}",
                path.display()
            );
            figment = figment.merge(Yaml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate configuration from prepared sources.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Self = figment
            .extract()
            .context("failed to parse configuration")?;
        config
            .auth
            .validate()
            .context("invalid `auth` configuration")?;
        anyhow::ensure!(
            !config.generator.purpose.is_empty(),
            "generator purpose must not be empty"
        );
        Ok(config)
    }

    /// Whether no master key is configured, so a random one is generated at startup.
    #[must_use]
    pub fn uses_ephemeral_key(&self) -> bool {
        self.protector.master_key.expose_secret().is_empty()
    }

    /// Effective configuration as JSON, with the master key redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if a section cannot be serialized.
    pub fn to_redacted_json(&self) -> anyhow::Result<serde_json::Value> {
        let master_key = if self.uses_ephemeral_key() {
            "<ephemeral>"
        } else {
            "<redacted>"
        };
        let default_ttl =
            serde_json::to_value(humantime_serde::Serde::from(self.protector.default_ttl))?;
        Ok(serde_json::json!({
            "server": { "bind_addr": self.server.bind_addr },
            "logging": { "level": self.logging.level, "json": self.logging.json },
            "protector": {
                "master_key": master_key,
                "default_ttl": default_ttl,
            },
            "auth": serde_json::to_value(&self.auth)?,
            "generator": serde_json::to_value(&self.generator)?,
        }))
    }
}
