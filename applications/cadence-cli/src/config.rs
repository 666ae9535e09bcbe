/// CLI configuration
use crate::error::{CliError, Result};
use cadence_playback::{BackendKind, EngineConfig};
use cadence_service::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Default configuration file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub backend: BackendSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,

    /// Base URL of the caching proxy for remote tracks
    #[serde(default)]
    pub cache_proxy: Option<String>,
}

impl BackendSettings {
    pub fn cache_proxy_url(&self) -> Result<Option<Url>> {
        self.cache_proxy
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    CliError::Config(format!("Invalid cache proxy URL {:?}: {}", raw, e))
                })
            })
            .transpose()
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            cache_proxy: None,
        }
    }
}

fn default_backend_kind() -> BackendKind {
    BackendKind::LocalDecode
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// `path` overrides the default `cadence.toml`. An explicit path must
    /// exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        // Override with environment variables, e.g. CADENCE_ENGINE__LOAD_TIMEOUT_MS
        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.engine.initial_volume) {
            return Err(CliError::Config(format!(
                "engine.initial_volume must be within 0.0-1.0, got {}",
                self.engine.initial_volume
            )));
        }

        if self.service.command_buffer == 0 {
            return Err(CliError::Config(
                "service.command_buffer must be at least 1".to_string(),
            ));
        }

        if self.service.progress_interval_ms == 0 {
            return Err(CliError::Config(
                "service.progress_interval_ms must be at least 1".to_string(),
            ));
        }

        self.backend.cache_proxy_url()?;

        Ok(())
    }
}
