mod defaults;
mod io;
mod types;
mod validation;

pub use defaults::*;
pub use io::*;
pub use types::*;
pub use validation::*;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Top-level bundlewarden configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load configuration from file, environment, and defaults.
    ///
    /// The merged result is validated; an invalid config is an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).or_else(find_config_file);

        let mut config = match config_path {
            Some(config_path) if config_path.exists() => {
                info!("Loading config from {}", config_path.display());
                load_config_file(&config_path)?
            }
            Some(config_path) => {
                anyhow::bail!("Config file '{}' does not exist", config_path.display())
            }
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        };

        // Apply environment variable overrides
        config.apply_env_overrides(|name| std::env::var(name).ok());

        validate_config_object(&config)?;
        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let value = serde_json::to_value(Config::default())?;
        write_config_file(Path::new(path), &value)
    }

    /// Apply `BUNDLEWARDEN_*` overrides read through `lookup`.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |suffix: &str| lookup(format!("{ENV_PREFIX}{suffix}").as_str());

        if let Some(level) = var("LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.logging.level = level,
                Err(e) => warn!("Ignoring {ENV_PREFIX}LOG_LEVEL: {e}"),
            }
        }

        if let Some(json) = var("LOG_JSON").and_then(|v| parse_flag(&v)) {
            self.logging.json = json;
        }

        if let Some(enabled) = var("ENV_PROVIDER").and_then(|v| parse_flag(&v)) {
            self.providers.env.enabled = enabled;
        }

        if let Some(enabled) = var("PATH_PROVIDER").and_then(|v| parse_flag(&v)) {
            self.providers.path.enabled = enabled;
        }

        if let Some(dir) = var("PATH_BASE_DIR") {
            self.providers.path.base_dir = Some(PathBuf::from(dir));
        }

        if let Some(enabled) = var("COMMAND_PROVIDER").and_then(|v| parse_flag(&v)) {
            self.providers.command.enabled = enabled;
        }

        if let Some(secs) = var("COMMAND_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.providers.command.timeout_secs = secs;
            }
        }

        if let Some(cwd) = var("COMMAND_CWD") {
            self.providers.command.cwd = Some(PathBuf::from(cwd));
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILE_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }

    // Check home directory
    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(USER_CONFIG_DIR).join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load configuration from a file path.
fn load_config_file(path: &Path) -> Result<Config> {
    let value = read_config_file(path)?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid configuration in '{}'", path.display()))
}
