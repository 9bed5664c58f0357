use super::Config;
use anyhow::Result;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    let command = &config.providers.command;

    if command.enabled {
        if command.timeout_secs == 0 {
            errors.push(ConfigValidationError {
                path: "providers.command.timeoutSecs".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            });
        }

        if command.max_output_bytes == 0 {
            errors.push(ConfigValidationError {
                path: "providers.command.maxOutputBytes".to_string(),
                message: "Output limit must be greater than 0".to_string(),
            });
        }

        if let Some(cwd) = &command.cwd {
            if !cwd.is_dir() {
                errors.push(ConfigValidationError {
                    path: "providers.command.cwd".to_string(),
                    message: format!("'{}' is not a directory", cwd.display()),
                });
            }
        }
    }

    if config.providers.path.enabled {
        match &config.providers.path.base_dir {
            Some(dir) if !dir.is_absolute() => {
                errors.push(ConfigValidationError {
                    path: "providers.path.baseDir".to_string(),
                    message: format!("'{}' must be an absolute path", dir.display()),
                });
            }
            Some(dir) if !dir.is_dir() => {
                warn!(
                    "Path provider base directory '{}' does not exist",
                    dir.display()
                );
            }
            _ => {}
        }
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}
