use anyhow::{bail, Context, Result};
use std::path::Path;

/// Maximum size for a config file (1 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;

/// Parse a JSON5 configuration string.
pub fn parse_config_json5(content: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = json5::from_str(content)?;
    Ok(value)
}

/// Read a configuration file into a JSON value, picking the format from the
/// extension.
///
/// Security checks:
/// - File size guardrail (`MAX_CONFIG_FILE_BYTES`)
/// - Symlinks at the final path component are rejected on Unix
pub fn read_config_file(path: &Path) -> Result<serde_json::Value> {
    let metadata = std::fs::symlink_metadata(path)
        .with_context(|| format!("Cannot stat config file '{}'", path.display()))?;

    #[cfg(unix)]
    if metadata.file_type().is_symlink() {
        bail!(
            "Config file '{}' is a symlink, refusing to follow",
            path.display()
        );
    }

    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        bail!(
            "Config file '{}' is {} bytes, exceeds limit of {} bytes",
            path.display(),
            metadata.len(),
            MAX_CONFIG_FILE_BYTES,
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let value = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in '{}'", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in '{}'", path.display()))?,
        _ => parse_config_json5(&content)
            .with_context(|| format!("Invalid JSON5 in '{}'", path.display()))?,
    };

    Ok(value)
}

/// Write configuration to a JSON file.
pub fn write_config_file(path: &Path, config: &serde_json::Value) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn read_json5_config() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bundlewarden.json");
        fs::write(
            &file,
            "{\n  // comments allowed\n  providers: {command: {timeoutSecs: 5,}},\n}",
        )
        .unwrap();

        let config = read_config_file(&file).unwrap();
        assert_eq!(config["providers"]["command"]["timeoutSecs"], 5);
    }

    #[test]
    fn read_yaml_config() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bundlewarden.yaml");
        fs::write(&file, "logging:\n  level: debug\n").unwrap();

        let config = read_config_file(&file).unwrap();
        assert_eq!(config["logging"]["level"], "debug");
    }

    #[test]
    fn read_toml_config() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bundlewarden.toml");
        fs::write(&file, "[providers.path]\nbaseDir = \"/etc/secrets\"\n").unwrap();

        let config = read_config_file(&file).unwrap();
        assert_eq!(config["providers"]["path"]["baseDir"], "/etc/secrets");
    }

    #[test]
    fn reject_oversized_config() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("huge.json");
        let content = "x".repeat((MAX_CONFIG_FILE_BYTES + 1) as usize);
        fs::write(&file, content).unwrap();

        let result = read_config_file(&file);
        assert!(result.unwrap_err().to_string().contains("exceeds limit"));
    }

    #[cfg(unix)]
    #[test]
    fn reject_symlinked_config() {
        let dir = TempDir::new().unwrap();
        let real_file = dir.path().join("real.json");
        let symlink = dir.path().join("link.json");
        fs::write(&real_file, "{}").unwrap();
        std::os::unix::fs::symlink(&real_file, &symlink).unwrap();

        let result = read_config_file(&symlink);
        assert!(result.unwrap_err().to_string().contains("symlink"));
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("out.json");
        write_config_file(&file, &serde_json::json!({"logging": {"json": true}})).unwrap();

        let config = read_config_file(&file).unwrap();
        assert_eq!(config["logging"]["json"], true);
    }
}
