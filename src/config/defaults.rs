/// Default configuration constants used across the crate.

/// Default timeout for command sources.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Default stdout cap for command sources (1 MiB).
pub const DEFAULT_COMMAND_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Default tracing directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "bundlewarden=info";

/// Config file names searched in the working directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "bundlewarden.json",
    "bundlewarden.yaml",
    "bundlewarden.yml",
    "bundlewarden.toml",
];

/// Per-user config directory under the home directory.
pub const USER_CONFIG_DIR: &str = ".bundlewarden";

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "BUNDLEWARDEN_";
