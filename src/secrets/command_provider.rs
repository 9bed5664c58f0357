//! External command source provider.
//!
//! Resolves `command` sources by executing the command and capturing stdout.
//! Arguments are split on whitespace and passed directly; no shell is
//! involved.

use super::types::{SourceKind, SourceProvider, SourceResolution};
use crate::config::{DEFAULT_COMMAND_MAX_OUTPUT_BYTES, DEFAULT_COMMAND_TIMEOUT_SECS};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

/// Resolves values by executing external commands.
pub struct CommandSourceProvider {
    /// Working directory for command execution.
    cwd: Option<PathBuf>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl CommandSourceProvider {
    pub fn new(cwd: Option<PathBuf>) -> Self {
        Self {
            cwd,
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_COMMAND_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }
}

#[async_trait]
impl SourceProvider for CommandSourceProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Command
    }

    fn name(&self) -> &str {
        "command"
    }

    async fn resolve(&self, locator: &str) -> SourceResolution {
        let parts: Vec<&str> = locator.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            return SourceResolution::Failed("Empty command".to_string());
        };

        if is_dangerous_command(program) {
            return SourceResolution::Failed(format!(
                "Command '{program}' is not allowed for value resolution"
            ));
        }

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        // Don't inherit stdin; interactive commands would hang.
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, cmd.output()).await;

        match result {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!(
                        "Source command '{}' failed with status {}: {}",
                        program,
                        output.status,
                        stderr.trim()
                    );
                    return SourceResolution::Failed(format!(
                        "Command exited with status {}: {}",
                        output.status,
                        stderr.trim()
                    ));
                }

                if output.stdout.len() > self.max_output_bytes {
                    return SourceResolution::Failed(format!(
                        "Command output exceeds {} bytes",
                        self.max_output_bytes
                    ));
                }

                let value = String::from_utf8_lossy(&output.stdout).trim().to_string();

                if value.is_empty() {
                    SourceResolution::NotFound(format!("Command '{program}' produced empty output"))
                } else {
                    SourceResolution::Resolved(value)
                }
            }
            Ok(Err(e)) => SourceResolution::Failed(format!("Failed to execute '{program}': {e}")),
            Err(_) => SourceResolution::Failed(format!(
                "Command '{}' timed out after {}s",
                program,
                self.timeout.as_secs()
            )),
        }
    }
}

/// Check if a command is too dangerous to run for value resolution.
fn is_dangerous_command(program: &str) -> bool {
    let basename = program.rsplit('/').next().unwrap_or(program);

    matches!(
        basename,
        "rm" | "rmdir"
            | "mkfs"
            | "dd"
            | "shutdown"
            | "reboot"
            | "halt"
            | "poweroff"
            | "kill"
            | "killall"
            | "pkill"
            | "format"
            | "fdisk"
            | "parted"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_echo_command() {
        let provider = CommandSourceProvider::new(None);
        let result = provider.resolve("echo hello-secret").await;
        assert!(result.is_resolved());
        assert_eq!(result.value(), Some("hello-secret"));
    }

    #[tokio::test]
    async fn resolve_failing_command() {
        let provider = CommandSourceProvider::new(None);
        let result = provider.resolve("false").await;
        assert!(!result.is_resolved());
    }

    #[tokio::test]
    async fn reject_dangerous_command() {
        let provider = CommandSourceProvider::new(None);
        let result = provider.resolve("rm -rf /").await;
        assert!(!result.is_resolved());
        assert!(result.error_message().unwrap().contains("not allowed"));
    }

    #[tokio::test]
    async fn empty_command_fails() {
        let provider = CommandSourceProvider::new(None);
        let result = provider.resolve("   ").await;
        assert!(matches!(result, SourceResolution::Failed(_)));
    }

    #[tokio::test]
    async fn empty_output_is_not_found() {
        let provider = CommandSourceProvider::new(None);
        let result = provider.resolve("true").await;
        assert!(matches!(result, SourceResolution::NotFound(_)));
    }

    #[tokio::test]
    async fn output_cap_is_enforced() {
        let provider = CommandSourceProvider::new(None).with_max_output_bytes(4);
        let result = provider.resolve("echo too-long-for-the-cap").await;
        assert!(result.error_message().unwrap().contains("exceeds"));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let provider =
            CommandSourceProvider::new(None).with_timeout(Duration::from_millis(100));
        let result = provider.resolve("sleep 5").await;
        assert!(result.error_message().unwrap().contains("timed out"));
    }

    #[test]
    fn dangerous_command_detection() {
        assert!(is_dangerous_command("rm"));
        assert!(is_dangerous_command("/bin/rm"));
        assert!(is_dangerous_command("kill"));
        assert!(!is_dangerous_command("echo"));
        assert!(!is_dangerous_command("vault"));
        assert!(!is_dangerous_command("aws"));
    }
}
