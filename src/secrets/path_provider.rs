//! File path source provider.

use super::types::{SourceKind, SourceProvider, SourceResolution};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Resolves `path` sources by reading file contents.
///
/// Relative paths are joined to `base_dir` when one is configured. A single
/// trailing newline is stripped so files written by editors resolve cleanly.
pub struct PathSourceProvider {
    base_dir: Option<PathBuf>,
}

impl PathSourceProvider {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    fn full_path(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl SourceProvider for PathSourceProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Path
    }

    fn name(&self) -> &str {
        "path"
    }

    async fn resolve(&self, locator: &str) -> SourceResolution {
        if locator.is_empty() {
            return SourceResolution::Failed("Empty path".to_string());
        }

        let path = self.full_path(locator);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value = contents
                    .strip_suffix('\n')
                    .map(|s| s.strip_suffix('\r').unwrap_or(s))
                    .unwrap_or(&contents);
                SourceResolution::Resolved(value.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                SourceResolution::NotFound(format!("File '{}' does not exist", path.display()))
            }
            Err(e) => {
                SourceResolution::Failed(format!("Failed to read '{}': {e}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn resolve_relative_to_base_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("kubeconfig"), "apiVersion: v1\n").unwrap();

        let provider = PathSourceProvider::new(Some(dir.path().to_path_buf()));
        let result = provider.resolve("kubeconfig").await;
        assert_eq!(result.value(), Some("apiVersion: v1"));
    }

    #[tokio::test]
    async fn resolve_absolute_path_ignores_base_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("token");
        std::fs::write(&file, "abc").unwrap();

        let provider = PathSourceProvider::new(Some(PathBuf::from("/nonexistent")));
        let result = provider.resolve(file.to_str().unwrap()).await;
        assert_eq!(result.value(), Some("abc"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let provider = PathSourceProvider::new(Some(dir.path().to_path_buf()));
        let result = provider.resolve("nope").await;
        assert!(matches!(result, SourceResolution::NotFound(_)));
    }

    #[tokio::test]
    async fn only_one_trailing_newline_is_stripped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("multi"), "line1\nline2\n\n").unwrap();
        let provider = PathSourceProvider::new(Some(dir.path().to_path_buf()));
        let result = provider.resolve("multi").await;
        assert_eq!(result.value(), Some("line1\nline2\n"));
    }
}
