//! Scoped reads of template bodies.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::MailError;

/// Reads a template body to completion.
#[async_trait]
pub trait TemplateLoader: Send + Sync {
    /// Read the whole file at `path`.
    async fn load(&self, path: &Path) -> Result<Vec<u8>, MailError>;
}

/// Loads templates from the local filesystem.
///
/// Relative paths are resolved against the optional root directory, or the
/// process working directory when no root is set.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    root: Option<PathBuf>,
}

impl FsLoader {
    /// Create a loader resolving relative paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader resolving relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl TemplateLoader for FsLoader {
    async fn load(&self, path: &Path) -> Result<Vec<u8>, MailError> {
        let full = self.resolve(path);
        tracing::debug!(path = %full.display(), "Reading template file");

        tokio::fs::read(&full).await.map_err(|e| MailError::TemplateLoad {
            path: full.display().to_string(),
            message: if e.kind() == std::io::ErrorKind::NotFound {
                "file not found".to_string()
            } else {
                e.to_string()
            },
        })
    }
}
