//! Scratch storage under the application root.
//!
//! Each plugin gets its own cache folder (`<app_root>/<plugin>`) holding the
//! default dataset output location and the private scratch directory used
//! while a dataset is assembled.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::app_dirs;

/// Errors raised while preparing cache directories.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to resolve cache root: {0}")]
    Root(#[from] app_dirs::AppDirError),
    #[error("Failed to create cache directory {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to clean cache directory {path}: {source}")]
    Clean {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A directory that owns named subpaths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    /// Cache rooted at an explicit directory. The directory is not created
    /// until a subpath is requested.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache for a plugin under the application root.
    pub fn for_plugin(plugin_name: &str) -> Result<Self, CacheError> {
        Ok(Self::new(app_dirs::app_root_dir()?.join(plugin_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subpath(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn subpath_exists(&self, name: &str) -> bool {
        self.subpath(name).exists()
    }

    /// Create `name` inside the cache if it is missing and return its path.
    pub fn ensure_subpath_exists(&self, name: &str) -> Result<PathBuf, CacheError> {
        let path = self.subpath(name);
        create_dir(&path)?;
        Ok(path)
    }

    /// Remove `name` and everything below it. Missing subpaths are fine.
    pub fn ensure_clean_subpath(&self, name: &str) -> Result<(), CacheError> {
        remove_tree(&self.subpath(name))
    }

    /// Remove the whole cache. Returns `false` when there was nothing to
    /// remove.
    pub fn clean(&self) -> Result<bool, CacheError> {
        if !self.exists() {
            return Ok(false);
        }
        remove_tree(&self.path)?;
        Ok(true)
    }

    /// Remove every entry of the cache except the names in `keep`. Returns the
    /// number of entries removed.
    pub fn clean_except(&self, keep: &[&str]) -> Result<usize, CacheError> {
        let entries = match std::fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(CacheError::Clean {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Clean {
                path: self.path.clone(),
                source,
            })?;
            if keep.iter().any(|name| entry.file_name() == *name) {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                remove_tree(&path)?;
            } else {
                std::fs::remove_file(&path).map_err(|source| CacheError::Clean { path, source })?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

fn create_dir(path: &Path) -> Result<(), CacheError> {
    std::fs::create_dir_all(path).map_err(|source| CacheError::Create {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_tree(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed cache path {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::Clean {
            path: path.to_path_buf(),
            source,
        }),
    }
}
