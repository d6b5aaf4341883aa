//! Named imageset and dataset storage.
//!
//! The pipeline only needs to list names, fetch an imageset to a local
//! directory, and hand a finished dataset back. [`LocalDirStore`] keeps both
//! kinds in plain folders, which is also what the tests use.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Kind of artifact held by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Imageset,
    Dataset,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Imageset => "imagesets",
            ArtifactKind::Dataset => "datasets",
        }
    }
}

/// Errors returned by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {kind} named {name:?}")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Remote-style lookup of named artifacts.
pub trait ImagesetStore {
    /// Names available for `kind`, sorted.
    fn list_available(&self, kind: ArtifactKind) -> Result<Vec<String>, StoreError>;

    /// Make `name` available locally and return its directory.
    fn fetch(&self, kind: ArtifactKind, name: &str) -> Result<PathBuf, StoreError>;

    /// Publish a local directory under `name`.
    fn upload(&self, kind: ArtifactKind, name: &str, local_path: &Path) -> Result<(), StoreError>;
}

/// Store backed by `<root>/imagesets/<name>` and `<root>/datasets/<name>`.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.as_str())
    }
}

impl ImagesetStore for LocalDirStore {
    fn list_available(&self, kind: ArtifactKind) -> Result<Vec<String>, StoreError> {
        let dir = self.kind_dir(kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn fetch(&self, kind: ArtifactKind, name: &str) -> Result<PathBuf, StoreError> {
        let path = self.kind_dir(kind).join(name);
        if !path.is_dir() {
            return Err(StoreError::NotFound {
                kind: kind.as_str(),
                name: name.to_string(),
            });
        }
        Ok(path)
    }

    fn upload(&self, kind: ArtifactKind, name: &str, local_path: &Path) -> Result<(), StoreError> {
        let dest = self.kind_dir(kind).join(name);
        if dest.exists() {
            return Err(StoreError::AlreadyExists {
                kind: kind.as_str(),
                name: name.to_string(),
            });
        }
        copy_tree(local_path, &dest)?;
        info!("Uploaded {} to {}", local_path.display(), dest.display());
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dest).map_err(io_err(dest))?;
    for entry in fs::read_dir(src).map_err(io_err(src))? {
        let entry = entry.map_err(io_err(src))?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_tree(&path, &target)?;
        } else {
            fs::copy(&path, &target).map_err(io_err(&path))?;
        }
    }
    Ok(())
}
