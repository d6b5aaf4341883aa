use std::path::PathBuf;

use thiserror::Error;

use super::stages::Stage;
use crate::config::ConfigError;
use crate::interaction::InteractionError;
use crate::local_cache::CacheError;
use crate::store::StoreError;

/// Error type returned by plugin-supplied stage hooks.
pub type PluginError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while creating a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A required configuration value is missing or out of range.
    #[error("invalid configuration for `{field}`: {reason}")]
    Configuration { field: String, reason: String },
    /// Record metadata files use a suffix the discover stage cannot parse.
    #[error("unsupported record metadata format {suffix:?}; only \".json\" is supported")]
    UnsupportedMetadataFormat { suffix: String },
    /// Nothing is left to work with when `stage` is about to start.
    #[error("no records selected before the {stage} stage")]
    EmptyDataset { stage: Stage },
    /// A plugin hook failed.
    #[error("{stage} stage failed: {source}")]
    StageExecution { stage: Stage, source: PluginError },
    /// A stage wrapper did not run its body exactly once.
    #[error("{stage} stage wrapper {reason}")]
    WrapperMisuse { stage: Stage, reason: &'static str },
    /// Writing dataset output failed.
    #[error("failed to write {path}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A record metadata file is not valid JSON.
    #[error("invalid record metadata in {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Two selected records share an id and would overwrite each other in scratch.
    #[error("record id {record_id:?} is selected from more than one imageset")]
    DuplicateRecord { record_id: String },
    /// The user declined to continue.
    #[error("dataset creation cancelled")]
    Cancelled,
    #[error(transparent)]
    Interaction(InteractionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl DatasetError {
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn stage(stage: Stage, source: impl Into<PluginError>) -> Self {
        Self::StageExecution {
            stage,
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Persistence { path, source }
    }
}

impl From<InteractionError> for DatasetError {
    fn from(error: InteractionError) -> Self {
        match error {
            InteractionError::Unavailable { message } => Self::Configuration {
                field: "prompt".to_string(),
                reason: format!("config does not answer {message:?}"),
            },
            other => Self::Interaction(other),
        }
    }
}

impl From<ConfigError> for DatasetError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Invalid { field, reason } => Self::Configuration { field, reason },
            other => Self::Configuration {
                field: "config".to_string(),
                reason: other.to_string(),
            },
        }
    }
}
