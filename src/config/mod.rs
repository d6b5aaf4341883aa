//! Dataset-creation configuration loaded from TOML.

mod load;
mod types;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use thiserror::Error;

pub use load::{load_create_config, parse_create_config};
pub use types::{CreateConfig, FilterConfig, MetadataConfig, is_valid_dataset_name};

/// Errors surfaced while reading or validating a creation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
