use std::path::Path;

use serde::de::Error as SerdeDeError;

use super::{ConfigError, CreateConfig};

/// Read and parse a creation config. Validation is left to [`CreateConfig::validate`].
pub fn load_create_config(path: &Path) -> Result<CreateConfig, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source: SerdeDeError::custom(source),
    })?;
    parse_create_config(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_create_config(text: &str) -> Result<CreateConfig, toml::de::Error> {
    toml::from_str(text)
}
