use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::dataset::DatasetError;
use crate::dataset::filter::{self, FilterSpec, GroupSpec};
use crate::dataset::split::DEFAULT_TEST_PERCENT;

static DATASET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("dataset name pattern must compile")
});

/// Dataset names become directory names and store keys.
pub fn is_valid_dataset_name(name: &str) -> bool {
    DATASET_NAME.is_match(name)
}

/// Parsed `create` configuration.
///
/// Every optional field that is absent is resolved through the interaction
/// oracle by [`crate::dataset::CreateInput`], except `test_percent` and
/// `kfolds` which simply fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateConfig {
    pub dataset_name: Option<String>,
    /// Keep the dataset at this path instead of the plugin cache.
    pub dataset_path: Option<PathBuf>,
    /// Replace an existing dataset at `dataset_path` without asking.
    pub overwrite_local: bool,
    /// Imageset names to draw records from.
    pub imageset: Option<Vec<String>>,
    /// Fraction held out at each split level; defaults to 0.2.
    pub test_percent: Option<f64>,
    /// Recorded in metadata only.
    pub kfolds: Option<u32>,
    pub upload: Option<bool>,
    pub delete_local: Option<bool>,
    /// Worker threads used while copying into scratch.
    pub copy_threads: Option<usize>,
    pub metadata: MetadataConfig,
    pub filter: FilterConfig,
    /// Plugin-owned settings, passed through untouched.
    pub plugin: Option<toml::Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub created_by: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Define groups through prompts instead of `groups`.
    pub interactive: bool,
    pub groups: Vec<GroupSpec>,
}

impl FilterConfig {
    pub fn spec(&self) -> FilterSpec {
        FilterSpec::new(self.groups.clone())
    }
}

impl CreateConfig {
    pub fn effective_test_percent(&self) -> f64 {
        self.test_percent.unwrap_or(DEFAULT_TEST_PERCENT)
    }

    /// Check every statically known constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(percent) = self.test_percent
            && !(0.0..=1.0).contains(&percent)
        {
            return Err(ConfigError::invalid(
                "test_percent",
                format!("{percent} is outside [0, 1]"),
            ));
        }
        if self.kfolds == Some(0) {
            return Err(ConfigError::invalid("kfolds", "must be at least 1"));
        }
        if self.copy_threads == Some(0) {
            return Err(ConfigError::invalid("copy_threads", "must be at least 1"));
        }
        if self.plugin.is_none() {
            return Err(ConfigError::invalid("plugin", "missing [plugin] table"));
        }
        if let Some(name) = &self.dataset_name
            && !is_valid_dataset_name(name)
        {
            return Err(ConfigError::invalid(
                "dataset_name",
                format!("{name:?} is not a valid dataset name"),
            ));
        }
        if let Some(imagesets) = &self.imageset
            && imagesets.is_empty()
        {
            return Err(ConfigError::invalid("imageset", "list is empty"));
        }
        self.validate_groups()
    }

    fn validate_groups(&self) -> Result<(), ConfigError> {
        match filter::validate_groups(&self.filter.groups) {
            Ok(()) => Ok(()),
            Err(DatasetError::Configuration { field, reason }) => {
                Err(ConfigError::Invalid { field, reason })
            }
            Err(other) => Err(ConfigError::invalid("filter.groups", other.to_string())),
        }
    }
}
