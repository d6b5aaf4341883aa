use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{DEFAULT_COPY_THREADS, METADATA_ASSOCIATION};
use crate::config::FilterConfig;
use crate::dataset::create::CreateInput;
use crate::dataset::filter::FilterResult;
use crate::dataset::split::{DEFAULT_TEST_PERCENT, validate_test_percent};
use crate::dataset::{DatasetError, TagMatrix};

/// File name pattern for one kind of per-record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAssociation {
    pub prefix: String,
    pub suffix: String,
}

impl FileAssociation {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn file_name(&self, record_id: &str) -> String {
        format!("{}{record_id}{}", self.prefix, self.suffix)
    }

    /// Record id encoded in `file_name`, if it follows this pattern.
    pub fn record_id<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Every file kind a plugin needs per record, keyed by file type.
///
/// The `metadata` entry is mandatory: it is how records are discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedFiles {
    entries: BTreeMap<String, FileAssociation>,
}

impl AssociatedFiles {
    pub fn new(entries: BTreeMap<String, FileAssociation>) -> Result<Self, DatasetError> {
        if !entries.contains_key(METADATA_ASSOCIATION) {
            return Err(DatasetError::configuration(
                "associated_files",
                "no `metadata` file association",
            ));
        }
        Ok(Self { entries })
    }

    pub fn from_pairs<K, P, S>(
        pairs: impl IntoIterator<Item = (K, (P, S))>,
    ) -> Result<Self, DatasetError>
    where
        K: Into<String>,
        P: Into<String>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(kind, (prefix, suffix))| (kind.into(), FileAssociation::new(prefix, suffix)))
                .collect(),
        )
    }

    pub fn metadata(&self) -> &FileAssociation {
        &self.entries[METADATA_ASSOCIATION]
    }

    pub fn get(&self, kind: &str) -> Option<&FileAssociation> {
        self.entries.get(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileAssociation)> {
        self.entries.iter().map(|(kind, assoc)| (kind.as_str(), assoc))
    }
}

/// Everything one pipeline run reads and fills in.
///
/// Built once before the run; discover fills `tags` and filter fills
/// `selection`. Paths are owned exclusively by this run.
#[derive(Debug, Clone)]
pub struct AssemblyState {
    pub dataset_name: String,
    /// `<dataset_path>/<dataset_name>`.
    pub dataset_root: PathBuf,
    /// Private working copy of the selected records.
    pub scratch_dir: PathBuf,
    pub imageset_paths: Vec<PathBuf>,
    pub associated_files: AssociatedFiles,
    pub created_by: String,
    pub comments: String,
    pub training_type: String,
    pub test_percent: f64,
    /// Written to metadata only when configured.
    pub recorded_test_percent: Option<f64>,
    pub kfolds: Option<u32>,
    pub filter: FilterConfig,
    pub copy_threads: usize,
    pub plugin_config: toml::Table,
    pub tags: TagMatrix,
    pub selection: FilterResult,
}

impl AssemblyState {
    /// Minimal state with defaults for everything but the paths.
    pub fn new(
        dataset_name: impl Into<String>,
        dataset_root: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        imageset_paths: Vec<PathBuf>,
        associated_files: AssociatedFiles,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            dataset_root: dataset_root.into(),
            scratch_dir: scratch_dir.into(),
            imageset_paths,
            associated_files,
            created_by: String::new(),
            comments: String::new(),
            training_type: String::new(),
            test_percent: DEFAULT_TEST_PERCENT,
            recorded_test_percent: None,
            kfolds: None,
            filter: FilterConfig::default(),
            copy_threads: DEFAULT_COPY_THREADS,
            plugin_config: toml::Table::new(),
            tags: TagMatrix::new(),
            selection: FilterResult::default(),
        }
    }

    /// State for a validated creation context.
    pub fn from_input(
        input: &CreateInput,
        associated_files: AssociatedFiles,
    ) -> Result<Self, DatasetError> {
        let config = &input.config;
        let mut state = Self::new(
            input.dataset_name.clone(),
            input.dataset_root(),
            input.scratch_dir.clone(),
            input.imageset_paths.clone(),
            associated_files,
        );
        state.created_by = input.created_by.clone();
        state.comments = input.comments.clone();
        state.training_type = input.plugin_name.clone();
        state.test_percent = validate_test_percent(config.effective_test_percent())?;
        state.recorded_test_percent = config.test_percent;
        state.kfolds = config.kfolds;
        state.filter = config.filter.clone();
        state.copy_threads = config.copy_threads.unwrap_or(DEFAULT_COPY_THREADS);
        state.plugin_config = input.plugin_config.clone();
        Ok(state)
    }

    pub fn with_test_percent(mut self, test_percent: f64) -> Result<Self, DatasetError> {
        self.test_percent = validate_test_percent(test_percent)?;
        self.recorded_test_percent = Some(test_percent);
        Ok(self)
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn scratch_file(&self, kind: &str, record_id: &str) -> Option<PathBuf> {
        self.associated_files
            .get(kind)
            .map(|assoc| self.scratch_dir.join(assoc.file_name(record_id)))
    }

    pub fn dataset_root(&self) -> &Path {
        &self.dataset_root
    }
}
