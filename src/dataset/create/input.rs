use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::app_dirs::expand_home;
use crate::config::{CreateConfig, is_valid_dataset_name};
use crate::dataset::DatasetError;
use crate::dataset::metadata::utc_timestamp;
use crate::interaction::Interaction;
use crate::local_cache::LocalCache;
use crate::store::{ArtifactKind, ImagesetStore};

/// Cache subpath holding datasets when no `dataset_path` is configured.
pub const CACHE_DATASET_SUBPATH: &str = "temp";
/// Cache subpath used as the materialize stage's scratch directory.
pub const CACHE_SCRATCH_SUBPATH: &str = "scratch";

/// Validated, fully answered creation context for one run.
#[derive(Debug, Clone)]
pub struct CreateInput {
    pub config: CreateConfig,
    pub plugin_name: String,
    pub dataset_name: String,
    /// Parent of the dataset root.
    pub dataset_path: PathBuf,
    /// `true` when `dataset_path` lives in the plugin cache.
    pub in_cache: bool,
    pub imageset_names: Vec<String>,
    pub imageset_paths: Vec<PathBuf>,
    pub created_by: String,
    pub comments: String,
    pub date_started_at: String,
    pub scratch_dir: PathBuf,
    pub plugin_config: toml::Table,
}

impl CreateInput {
    /// Resolve everything the pipeline needs from `config`, asking `oracle`
    /// for whatever the config leaves out.
    ///
    /// Validation runs before anything touches disk; the dataset location is
    /// prepared last so a rejected answer never costs existing data.
    pub fn new(
        config: CreateConfig,
        plugin_name: &str,
        cache: &LocalCache,
        store: &dyn ImagesetStore,
        oracle: &mut dyn Interaction,
    ) -> Result<Self, DatasetError> {
        config.validate()?;
        let plugin_config = config
            .plugin
            .clone()
            .ok_or_else(|| DatasetError::configuration("plugin", "missing [plugin] table"))?;

        let dataset_name = resolve_dataset_name(&config, oracle)?;
        let (imageset_names, imageset_paths) = resolve_imagesets(&config, store, oracle)?;
        let created_by = answer_or_ask(
            config.metadata.created_by.as_deref(),
            "Please enter your first and last name:",
            oracle,
        )?;
        let comments = answer_or_ask(
            config.metadata.comments.as_deref(),
            "Please enter descriptive comments about this dataset:",
            oracle,
        )?;
        let (dataset_path, in_cache) = prepare_dataset_path(&config, cache, oracle)?;

        info!(
            dataset = %dataset_name,
            path = %dataset_path.display(),
            imagesets = imageset_names.len(),
            "Creation context ready"
        );
        Ok(Self {
            plugin_name: plugin_name.to_string(),
            dataset_name,
            dataset_path,
            in_cache,
            imageset_names,
            imageset_paths,
            created_by,
            comments,
            date_started_at: utc_timestamp(),
            scratch_dir: cache.subpath(CACHE_SCRATCH_SUBPATH),
            plugin_config,
            config,
        })
    }

    pub fn dataset_root(&self) -> PathBuf {
        self.dataset_path.join(&self.dataset_name)
    }
}

fn resolve_dataset_name(
    config: &CreateConfig,
    oracle: &mut dyn Interaction,
) -> Result<String, DatasetError> {
    let name = match &config.dataset_name {
        Some(name) => name.clone(),
        None => oracle
            .text("Please enter a name for this dataset:", None)?
            .trim()
            .to_string(),
    };
    if !is_valid_dataset_name(&name) {
        return Err(DatasetError::configuration(
            "dataset_name",
            format!("{name:?} is not a valid dataset name"),
        ));
    }
    Ok(name)
}

fn resolve_imagesets(
    config: &CreateConfig,
    store: &dyn ImagesetStore,
    oracle: &mut dyn Interaction,
) -> Result<(Vec<String>, Vec<PathBuf>), DatasetError> {
    let available = store.list_available(ArtifactKind::Imageset)?;
    let names = match &config.imageset {
        Some(names) => {
            if let Some(missing) = names.iter().find(|name| !available.contains(name)) {
                return Err(DatasetError::configuration(
                    "imageset",
                    format!("no such imageset {missing:?}"),
                ));
            }
            names.clone()
        }
        None => {
            if available.is_empty() {
                return Err(DatasetError::configuration("imageset", "no imagesets available"));
            }
            oracle.choose_many("Choose imageset:", &available)?
        }
    };
    if names.is_empty() {
        return Err(DatasetError::configuration("imageset", "no imageset selected"));
    }
    let paths = names
        .iter()
        .map(|name| store.fetch(ArtifactKind::Imageset, name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((names, paths))
}

fn answer_or_ask(
    configured: Option<&str>,
    question: &str,
    oracle: &mut dyn Interaction,
) -> Result<String, DatasetError> {
    match configured.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(value.to_string()),
        None => Ok(oracle.text(question, None)?.trim().to_string()),
    }
}

/// Cache `temp/` recreated empty, or the configured path cleared after
/// confirmation.
fn prepare_dataset_path(
    config: &CreateConfig,
    cache: &LocalCache,
    oracle: &mut dyn Interaction,
) -> Result<(PathBuf, bool), DatasetError> {
    let Some(configured) = &config.dataset_path else {
        cache.ensure_clean_subpath(CACHE_DATASET_SUBPATH)?;
        let path = cache.ensure_subpath_exists(CACHE_DATASET_SUBPATH)?;
        return Ok((path, true));
    };

    let path = expand_home(configured);
    if path.exists() && !path.is_dir() {
        return Err(DatasetError::configuration(
            "dataset_path",
            format!("{} is a file", path.display()),
        ));
    }
    if has_entries(&path)? {
        let overwrite = config.overwrite_local
            || oracle.confirm(
                "Local artifact storage location contains old data. Overwrite?",
                false,
            )?;
        if !overwrite {
            warn!(path = %path.display(), "Dataset creation cancelled");
            return Err(DatasetError::Cancelled);
        }
        fs::remove_dir_all(&path).map_err(DatasetError::io(&path))?;
    }
    fs::create_dir_all(&path).map_err(DatasetError::io(&path))?;
    Ok((path, false))
}

fn has_entries(path: &Path) -> Result<bool, DatasetError> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(DatasetError::io(path)(err)),
    }
}
