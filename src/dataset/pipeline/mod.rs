//! Ordered dataset assembly: discover, filter, materialize, construct, write,
//! metadata, extras.
//!
//! [`DatasetPipeline`] is the fixed orchestrator. A [`DatasetPlugin`] supplies
//! the stage bodies and the [`StageRegistry`] decides which wrapper each body
//! runs inside.

pub mod defaults;
mod plugin;
mod state;


use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use plugin::DatasetPlugin;
pub use state::{AssemblyState, AssociatedFiles, FileAssociation};

use super::stages::{Stage, StageObserver, StageRegistry, TracingObserver};
use super::create::CreateInput;
use super::{ConstructedObject, DatasetError, DatasetMetadata};
use crate::interaction::Interaction;

/// Held-out split directory under the dataset root.
pub const TEST_DIR: &str = "test";
pub const SPLITS_DIR: &str = "splits";
/// Dev split directory under [`SPLITS_DIR`].
pub const COMPLETE_DIR: &str = "complete";
/// File association used to discover records.
pub const METADATA_ASSOCIATION: &str = "metadata";
/// Only JSON record metadata is understood.
pub const SUPPORTED_METADATA_SUFFIX: &str = ".json";
/// Tag given to records whose metadata lists none.
pub const UNTAGGED: &str = "untagged";
pub const DEFAULT_COPY_THREADS: usize = 4;

/// Object counts per output directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// `test/`
    pub test: usize,
    /// `splits/complete/train/`
    pub dev_train: usize,
    /// `splits/complete/test/`
    pub dev_test: usize,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub dataset_root: PathBuf,
    pub metadata_path: PathBuf,
    pub discovered: usize,
    pub selected: usize,
    pub split: SplitSummary,
}

pub struct DatasetPipeline<P: DatasetPlugin> {
    plugin: P,
    registry: StageRegistry,
    observer: Arc<dyn StageObserver>,
}

impl<P: DatasetPlugin> DatasetPipeline<P> {
    /// Announced default wrappers, adjusted by the plugin.
    pub fn new(plugin: P) -> Self {
        let mut registry = StageRegistry::announced();
        plugin.configure_stages(&mut registry);
        Self {
            plugin,
            registry,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn into_plugin(self) -> P {
        self.plugin
    }

    /// Run every stage in order, stopping at the first failure.
    ///
    /// A `metadata.json` left by an earlier run is removed before writing
    /// starts, and the new one is removed again if the extras stage fails, so
    /// a failed run never leaves a dataset root that looks complete.
    pub fn run(
        &mut self,
        state: &mut AssemblyState,
        oracle: &mut dyn Interaction,
    ) -> Result<PipelineReport, DatasetError> {
        let registry = &self.registry;
        let observer = self.observer.as_ref();
        let plugin = &mut self.plugin;
        if state.training_type.is_empty() {
            state.training_type = plugin.training_type().to_string();
        }

        registry.dispatch(Stage::Discover, observer, || plugin.load_image_ids(state))?;
        registry.dispatch(Stage::Filter, observer, || {
            plugin.interactive_filter(state, oracle)
        })?;
        if state.selection.is_empty() {
            return Err(DatasetError::EmptyDataset {
                stage: Stage::Materialize,
            });
        }

        registry.dispatch(Stage::Materialize, observer, || plugin.load_data(state))?;
        let objects = registry.dispatch(Stage::Construct, observer, || {
            plugin
                .construct_all(state)
                .map_err(|err| DatasetError::stage(Stage::Construct, err))
        })?;
        if objects.is_empty() {
            return Err(DatasetError::EmptyDataset { stage: Stage::Write });
        }
        check_object_ids(state, &objects)?;

        let split = registry.dispatch(Stage::Write, observer, || {
            if DatasetMetadata::remove(&state.dataset_root)? {
                debug!(root = %state.dataset_root.display(), "Removed metadata of previous run");
            }
            plugin.write_dataset(state, objects)
        })?;
        let metadata_path =
            registry.dispatch(Stage::Metadata, observer, || plugin.write_metadata(state))?;
        let extras = registry.dispatch(Stage::Extras, observer, || {
            plugin
                .write_additional_files(state)
                .map_err(|err| DatasetError::stage(Stage::Extras, err))
        });
        if let Err(err) = extras {
            if let Err(remove_err) = DatasetMetadata::remove(&state.dataset_root) {
                warn!(
                    path = %metadata_path.display(),
                    "Failed to remove metadata after failure: {remove_err}"
                );
            }
            return Err(err);
        }

        info!(
            dataset = %state.dataset_name,
            root = %state.dataset_root.display(),
            "Dataset written"
        );
        Ok(PipelineReport {
            dataset_root: state.dataset_root.clone(),
            metadata_path,
            discovered: state.tags.len(),
            selected: state.selection.image_ids.len(),
            split,
        })
    }
}

/// Build the run state for `input` and execute `plugin` over it.
pub fn assemble<P: DatasetPlugin>(
    plugin: P,
    input: &CreateInput,
    oracle: &mut dyn Interaction,
) -> Result<PipelineReport, DatasetError> {
    let mut state = AssemblyState::from_input(input, plugin.associated_files()?)?;
    DatasetPipeline::new(plugin).run(&mut state, oracle)
}

fn check_object_ids<O: ConstructedObject>(
    state: &AssemblyState,
    objects: &[O],
) -> Result<(), DatasetError> {
    let selected: HashSet<&str> = state
        .selection
        .image_ids
        .iter()
        .map(|record| record.record_id())
        .collect();
    match objects.iter().find(|object| !selected.contains(object.image_id())) {
        Some(object) => Err(DatasetError::stage(
            Stage::Construct,
            format!("object references unselected record {:?}", object.image_id()),
        )),
        None => Ok(()),
    }
}
