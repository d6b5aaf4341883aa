use std::path::{Path, PathBuf};

use super::{AssemblyState, AssociatedFiles, SplitSummary, defaults};
use crate::dataset::split::SplitKind;
use crate::dataset::stages::StageRegistry;
use crate::dataset::{ConstructedObject, DatasetError, PluginError};
use crate::interaction::Interaction;

/// Stage implementations a dataset plugin provides to [`super::DatasetPipeline`].
///
/// Only `construct_all` and `write_data` have no default. Every other stage
/// falls back to the shared implementation in this module's parent; a plugin
/// that overrides one still runs inside whatever wrapper the registry holds for
/// that stage.
pub trait DatasetPlugin {
    type Object: ConstructedObject;

    /// Recorded as `training_type` in metadata.
    fn training_type(&self) -> &str;

    /// Per-record files this plugin needs copied.
    fn associated_files(&self) -> Result<AssociatedFiles, DatasetError>;

    /// Adjust stage wrappers before the run. The announced defaults are kept
    /// unless replaced here.
    fn configure_stages(&self, _registry: &mut StageRegistry) {}

    fn load_image_ids(&mut self, state: &mut AssemblyState) -> Result<(), DatasetError> {
        defaults::discover(state)
    }

    fn interactive_filter(
        &mut self,
        state: &mut AssemblyState,
        oracle: &mut dyn Interaction,
    ) -> Result<(), DatasetError> {
        defaults::filter(state, oracle)
    }

    fn load_data(&mut self, state: &AssemblyState) -> Result<(), DatasetError> {
        defaults::materialize(state)
    }

    /// Build objects from the scratch directory. Every object must name a
    /// selected record.
    fn construct_all(&mut self, state: &AssemblyState) -> Result<Vec<Self::Object>, PluginError>;

    fn write_dataset(
        &mut self,
        state: &AssemblyState,
        objects: Vec<Self::Object>,
    ) -> Result<SplitSummary, DatasetError> {
        defaults::write_dataset(self, state, objects)
    }

    /// Write one leaf split into `path`, which already exists and is empty.
    fn write_data(
        &mut self,
        state: &AssemblyState,
        objects: &[Self::Object],
        path: &Path,
        split: SplitKind,
    ) -> Result<(), PluginError>;

    fn write_metadata(&mut self, state: &AssemblyState) -> Result<PathBuf, DatasetError> {
        defaults::write_metadata(state)
    }

    fn write_additional_files(&mut self, _state: &AssemblyState) -> Result<(), PluginError> {
        Ok(())
    }
}
