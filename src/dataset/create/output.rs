use std::path::PathBuf;

use tracing::info;

use super::CreateInput;
use crate::dataset::DatasetError;
use crate::interaction::Interaction;
use crate::store::{ArtifactKind, ImagesetStore};

/// What to do with a finished dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutput {
    pub dataset_name: String,
    pub dataset_root: PathBuf,
    pub upload: bool,
    pub delete_local: bool,
}

impl CreateOutput {
    /// Take `upload` / `delete_local` from the config, asking for any that are
    /// unset.
    pub fn decide(input: &CreateInput, oracle: &mut dyn Interaction) -> Result<Self, DatasetError> {
        let upload = match input.config.upload {
            Some(upload) => upload,
            None => oracle.confirm("Would you like to upload the dataset?", false)?,
        };
        let delete_local = match input.config.delete_local {
            Some(delete) => delete,
            None => oracle.confirm("Would you like to delete the local copy?", false)?,
        };
        Ok(Self {
            dataset_name: input.dataset_name.clone(),
            dataset_root: input.dataset_root(),
            upload,
            delete_local,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    pub uploaded: bool,
    /// Local dataset root, unless it was deleted.
    pub local_path: Option<PathBuf>,
}

/// Upload and/or delete the local copy as decided.
pub fn process_result(
    output: &CreateOutput,
    store: &dyn ImagesetStore,
) -> Result<ProcessedResult, DatasetError> {
    if output.upload {
        store.upload(ArtifactKind::Dataset, &output.dataset_name, &output.dataset_root)?;
        info!(dataset = %output.dataset_name, "Uploaded dataset");
    }
    if output.delete_local {
        std::fs::remove_dir_all(&output.dataset_root)
            .map_err(DatasetError::io(&output.dataset_root))?;
        info!(path = %output.dataset_root.display(), "Deleted local dataset");
    }
    Ok(ProcessedResult {
        uploaded: output.upload,
        local_path: (!output.delete_local).then(|| output.dataset_root.clone()),
    })
}
