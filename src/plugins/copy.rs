//! Plugin that writes each split as plain file copies plus a JSON-lines index.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::pipeline::METADATA_ASSOCIATION;
use crate::dataset::pipeline::defaults::read_record_tags;
use crate::dataset::split::SplitKind;
use crate::dataset::{
    AssemblyState, AssociatedFiles, ConstructedObject, DatasetError, DatasetPlugin,
    FileAssociation, PluginError,
};

pub const PLUGIN_NAME: &str = "copy";
pub const INDEX_FILE_NAME: &str = "index.jsonl";
pub const LABELS_FILE_NAME: &str = "labels.txt";

/// `[plugin]` table understood by [`CopyPlugin`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CopyPluginConfig {
    pub metadata_prefix: String,
    pub metadata_suffix: String,
    /// Extra per-record files as `kind = [prefix, suffix]`.
    pub files: BTreeMap<String, (String, String)>,
}

impl Default for CopyPluginConfig {
    fn default() -> Self {
        Self {
            metadata_prefix: "meta_".to_string(),
            metadata_suffix: ".json".to_string(),
            files: BTreeMap::from([(
                "image".to_string(),
                ("image_".to_string(), ".png".to_string()),
            )]),
        }
    }
}

/// One selected record and its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRecord {
    pub image_id: String,
    pub tags: Vec<String>,
}

impl ConstructedObject for TaggedRecord {
    fn image_id(&self) -> &str {
        &self.image_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct CopyPlugin {
    config: CopyPluginConfig,
    labels: BTreeSet<String>,
}

impl CopyPlugin {
    pub fn new(config: CopyPluginConfig) -> Self {
        Self {
            config,
            labels: BTreeSet::new(),
        }
    }

    pub fn from_table(table: &toml::Table) -> Result<Self, DatasetError> {
        let config: CopyPluginConfig = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|err: toml::de::Error| {
                DatasetError::configuration("plugin", err.to_string())
            })?;
        if config.files.contains_key(METADATA_ASSOCIATION) {
            return Err(DatasetError::configuration(
                "plugin.files",
                "`metadata` is configured through metadata_prefix/metadata_suffix",
            ));
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &CopyPluginConfig {
        &self.config
    }
}

impl DatasetPlugin for CopyPlugin {
    type Object = TaggedRecord;

    fn training_type(&self) -> &str {
        PLUGIN_NAME
    }

    fn associated_files(&self) -> Result<AssociatedFiles, DatasetError> {
        let mut entries: BTreeMap<String, FileAssociation> = self
            .config
            .files
            .iter()
            .map(|(kind, (prefix, suffix))| (kind.clone(), FileAssociation::new(prefix, suffix)))
            .collect();
        entries.insert(
            METADATA_ASSOCIATION.to_string(),
            FileAssociation::new(&self.config.metadata_prefix, &self.config.metadata_suffix),
        );
        AssociatedFiles::new(entries)
    }

    fn construct_all(&mut self, state: &AssemblyState) -> Result<Vec<TaggedRecord>, PluginError> {
        self.labels.clear();
        let mut objects = Vec::with_capacity(state.selection.image_ids.len());
        for record in &state.selection.image_ids {
            let image_id = record.record_id().to_string();
            let path = state
                .scratch_file(METADATA_ASSOCIATION, &image_id)
                .ok_or("no metadata file association")?;
            let tags = read_record_tags(&path)?;
            self.labels.extend(tags.iter().cloned());
            objects.push(TaggedRecord { image_id, tags });
        }
        debug!(objects = objects.len(), labels = self.labels.len(), "Constructed records");
        Ok(objects)
    }

    fn write_data(
        &mut self,
        state: &AssemblyState,
        objects: &[TaggedRecord],
        path: &Path,
        split: SplitKind,
    ) -> Result<(), PluginError> {
        let index_path = path.join(INDEX_FILE_NAME);
        let mut index = BufWriter::new(File::create(&index_path)?);
        for object in objects {
            for (kind, assoc) in state.associated_files.iter() {
                let name = assoc.file_name(&object.image_id);
                let source = state.scratch_dir.join(&name);
                if !source.is_file() {
                    warn!(image_id = %object.image_id, kind, "Scratch file missing; skipped");
                    continue;
                }
                fs::copy(&source, path.join(&name))?;
            }
            serde_json::to_writer(&mut index, object)?;
            index.write_all(b"\n")?;
        }
        index.flush()?;
        debug!(split = split.as_str(), records = objects.len(), "Wrote split");
        Ok(())
    }

    fn write_additional_files(&mut self, state: &AssemblyState) -> Result<(), PluginError> {
        let mut text = String::new();
        for label in &self.labels {
            text.push_str(label);
            text.push('\n');
        }
        fs::write(state.dataset_root.join(LABELS_FILE_NAME), text)?;
        Ok(())
    }
}
