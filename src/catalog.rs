//! Read-only views over a store: per-artifact metadata and detailed listings.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::dataset::split::SplitKind;
use crate::dataset::{Dataset, DatasetMetadata, SplitSummary};
use crate::store::{ArtifactKind, ImagesetStore, StoreError};

/// Fields too large to print in summaries.
pub const EXCLUDED_FIELDS: &[&str] = &["filters", "transforms", "image_ids"];
/// Set-wide metadata file at the top of an imageset.
pub const IMAGESET_METADATA_FILE: &str = "metadata.json";
pub const DETAIL_SEPARATOR: &str = "----------";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{kind} {name:?} has no metadata")]
    MissingMetadata { kind: &'static str, name: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid metadata in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("metadata in {path} is not a JSON object")]
    NotAnObject { path: PathBuf },
}

/// Top-level metadata fields of one imageset or dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactMetadata {
    pub name: String,
    pub fields: Map<String, Value>,
    /// The imageset has no set-wide file; `fields` come from its first record.
    pub from_sample: bool,
}

impl ArtifactMetadata {
    /// One `KEY value` line per field, skipping [`EXCLUDED_FIELDS`].
    pub fn describe(&self) -> String {
        let mut text = String::new();
        for (key, value) in &self.fields {
            if EXCLUDED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            text.push_str(&format!("{} {value}\n", key.to_uppercase()));
        }
        text
    }
}

/// Set-wide metadata of `name`, falling back to its first record file.
pub fn imageset_metadata(
    store: &dyn ImagesetStore,
    name: &str,
) -> Result<ArtifactMetadata, CatalogError> {
    let dir = store.fetch(ArtifactKind::Imageset, name)?;
    let set_wide = dir.join(IMAGESET_METADATA_FILE);
    if set_wide.is_file() {
        return Ok(ArtifactMetadata {
            name: name.to_string(),
            fields: read_object(&set_wide)?,
            from_sample: false,
        });
    }
    let sample = first_json_file(&dir)?.ok_or_else(|| CatalogError::MissingMetadata {
        kind: ArtifactKind::Imageset.as_str(),
        name: name.to_string(),
    })?;
    Ok(ArtifactMetadata {
        name: name.to_string(),
        fields: read_object(&sample)?,
        from_sample: true,
    })
}

pub fn dataset_metadata(
    store: &dyn ImagesetStore,
    name: &str,
) -> Result<ArtifactMetadata, CatalogError> {
    let dir = store.fetch(ArtifactKind::Dataset, name)?;
    let path = DatasetMetadata::path_in(&dir);
    if !path.is_file() {
        return Err(CatalogError::MissingMetadata {
            kind: ArtifactKind::Dataset.as_str(),
            name: name.to_string(),
        });
    }
    Ok(ArtifactMetadata {
        name: name.to_string(),
        fields: read_object(&path)?,
        from_sample: false,
    })
}

/// Described metadata of every artifact of `kind`, each under a name header.
///
/// With `filter`, only entries whose description contains it (as given,
/// upper-cased, or lower-cased) are kept. Artifacts without metadata are
/// skipped with a warning.
pub fn detailed_listing(
    store: &dyn ImagesetStore,
    kind: ArtifactKind,
    filter: Option<&str>,
) -> Result<String, CatalogError> {
    let mut text = String::new();
    for name in store.list_available(kind)? {
        let metadata = match kind {
            ArtifactKind::Imageset => imageset_metadata(store, &name),
            ArtifactKind::Dataset => dataset_metadata(store, &name),
        };
        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(CatalogError::MissingMetadata { .. }) => {
                warn!(name, kind = kind.as_str(), "No metadata found; skipped");
                continue;
            }
            Err(err) => return Err(err),
        };
        let description = metadata.describe();
        if let Some(filter) = filter
            && !matches_filter(&description, filter)
        {
            continue;
        }
        text.push_str(&format!("--{} NAME: {}\n", kind_label(kind), name.to_uppercase()));
        text.push_str(&description);
        text.push_str(DETAIL_SEPARATOR);
        text.push('\n');
    }
    Ok(text)
}

/// Entries in each output directory of a dataset on disk.
pub fn split_file_counts(dataset: &Dataset) -> Result<SplitSummary, CatalogError> {
    let complete = dataset.complete_dir();
    Ok(SplitSummary {
        test: count_entries(&dataset.test_dir())?,
        dev_train: count_entries(&complete.join(SplitKind::Train.as_str()))?,
        dev_test: count_entries(&complete.join(SplitKind::Test.as_str()))?,
    })
}

fn matches_filter(description: &str, filter: &str) -> bool {
    description.contains(filter)
        || description.contains(&filter.to_uppercase())
        || description.contains(&filter.to_lowercase())
}

fn kind_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Imageset => "IMAGESET",
        ArtifactKind::Dataset => "DATASET",
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>, CatalogError> {
    let bytes = fs::read(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(CatalogError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

fn first_json_file(dir: &Path) -> Result<Option<PathBuf>, CatalogError> {
    let read_err = |source| CatalogError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(read_err)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files.into_iter().next())
}

fn count_entries(dir: &Path) -> Result<usize, CatalogError> {
    match fs::read_dir(dir) {
        Ok(entries) => Ok(entries.count()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(source) => Err(CatalogError::Read {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalDirStore;
    use tempfile::tempdir;

    fn store_with_sets(root: &Path) -> LocalDirStore {
        let orbit = root.join("imagesets/orbit");
        fs::create_dir_all(&orbit).unwrap();
        fs::write(
            orbit.join(IMAGESET_METADATA_FILE),
            r#"{"camera": "Wide Angle", "frames": 120}"#,
        )
        .unwrap();
        let lunar = root.join("imagesets/lunar");
        fs::create_dir_all(&lunar).unwrap();
        fs::write(lunar.join("meta_2.json"), r#"{"pose": [1, 2], "tags": ["moon"]}"#).unwrap();
        fs::write(lunar.join("meta_1.json"), r#"{"pose": [0, 0], "tags": []}"#).unwrap();
        fs::create_dir_all(root.join("imagesets/empty")).unwrap();
        LocalDirStore::new(root)
    }

    #[test]
    fn imageset_falls_back_to_first_record() {
        let dir = tempdir().unwrap();
        let store = store_with_sets(dir.path());

        let orbit = imageset_metadata(&store, "orbit").unwrap();
        assert!(!orbit.from_sample);
        assert_eq!(orbit.describe(), "CAMERA Wide Angle\nFRAMES 120\n");

        let lunar = imageset_metadata(&store, "lunar").unwrap();
        assert!(lunar.from_sample);
        assert_eq!(lunar.fields["pose"], serde_json::json!([0, 0]));

        assert!(matches!(
            imageset_metadata(&store, "empty"),
            Err(CatalogError::MissingMetadata { .. })
        ));
        assert!(matches!(
            imageset_metadata(&store, "absent"),
            Err(CatalogError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn listing_filters_case_insensitively_and_skips_bare_sets() {
        let dir = tempdir().unwrap();
        let store = store_with_sets(dir.path());

        let all = detailed_listing(&store, ArtifactKind::Imageset, None).unwrap();
        assert!(all.starts_with("--IMAGESET NAME: LUNAR\n"));
        assert!(all.contains("--IMAGESET NAME: ORBIT\nCAMERA Wide Angle\n"));
        assert!(!all.contains("EMPTY"));
        assert_eq!(all.matches(DETAIL_SEPARATOR).count(), 2);

        let wide = detailed_listing(&store, ArtifactKind::Imageset, Some("wide angle")).unwrap();
        assert!(wide.contains("ORBIT"));
        assert!(!wide.contains("LUNAR"));
        let none = detailed_listing(&store, ArtifactKind::Imageset, Some("mars")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn dataset_description_hides_bulky_fields() {
        let dir = tempdir().unwrap();
        let set = dir.path().join("datasets/orbit_v1");
        fs::create_dir_all(set.join("test")).unwrap();
        fs::create_dir_all(set.join("splits/complete/train")).unwrap();
        fs::write(set.join("test/meta_1.json"), "{}").unwrap();
        fs::write(set.join("splits/complete/train/a"), "").unwrap();
        fs::write(set.join("splits/complete/train/b"), "").unwrap();
        fs::write(
            DatasetMetadata::path_in(&set),
            serde_json::json!({
                "name": "orbit_v1",
                "date_created": "2023-11-14T22:13:20Z",
                "created_by": "A. Tester",
                "comments": "",
                "training_type": "copy",
                "image_ids": [["orbit", "1"]],
                "filters": {"groups": []},
            })
            .to_string(),
        )
        .unwrap();
        let store = LocalDirStore::new(dir.path());

        let described = dataset_metadata(&store, "orbit_v1").unwrap().describe();
        assert!(described.contains("NAME orbit_v1\n"));
        assert!(described.contains("TRAINING_TYPE copy\n"));
        assert!(!described.contains("IMAGE_IDS"));
        assert!(!described.contains("FILTERS"));

        let counts = split_file_counts(&Dataset::open(set).unwrap()).unwrap();
        assert_eq!(
            counts,
            SplitSummary {
                test: 1,
                dev_train: 2,
                dev_test: 0,
            }
        );
    }
}
