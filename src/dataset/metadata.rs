//! `metadata.json` at the dataset root.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::filter::{FilterResult, TagFilter};
use super::{DatasetError, RecordRef};

/// Fixed file name of the persisted metadata.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// One group as persisted under `filters.groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub name: String,
    pub filters: Vec<TagFilter>,
    pub number_included: usize,
    pub image_ids: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMetadata {
    pub groups: Vec<GroupMetadata>,
}

impl From<&FilterResult> for FilterMetadata {
    fn from(result: &FilterResult) -> Self {
        Self {
            groups: result
                .groups
                .iter()
                .map(|group| GroupMetadata {
                    name: group.name.clone(),
                    filters: group.filters.clone(),
                    number_included: group.members.len(),
                    image_ids: group.members.iter().map(RecordRef::labelled).collect(),
                })
                .collect(),
        }
    }
}

/// Provenance record written once per created dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub name: String,
    /// RFC 3339 UTC timestamp ending in `Z`.
    pub date_created: String,
    pub created_by: String,
    pub comments: String,
    pub training_type: String,
    /// `(imageset_label, record_id)` for every selected record.
    pub image_ids: Vec<(String, String)>,
    pub filters: FilterMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kfolds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_percent: Option<f64>,
}

impl DatasetMetadata {
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(METADATA_FILE_NAME)
    }

    /// Serialize fully in memory, then atomically replace `<root>/metadata.json`.
    pub fn save(&self, root: &Path) -> Result<PathBuf, DatasetError> {
        let path = Self::path_in(root);
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| DatasetError::Persistence {
                path: path.clone(),
                source: std::io::Error::other(err),
            })?;
        atomic_write(&path, &bytes)?;
        Ok(path)
    }

    /// Delete `<root>/metadata.json`. Returns whether a file was removed.
    pub fn remove(root: &Path) -> Result<bool, DatasetError> {
        let path = Self::path_in(root);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DatasetError::Persistence { path, source }),
        }
    }

    pub fn load(root: &Path) -> Result<Self, DatasetError> {
        let path = Self::path_in(root);
        let bytes = std::fs::read(&path).map_err(DatasetError::io(&path))?;
        serde_json::from_slice(&bytes)
            .map_err(|source| DatasetError::MetadataParse { path, source })
    }
}

/// Current UTC time as RFC 3339 with a trailing `Z`.
pub fn utc_timestamp() -> String {
    format_utc(OffsetDateTime::now_utc())
}

pub(crate) fn format_utc(at: OffsetDateTime) -> String {
    at.to_offset(time::UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// A created dataset on disk.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub metadata: DatasetMetadata,
    pub path: PathBuf,
}

impl Dataset {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let path = path.into();
        let metadata = DatasetMetadata::load(&path)?;
        Ok(Self {
            name: metadata.name.clone(),
            metadata,
            path,
        })
    }

    pub fn test_dir(&self) -> PathBuf {
        self.path.join(super::pipeline::TEST_DIR)
    }

    pub fn complete_dir(&self) -> PathBuf {
        self.path.join(super::pipeline::SPLITS_DIR).join(super::pipeline::COMPLETE_DIR)
    }
}

/// Write via a random-suffixed sibling so readers never see a partial file.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), DatasetError> {
    use rand::TryRngCore;
    let no_parent = || DatasetError::Persistence {
        path: path.to_path_buf(),
        source: std::io::Error::other("path has no parent directory"),
    };
    let dir = path.parent().ok_or_else(no_parent)?;
    let file_name = path.file_name().ok_or_else(no_parent)?;

    let mut last_err = None;
    for _ in 0..5 {
        let mut bytes = [0u8; 6];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| DatasetError::Persistence {
                path: path.to_path_buf(),
                source: std::io::Error::other(format!(
                    "failed to generate temporary suffix: {err}"
                )),
            })?;
        let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let tmp_path = dir.join(format!("{}.tmp-{suffix}", file_name.to_string_lossy()));

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                last_err = Some(err);
                continue;
            }
            Err(err) => return Err(DatasetError::persistence(&tmp_path)(err)),
        };

        let written = file.write_all(data).and_then(|()| file.sync_all());
        drop(file);
        if let Err(err) = written.and_then(|()| std::fs::rename(&tmp_path, path)) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(DatasetError::persistence(path)(err));
        }
        sync_parent_dir(dir)?;
        return Ok(());
    }

    Err(DatasetError::Persistence {
        path: path.to_path_buf(),
        source: last_err.unwrap_or_else(|| std::io::Error::other("temporary file collision")),
    })
}

fn sync_parent_dir(dir: &Path) -> Result<(), DatasetError> {
    #[cfg(unix)]
    {
        let handle = std::fs::File::open(dir).map_err(DatasetError::persistence(dir))?;
        handle.sync_all().map_err(DatasetError::persistence(dir))?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}
