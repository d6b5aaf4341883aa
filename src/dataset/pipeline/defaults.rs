//! Shared stage bodies used when a plugin keeps the default.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    AssemblyState, COMPLETE_DIR, DatasetPlugin, FileAssociation, METADATA_ASSOCIATION, SPLITS_DIR,
    SUPPORTED_METADATA_SUFFIX, SplitSummary, TEST_DIR, UNTAGGED,
};
use crate::dataset::filter::{self, interactive::prompt_filter_spec};
use crate::dataset::metadata::{DatasetMetadata, FilterMetadata, utc_timestamp};
use crate::dataset::split::{SplitKind, split};
use crate::dataset::stages::Stage;
use crate::dataset::{ConstructedObject, DatasetError, RecordRef, TagMatrix};
use crate::interaction::Interaction;

#[derive(Debug, Default, Deserialize)]
struct RecordMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

/// Fill `state.tags` from every configured imageset.
pub fn discover(state: &mut AssemblyState) -> Result<(), DatasetError> {
    state.tags = discover_records(&state.imageset_paths, state.associated_files.metadata())?;
    info!(
        records = state.tags.len(),
        tags = state.tags.tag_names().len(),
        "Discovered records"
    );
    Ok(())
}

/// Scan `imagesets` for record metadata files named by `pattern`.
///
/// Entries are visited in file-name order, so rescanning an unchanged
/// directory yields an identical matrix.
pub fn discover_records(
    imagesets: &[PathBuf],
    pattern: &FileAssociation,
) -> Result<TagMatrix, DatasetError> {
    if pattern.suffix != SUPPORTED_METADATA_SUFFIX {
        return Err(DatasetError::UnsupportedMetadataFormat {
            suffix: pattern.suffix.clone(),
        });
    }
    let mut matrix = TagMatrix::new();
    for imageset in imagesets {
        let mut entries = fs::read_dir(imageset)
            .map_err(DatasetError::io(imageset))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatasetError::io(imageset))?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut found = TagMatrix::new();
        for entry in entries {
            let file_name = entry.file_name();
            let Some(record_id) = file_name.to_str().and_then(|name| pattern.record_id(name)) else {
                continue;
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let tags = read_record_tags(&path)?;
            found.insert(RecordRef::new(imageset.clone(), record_id), tags);
        }
        debug!(imageset = %imageset.display(), records = found.len(), "Scanned imageset");
        matrix.union(found);
    }
    Ok(matrix)
}

pub(crate) fn read_record_tags(path: &Path) -> Result<Vec<String>, DatasetError> {
    let bytes = fs::read(path).map_err(DatasetError::io(path))?;
    let record: RecordMetadata =
        serde_json::from_slice(&bytes).map_err(|source| DatasetError::MetadataParse {
            path: path.to_path_buf(),
            source,
        })?;
    if record.tags.is_empty() {
        return Ok(vec![UNTAGGED.to_string()]);
    }
    Ok(record.tags)
}

/// Evaluate the configured groups, or prompt for them when interactive.
pub fn filter(state: &mut AssemblyState, oracle: &mut dyn Interaction) -> Result<(), DatasetError> {
    let spec = if state.filter.interactive {
        prompt_filter_spec(&state.tags, oracle)?
    } else {
        state.filter.spec()
    };
    state.selection = filter::evaluate(&state.tags, &spec)?;
    info!(
        selected = state.selection.image_ids.len(),
        groups = state.selection.groups.len(),
        "Selected records"
    );
    Ok(())
}

/// Copy every associated file of the selection into a fresh scratch directory.
pub fn materialize(state: &AssemblyState) -> Result<(), DatasetError> {
    let records = &state.selection.image_ids;
    if records.is_empty() {
        return Err(DatasetError::EmptyDataset {
            stage: Stage::Materialize,
        });
    }
    let mut owners: HashMap<&str, &RecordRef> = HashMap::with_capacity(records.len());
    for record in records {
        if owners.insert(record.record_id(), record).is_some() {
            return Err(DatasetError::DuplicateRecord {
                record_id: record.record_id().to_string(),
            });
        }
    }

    recreate_dir(&state.scratch_dir)?;
    let mut jobs = Vec::new();
    for record in records {
        for (kind, assoc) in state.associated_files.iter() {
            let name = assoc.file_name(record.record_id());
            let source = record.imageset().join(&name);
            if !source.is_file() {
                if kind == METADATA_ASSOCIATION {
                    return Err(DatasetError::Io {
                        path: source,
                        source: std::io::ErrorKind::NotFound.into(),
                    });
                }
                warn!(record = %record, kind, "Associated file missing; skipped");
                continue;
            }
            jobs.push(CopyJob {
                destination: state.scratch_dir.join(&name),
                source,
            });
        }
    }
    copy_files(&jobs, state.copy_threads)?;
    debug!(files = jobs.len(), scratch = %state.scratch_dir.display(), "Materialized records");
    Ok(())
}

/// Hold out `test/`, then split the rest into `splits/complete/{train,test}`.
pub fn write_dataset<P: DatasetPlugin + ?Sized>(
    plugin: &mut P,
    state: &AssemblyState,
    objects: Vec<P::Object>,
) -> Result<SplitSummary, DatasetError> {
    let root = state.dataset_root();
    fs::create_dir_all(root).map_err(DatasetError::persistence(root))?;

    let (held_out, dev) = split(objects, state.test_percent)?;
    let test_dir = recreate_dir(&root.join(TEST_DIR))?;
    let jobs = scratch_jobs(state, &held_out, &test_dir);
    copy_files(&jobs, state.copy_threads)?;

    let complete = recreate_dir(&root.join(SPLITS_DIR).join(COMPLETE_DIR))?;
    let (dev_test, dev_train) = split(dev, state.test_percent)?;
    for (kind, objects) in [(SplitKind::Train, &dev_train), (SplitKind::Test, &dev_test)] {
        let path = complete.join(kind.as_str());
        fs::create_dir_all(&path).map_err(DatasetError::persistence(&path))?;
        plugin
            .write_data(state, objects, &path, kind)
            .map_err(|err| DatasetError::stage(Stage::Write, err))?;
    }

    Ok(SplitSummary {
        test: held_out.len(),
        dev_train: dev_train.len(),
        dev_test: dev_test.len(),
    })
}

fn scratch_jobs<O: ConstructedObject>(
    state: &AssemblyState,
    objects: &[O],
    dest: &Path,
) -> Vec<CopyJob> {
    let mut jobs = Vec::new();
    for object in objects {
        for (kind, assoc) in state.associated_files.iter() {
            let name = assoc.file_name(object.image_id());
            let source = state.scratch_dir.join(&name);
            if !source.is_file() {
                warn!(image_id = object.image_id(), kind, "Scratch file missing; skipped");
                continue;
            }
            jobs.push(CopyJob {
                destination: dest.join(&name),
                source,
            });
        }
    }
    jobs
}

/// Metadata for the finished run.
pub fn build_metadata(state: &AssemblyState) -> DatasetMetadata {
    DatasetMetadata {
        name: state.dataset_name.clone(),
        date_created: utc_timestamp(),
        created_by: state.created_by.clone(),
        comments: state.comments.clone(),
        training_type: state.training_type.clone(),
        image_ids: state.selection.image_ids.iter().map(RecordRef::labelled).collect(),
        filters: FilterMetadata::from(&state.selection),
        kfolds: state.kfolds,
        test_percent: state.recorded_test_percent,
    }
}

pub fn write_metadata(state: &AssemblyState) -> Result<PathBuf, DatasetError> {
    let root = state.dataset_root();
    fs::create_dir_all(root).map_err(DatasetError::persistence(root))?;
    build_metadata(state).save(root)
}

/// One file copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Copy `jobs` on up to `threads` scoped workers; any failure fails the batch.
pub fn copy_files(jobs: &[CopyJob], threads: usize) -> Result<(), DatasetError> {
    if jobs.is_empty() {
        return Ok(());
    }
    let workers = threads.clamp(1, jobs.len());
    let batch_len = jobs.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .chunks(batch_len)
            .map(|batch| scope.spawn(move || copy_batch(batch)))
            .collect();
        handles.into_iter().try_for_each(|handle| {
            handle.join().unwrap_or_else(|_| {
                Err(DatasetError::Io {
                    path: PathBuf::new(),
                    source: std::io::Error::other("copy worker panicked"),
                })
            })
        })
    })
}

fn copy_batch(batch: &[CopyJob]) -> Result<(), DatasetError> {
    for job in batch {
        fs::copy(&job.source, &job.destination)
            .map_err(DatasetError::persistence(&job.destination))?;
    }
    Ok(())
}

/// Remove `path` if present and create it empty.
pub(crate) fn recreate_dir(path: &Path) -> Result<PathBuf, DatasetError> {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(DatasetError::persistence(path)(err)),
    }
    fs::create_dir_all(path).map_err(DatasetError::persistence(path))?;
    Ok(path.to_path_buf())
}
