use std::fmt;
use std::path::{Path, PathBuf};

/// One raw record: the imageset directory it lives in plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordRef {
    imageset: PathBuf,
    record_id: String,
}

impl RecordRef {
    pub fn new(imageset: impl Into<PathBuf>, record_id: impl Into<String>) -> Self {
        Self {
            imageset: imageset.into(),
            record_id: record_id.into(),
        }
    }

    pub fn imageset(&self) -> &Path {
        &self.imageset
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Imageset name used in persisted metadata (the directory's final component).
    pub fn imageset_label(&self) -> String {
        self.imageset
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.imageset.to_string_lossy().to_string())
    }

    /// `(imageset_label, record_id)` as written to `metadata.json`.
    pub fn labelled(&self) -> (String, String) {
        (self.imageset_label(), self.record_id.clone())
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.imageset_label(), self.record_id)
    }
}

/// Plugin-built value handed to the split and write stages.
///
/// The pipeline only reads the id; everything else is the plugin's business.
pub trait ConstructedObject {
    /// Record id this object was built from.
    fn image_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_needs_both_components() {
        let a = RecordRef::new("/sets/a", "001");
        assert_eq!(a, RecordRef::new("/sets/a", "001"));
        assert_ne!(a, RecordRef::new("/sets/b", "001"));
        assert_ne!(a, RecordRef::new("/sets/a", "002"));
    }

    #[test]
    fn label_is_directory_name() {
        let record = RecordRef::new("/data/imagesets/cygnus_20", "17");
        assert_eq!(record.labelled(), ("cygnus_20".to_string(), "17".to_string()));
        assert_eq!(record.to_string(), "cygnus_20::17");
    }
}
