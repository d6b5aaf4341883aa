use std::fs;
use std::path::{Path, PathBuf};

/// Writes `<store>/imagesets/<name>/` with `meta_<id>.json` and `image_<id>.png`
/// per record.
pub struct ImagesetBuilder {
    dir: PathBuf,
}

impl ImagesetBuilder {
    pub fn new(store_root: &Path, name: &str) -> Self {
        let dir = store_root.join("imagesets").join(name);
        fs::create_dir_all(&dir).expect("create imageset dir");
        Self { dir }
    }

    pub fn record(self, id: &str, tags: &[&str]) -> Self {
        let meta = serde_json::json!({ "tags": tags, "source": "fixture" });
        fs::write(self.dir.join(format!("meta_{id}.json")), meta.to_string()).expect("write meta");
        fs::write(self.dir.join(format!("image_{id}.png")), id.as_bytes()).expect("write image");
        self
    }

    /// `count` records numbered from zero, each tagged `tag`.
    pub fn numbered(mut self, count: usize, tag: &str) -> Self {
        for idx in 0..count {
            self = self.record(&format!("{idx:04}"), &[tag]);
        }
        self
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

/// Number of entries in `dir` whose names end with `suffix`.
pub fn count_with_suffix(dir: &Path, suffix: &str) -> usize {
    fs::read_dir(dir)
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(suffix))
        .count()
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read file")
        .lines()
        .map(str::to_string)
        .collect()
}
