//! Boolean tag table keyed by record.

use std::collections::HashMap;

use super::RecordRef;

/// Records in discovery order, each with one flag per known tag.
///
/// Every row always has one entry per tag column: introducing a new tag pads
/// all existing rows with `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMatrix {
    tags: Vec<String>,
    tag_index: HashMap<String, usize>,
    records: Vec<RecordRef>,
    rows: Vec<Vec<bool>>,
    row_index: HashMap<RecordRef, usize>,
}

impl TagMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in first-seen order.
    pub fn records(&self) -> &[RecordRef] {
        &self.records
    }

    /// Tag columns in first-seen order.
    pub fn tag_names(&self) -> &[String] {
        &self.tags
    }

    /// Add a record carrying `tags`.
    ///
    /// A record that is already present keeps its position and gains the new
    /// tags.
    pub fn insert<I, S>(&mut self, record: RecordRef, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let row = match self.row_index.get(&record) {
            Some(&row) => row,
            None => {
                let row = self.records.len();
                self.row_index.insert(record.clone(), row);
                self.records.push(record);
                self.rows.push(vec![false; self.tags.len()]);
                row
            }
        };
        for tag in tags {
            let column = self.column_for(tag.as_ref());
            self.rows[row][column] = true;
        }
    }

    /// Append every record of `other`, re-normalizing columns across both.
    pub fn union(&mut self, other: TagMatrix) {
        let TagMatrix {
            tags, records, rows, ..
        } = other;
        for (record, flags) in records.into_iter().zip(rows) {
            let set = tags
                .iter()
                .zip(flags)
                .filter_map(|(tag, flag)| flag.then_some(tag.as_str()));
            self.insert(record, set);
        }
        for tag in &tags {
            self.column_for(tag);
        }
    }

    /// Flag for `tag` on `record`; unknown records or tags read as `false`.
    pub fn get(&self, record: &RecordRef, tag: &str) -> bool {
        match (self.row_index.get(record), self.tag_index.get(tag)) {
            (Some(&row), Some(&column)) => self.rows[row][column],
            _ => false,
        }
    }

    /// Flag by row position and tag column, for tight filter loops.
    pub(crate) fn flag_at(&self, row: usize, column: usize) -> bool {
        self.rows[row][column]
    }

    pub(crate) fn column(&self, tag: &str) -> Option<usize> {
        self.tag_index.get(tag).copied()
    }

    /// Tags set on `record`, in column order.
    pub fn tags_of(&self, record: &RecordRef) -> Vec<&str> {
        let Some(&row) = self.row_index.get(record) else {
            return Vec::new();
        };
        self.tags
            .iter()
            .zip(&self.rows[row])
            .filter_map(|(tag, &flag)| flag.then_some(tag.as_str()))
            .collect()
    }

    fn column_for(&mut self, tag: &str) -> usize {
        if let Some(&column) = self.tag_index.get(tag) {
            return column;
        }
        let column = self.tags.len();
        self.tags.push(tag.to_string());
        self.tag_index.insert(tag.to_string(), column);
        for row in &mut self.rows {
            row.push(false);
        }
        column
    }
}
