//! Tag-based record selection.
//!
//! A [`FilterSpec`] names groups; each group narrows the full tag matrix
//! through a sequence of AND/OR tag filters. The carried-forward selection is
//! the union of all groups, in discovery order.

pub mod interactive;


use serde::{Deserialize, Serialize};

use super::{DatasetError, RecordRef, TagMatrix};

/// Name of the group produced when no groups are configured.
pub const IMPLICIT_GROUP_NAME: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Record must carry every listed tag.
    #[serde(rename = "AND")]
    And,
    /// Record must carry at least one listed tag.
    #[serde(rename = "OR")]
    Or,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::And => "AND",
            FilterOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    #[serde(rename = "type")]
    pub op: FilterOp,
    pub tags: Vec<String>,
}

impl TagFilter {
    pub fn and<S: Into<String>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self {
            op: FilterOp::And,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn or<S: Into<String>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self {
            op: FilterOp::Or,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// One named subset definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    /// Applied in order, each narrowing the previous result.
    #[serde(default)]
    pub filters: Vec<TagFilter>,
    /// Keep only the first `take` survivors (discovery order).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<usize>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>, filters: Vec<TagFilter>) -> Self {
        Self {
            name: name.into(),
            filters,
            take: None,
        }
    }

    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub groups: Vec<GroupSpec>,
}

impl FilterSpec {
    pub fn new(groups: Vec<GroupSpec>) -> Self {
        Self { groups }
    }

    /// No groups: select everything.
    pub fn is_noop(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Members of one evaluated group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSelection {
    pub name: String,
    pub filters: Vec<TagFilter>,
    pub members: Vec<RecordRef>,
}

/// Evaluated selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterResult {
    /// Union of all groups, in discovery order.
    pub image_ids: Vec<RecordRef>,
    /// Groups in spec order; names are unique.
    pub groups: Vec<GroupSelection>,
}

impl FilterResult {
    pub fn is_empty(&self) -> bool {
        self.image_ids.is_empty()
    }

    pub fn group(&self, name: &str) -> Option<&GroupSelection> {
        self.groups.iter().find(|group| group.name == name)
    }
}

/// Evaluate `spec` against `matrix`.
pub fn evaluate(matrix: &TagMatrix, spec: &FilterSpec) -> Result<FilterResult, DatasetError> {
    if spec.is_noop() {
        let everything = matrix.records().to_vec();
        return Ok(FilterResult {
            image_ids: everything.clone(),
            groups: vec![GroupSelection {
                name: IMPLICIT_GROUP_NAME.to_string(),
                filters: Vec::new(),
                members: everything,
            }],
        });
    }

    validate_groups(&spec.groups)?;
    let mut selected = vec![false; matrix.len()];
    let mut groups = Vec::with_capacity(spec.groups.len());
    for group in &spec.groups {
        let rows = group_rows(matrix, group)?;
        for &row in &rows {
            selected[row] = true;
        }
        groups.push(GroupSelection {
            name: group.name.clone(),
            filters: group.filters.clone(),
            members: rows.iter().map(|&row| matrix.records()[row].clone()).collect(),
        });
    }

    let image_ids = matrix
        .records()
        .iter()
        .zip(&selected)
        .filter_map(|(record, &keep)| keep.then(|| record.clone()))
        .collect();
    Ok(FilterResult { image_ids, groups })
}

/// Row positions surviving `filters`, in discovery order.
pub fn matching_rows(
    matrix: &TagMatrix,
    filters: &[TagFilter],
) -> Result<Vec<usize>, DatasetError> {
    let mut rows: Vec<usize> = (0..matrix.len()).collect();
    for filter in filters {
        let columns = resolve_columns(matrix, filter)?;
        rows.retain(|&row| {
            let mut flags = columns.iter().map(|&column| matrix.flag_at(row, column));
            match filter.op {
                FilterOp::And => flags.all(|flag| flag),
                FilterOp::Or => flags.any(|flag| flag),
            }
        });
    }
    Ok(rows)
}

fn group_rows(matrix: &TagMatrix, group: &GroupSpec) -> Result<Vec<usize>, DatasetError> {
    let mut rows = matching_rows(matrix, &group.filters)
        .map_err(|err| with_group_field(err, &group.name))?;
    if let Some(take) = group.take {
        if take > rows.len() {
            return Err(DatasetError::configuration(
                group_field(&group.name),
                format!("take = {take} but only {} records match", rows.len()),
            ));
        }
        rows.truncate(take);
    }
    Ok(rows)
}

fn resolve_columns(matrix: &TagMatrix, filter: &TagFilter) -> Result<Vec<usize>, DatasetError> {
    if filter.tags.is_empty() {
        return Err(DatasetError::configuration(
            "filter",
            format!("{} filter lists no tags", filter.op.as_str()),
        ));
    }
    filter
        .tags
        .iter()
        .map(|tag| {
            matrix.column(tag).ok_or_else(|| {
                DatasetError::configuration("filter", format!("unknown tag {tag:?}"))
            })
        })
        .collect()
}

/// Group names must be non-empty and unique, and every filter must list at
/// least one tag.
pub fn validate_groups(groups: &[GroupSpec]) -> Result<(), DatasetError> {
    let mut seen = std::collections::HashSet::new();
    for group in groups {
        if group.name.trim().is_empty() {
            return Err(DatasetError::configuration("filter.groups", "group name is empty"));
        }
        if !seen.insert(group.name.as_str()) {
            return Err(DatasetError::configuration(
                "filter.groups",
                format!("duplicate group name {:?}", group.name),
            ));
        }
        if group.filters.iter().any(|filter| filter.tags.is_empty()) {
            return Err(DatasetError::configuration(
                group_field(&group.name),
                "filter lists no tags",
            ));
        }
    }
    Ok(())
}

fn group_field(name: &str) -> String {
    format!("filter.groups[{name}]")
}

fn with_group_field(err: DatasetError, name: &str) -> DatasetError {
    match err {
        DatasetError::Configuration { reason, .. } => DatasetError::Configuration {
            field: group_field(name),
            reason,
        },
        other => other,
    }
}
