//! Prompt-driven group definition.

use tracing::info;

use super::{FilterOp, FilterSpec, GroupSpec, TagFilter, matching_rows, validate_groups};
use crate::dataset::{DatasetError, TagMatrix};
use crate::interaction::{Interaction, InteractionError};

const AND_CHOICE: &str = "AND (intersection)";
const OR_CHOICE: &str = "OR (union)";

/// Ask the user to define one or more filtered sets over `matrix`.
///
/// Each set is narrowed one tag filter at a time, with the surviving count
/// reported after every step. Once all sets are named, the user picks how many
/// records of each to keep.
pub fn prompt_filter_spec(
    matrix: &TagMatrix,
    oracle: &mut dyn Interaction,
) -> Result<FilterSpec, DatasetError> {
    let tags = matrix.tag_names().to_vec();
    let ops = vec![AND_CHOICE.to_string(), OR_CHOICE.to_string()];
    let mut groups: Vec<(GroupSpec, usize)> = Vec::new();

    loop {
        let mut filters: Vec<TagFilter> = Vec::new();
        let mut counts = vec![matrix.len()];
        loop {
            if !filters.is_empty() {
                info!("Filters already applied:\n{}", describe(&filters, &counts));
            }
            let selected = oracle.choose_many(
                "Please select a set of tags with which to apply a filter:",
                &tags,
            )?;
            if selected.is_empty() {
                info!("No tags selected; nothing applied");
            } else {
                let op = oracle.choose(
                    "Which filter would you like to apply to the above set?",
                    &ops,
                )?;
                let op = match op.as_str() {
                    AND_CHOICE => FilterOp::And,
                    OR_CHOICE => FilterOp::Or,
                    _ => {
                        return Err(InteractionError::InvalidAnswer {
                            message: "filter type".to_string(),
                            answer: op,
                        }
                        .into());
                    }
                };
                filters.push(TagFilter { op, tags: selected });
                let count = matching_rows(matrix, &filters)?.len();
                info!("There are {count} records that meet the filter criteria selected.");
                counts.push(count);
            }
            if !oracle.confirm("Would you like to continue filtering this set?", false)? {
                break;
            }
        }

        let name = oracle.text("What would you like to name this set?", None)?;
        let available = counts.last().copied().unwrap_or(0);
        groups.push((GroupSpec::new(name.trim(), filters), available));

        if !oracle.confirm("Would you like to create more sets via filtering?", false)? {
            break;
        }
    }

    let mut spec = FilterSpec::default();
    for (mut group, available) in groups {
        let message = format!(
            "How many records of set \"{}\" would you like to use? (?/{available})",
            group.name
        );
        let answer = oracle.text(&message, Some(&available.to_string()))?;
        let take = answer
            .trim()
            .parse::<usize>()
            .map_err(|_| InteractionError::InvalidAnswer { message, answer })?;
        group.take = (take != available).then_some(take);
        spec.groups.push(group);
    }
    validate_groups(&spec.groups)?;
    Ok(spec)
}

fn describe(filters: &[TagFilter], counts: &[usize]) -> String {
    filters
        .iter()
        .enumerate()
        .map(|(idx, filter)| {
            format!(
                "   > {} ({} -> {})",
                filter.tags.join(&format!(" {} ", filter.op.as_str())),
                counts[idx],
                counts[idx + 1]
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
