//! Colour-by grouping of samples.
//!
//! Missing annotation values become the literal group [`MISSING_GROUP`], and
//! grouped samples are laid out block-wise in order of first appearance of
//! each group, keeping the original order inside a block.

use std::collections::HashMap;

use polars::prelude::*;
use tracing::debug;

pub const MISSING_GROUP: &str = "N/A";

/// Samples regrouped by a colour-by column.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrouping {
    pub column: String,
    /// Original sample indices in display order.
    pub order: Vec<usize>,
    /// Group label of each sample, in display order.
    pub labels: Vec<String>,
    /// Distinct groups in order of first appearance.
    pub levels: Vec<String>,
}

/// Per-sample group labels of `column`, nulls replaced by `N/A`.
pub fn group_labels(annotation: &DataFrame, column: &str) -> PolarsResult<Vec<String>> {
    let values = annotation.column(column)?.cast(&DataType::String)?;
    let mut missing = 0usize;
    let labels = values
        .str()?
        .into_iter()
        .map(|v| match v {
            Some(v) => v.to_string(),
            None => {
                missing += 1;
                MISSING_GROUP.to_string()
            }
        })
        .collect();
    if missing > 0 {
        debug!("{missing} samples have no value for '{column}', grouped as {MISSING_GROUP}");
    }
    Ok(labels)
}

/// Stable block order of `labels` by first occurrence.
///
/// Returns the permutation of indices and the distinct levels.
pub fn first_occurrence_order(labels: &[String]) -> (Vec<usize>, Vec<String>) {
    let mut levels: Vec<String> = Vec::new();
    let mut level_idx: HashMap<&str, usize> = HashMap::new();
    let mut blocks: Vec<Vec<usize>> = Vec::new();

    for (i, label) in labels.iter().enumerate() {
        let slot = *level_idx.entry(label.as_str()).or_insert_with(|| {
            levels.push(label.clone());
            blocks.push(Vec::new());
            blocks.len() - 1
        });
        blocks[slot].push(i);
    }

    (blocks.into_iter().flatten().collect(), levels)
}

/// Regroup samples by `group_by`. `None` or an empty column name means no
/// grouping.
pub fn regroup(
    annotation: &DataFrame,
    n_samples: usize,
    group_by: Option<&str>,
) -> PolarsResult<Option<SampleGrouping>> {
    let Some(column) = group_by.filter(|c| !c.trim().is_empty()) else {
        return Ok(None);
    };
    if annotation.height() != n_samples {
        return Err(PolarsError::ShapeMismatch(
            format!(
                "annotation has {} rows but the matrix has {} samples",
                annotation.height(),
                n_samples
            )
            .into(),
        ));
    }

    let labels = group_labels(annotation, column)?;
    let (order, levels) = first_occurrence_order(&labels);
    let labels = order.iter().map(|&i| labels[i].clone()).collect();

    Ok(Some(SampleGrouping {
        column: column.to_string(),
        order,
        labels,
        levels,
    }))
}

/// Annotation columns usable for colouring: every column but the first (the
/// sample ids) with at least two groups and fewer groups than samples.
pub fn grouping_candidates(annotation: &DataFrame) -> PolarsResult<Vec<String>> {
    let n = annotation.height();
    let mut candidates = Vec::new();
    for col in annotation.get_columns().iter().skip(1) {
        let distinct = col.n_unique()?;
        if distinct >= 2 && distinct < n {
            candidates.push(col.name().to_string());
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_are_ordered_by_first_occurrence() {
        let (order, levels) = first_occurrence_order(&strings(&["g2", "g1", "g2", "g1"]));
        assert_eq!(order, vec![0, 2, 1, 3]);
        assert_eq!(levels, strings(&["g2", "g1"]));
    }

    #[test]
    fn missing_values_become_na() {
        let ann = df![
            "sample" => &["A", "B", "C"],
            "batch" => &[Some("b1"), None, Some("b1")]
        ]
        .unwrap();
        let grouping = regroup(&ann, 3, Some("batch")).unwrap().unwrap();
        assert_eq!(grouping.order, vec![0, 2, 1]);
        assert_eq!(grouping.labels, strings(&["b1", "b1", "N/A"]));
        assert_eq!(grouping.levels, strings(&["b1", "N/A"]));
    }

    #[test]
    fn empty_column_name_means_no_grouping() {
        let ann = df!["sample" => &["A"], "batch" => &["b1"]].unwrap();
        assert!(regroup(&ann, 1, Some("")).unwrap().is_none());
        assert!(regroup(&ann, 1, None).unwrap().is_none());
    }

    #[test]
    fn unknown_column_and_shape_are_errors() {
        let ann = df!["sample" => &["A", "B"], "batch" => &["b1", "b2"]].unwrap();
        assert!(regroup(&ann, 2, Some("treatment")).is_err());
        assert!(regroup(&ann, 3, Some("batch")).is_err());
    }

    #[test]
    fn numeric_group_columns_are_labelled_as_text() {
        let ann = df!["sample" => &["A", "B"], "dose" => &[10i32, 20]].unwrap();
        assert_eq!(group_labels(&ann, "dose").unwrap(), strings(&["10", "20"]));
    }

    #[test]
    fn candidates_skip_ids_and_constant_columns() {
        let ann = df![
            "sample" => &["A", "B", "C"],
            "batch" => &["b1", "b2", "b1"],
            "site" => &["x", "x", "x"],
            "replicate" => &["r1", "r2", "r3"]
        ]
        .unwrap();
        assert_eq!(grouping_candidates(&ann).unwrap(), strings(&["batch"]));
    }
}
