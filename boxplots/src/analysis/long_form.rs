//! Matrix -> one row per (sample, feature) pair.

use std::collections::HashMap;

use polars::prelude::*;

use crate::data_handling::assay_matrix::AssayMatrix;

pub const SAMPLE_COL: &str = "sample";
pub const VALUE_COL: &str = "value";
pub const GROUP_COL: &str = "group";

/// Melt `matrix` sample by sample. `groups`, when given, holds one label per
/// matrix column and becomes the `group` column.
pub fn long_form(matrix: &AssayMatrix, groups: Option<&[String]>) -> PolarsResult<DataFrame> {
    if let Some(groups) = groups {
        if groups.len() != matrix.n_samples() {
            return Err(PolarsError::ShapeMismatch(
                format!(
                    "{} group labels for {} samples",
                    groups.len(),
                    matrix.n_samples()
                )
                .into(),
            ));
        }
    }

    let n_rows = matrix.n_samples() * matrix.n_features();
    let mut samples: Vec<&str> = Vec::with_capacity(n_rows);
    let mut values: Vec<f64> = Vec::with_capacity(n_rows);
    let mut group_col: Vec<&str> = Vec::with_capacity(if groups.is_some() { n_rows } else { 0 });

    for (j, sample) in matrix.samples().iter().enumerate() {
        for &v in matrix.sample_values(j) {
            samples.push(sample);
            values.push(v);
            if let Some(groups) = groups {
                group_col.push(&groups[j]);
            }
        }
    }

    let mut columns = vec![
        Column::from(Series::new(PlSmallStr::from(SAMPLE_COL), samples)),
        Column::from(Series::new(PlSmallStr::from(VALUE_COL), values)),
    ];
    if groups.is_some() {
        columns.push(Column::from(Series::new(PlSmallStr::from(GROUP_COL), group_col)));
    }
    DataFrame::new(columns)
}

/// Collect the `value` column per sample, following `sample_order` rather
/// than whatever order the frame has. Samples absent from the frame get an
/// empty vector.
pub fn values_by_sample(
    df: &DataFrame,
    sample_order: &[String],
) -> PolarsResult<Vec<(String, Vec<f64>)>> {
    let samples = df.column(SAMPLE_COL)?.str()?;
    let values = df.column(VALUE_COL)?.f64()?;

    let mut buckets: HashMap<&str, Vec<f64>> = HashMap::new();
    for (sample, value) in samples.into_iter().zip(values.into_iter()) {
        if let (Some(sample), Some(value)) = (sample, value) {
            buckets.entry(sample).or_default().push(value);
        }
    }

    Ok(sample_order
        .iter()
        .map(|s| (s.clone(), buckets.remove(s.as_str()).unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix() -> AssayMatrix {
        AssayMatrix::new(
            vec!["f1".into(), "f2".into()],
            vec!["10".into(), "2".into(), "A".into()],
            array![[1.0, 3.0, 7.0], [0.0, 15.0, 1.0]],
        )
        .unwrap()
        .log2p()
    }

    #[test]
    fn one_row_per_sample_feature_pair() {
        let m = matrix();
        let df = long_form(&m, None).unwrap();
        assert_eq!(df.height(), m.n_samples() * m.n_features());
        assert_eq!(df.column(SAMPLE_COL).unwrap().null_count(), 0);
        let values = df.column(VALUE_COL).unwrap().f64().unwrap();
        assert_eq!(values.null_count(), 0);
        assert!(values.into_no_null_iter().all(f64::is_finite));
        assert!(df.column(GROUP_COL).is_err());
    }

    #[test]
    fn group_labels_follow_their_sample() {
        let m = matrix();
        let groups = vec!["g1".to_string(), "g2".to_string(), "g1".to_string()];
        let df = long_form(&m, Some(&groups)).unwrap();
        let g: Vec<&str> = df.column(GROUP_COL).unwrap().str().unwrap().into_no_null_iter().collect();
        assert_eq!(g, vec!["g1", "g1", "g2", "g2", "g1", "g1"]);
    }

    #[test]
    fn mismatched_group_labels_are_rejected() {
        let groups = vec!["g1".to_string()];
        assert!(long_form(&matrix(), Some(&groups)).is_err());
    }

    #[test]
    fn values_come_back_in_requested_order() {
        let df = long_form(&matrix(), None).unwrap();
        let order = vec!["A".to_string(), "10".to_string(), "2".to_string()];
        let by_sample = values_by_sample(&df, &order).unwrap();
        let names: Vec<&str> = by_sample.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(names, vec!["A", "10", "2"]);
        assert_eq!(by_sample[0].1, vec![3.0, 1.0]);
        assert_eq!(by_sample[2].1, vec![2.0, 4.0]);
    }
}
