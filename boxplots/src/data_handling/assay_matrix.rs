use ndarray::{Array2, ArrayView1, Axis};
use polars::prelude::*;
use tracing::{debug, warn};

/// Numeric assay matrix: rows are features, columns are samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AssayMatrix {
    features: Vec<String>,
    samples: Vec<String>,
    values: Array2<f64>,
}

impl AssayMatrix {
    pub fn new(
        features: Vec<String>,
        samples: Vec<String>,
        values: Array2<f64>,
    ) -> PolarsResult<Self> {
        if values.dim() != (features.len(), samples.len()) {
            return Err(PolarsError::ShapeMismatch(
                format!(
                    "matrix is {:?} but {} feature ids and {} sample ids were given",
                    values.dim(),
                    features.len(),
                    samples.len()
                )
                .into(),
            ));
        }
        Ok(Self {
            features,
            samples,
            values,
        })
    }

    /// Build from a frame whose first column holds feature ids and whose
    /// remaining columns are samples. Cells that are null or not numeric
    /// become NaN.
    pub fn from_dataframe(df: &DataFrame) -> PolarsResult<Self> {
        let columns = df.get_columns();
        let Some((id_col, sample_cols)) = columns.split_first() else {
            return Err(PolarsError::NoData("matrix frame has no columns".into()));
        };

        let ids = id_col.cast(&DataType::String)?;
        let features: Vec<String> = ids
            .str()?
            .into_iter()
            .enumerate()
            .map(|(i, id)| id.map(str::to_string).unwrap_or_else(|| format!("row_{}", i + 1)))
            .collect();

        let mut values = Array2::<f64>::from_elem((df.height(), sample_cols.len()), f64::NAN);
        let mut samples = Vec::with_capacity(sample_cols.len());
        let mut missing = 0usize;

        for (j, col) in sample_cols.iter().enumerate() {
            samples.push(col.name().to_string());
            let numeric = col.cast(&DataType::Float64)?;
            for (i, v) in numeric.f64()?.into_iter().enumerate() {
                match v {
                    Some(v) => values[[i, j]] = v,
                    None => missing += 1,
                }
            }
        }

        if missing > 0 {
            warn!("{missing} matrix cells were null or non-numeric and are treated as NaN");
        }
        debug!(
            "Loaded assay matrix with {} features x {} samples",
            features.len(),
            samples.len()
        );

        Self::new(features, samples, values)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sample_values(&self, sample_idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(sample_idx)
    }

    /// Keep the given sample columns, in the given order.
    pub fn select_samples(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.clone(),
            samples: indices.iter().map(|&i| self.samples[i].clone()).collect(),
            values: self.values.select(Axis(1), indices),
        }
    }

    /// `log2(v + 1)` of every value; the +1 keeps zero counts finite.
    /// Results that are not finite (inputs of -1 or below, infinities) become
    /// NaN and are treated as missing downstream.
    pub fn log2p(&self) -> Self {
        Self {
            features: self.features.clone(),
            samples: self.samples.clone(),
            values: self.values.mapv(|v| {
                let l = (v + 1.0).log2();
                if l.is_finite() {
                    l
                } else {
                    f64::NAN
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use polars::df;

    #[test]
    fn reads_ids_and_numeric_columns() {
        let df = df![
            "gene" => &["g1", "g2", "g3"],
            "S1" => &[1.0, 2.0, 3.0],
            "S2" => &[Some(4i64), None, Some(6)]
        ]
        .unwrap();
        let m = AssayMatrix::from_dataframe(&df).unwrap();
        assert_eq!(m.features(), &["g1", "g2", "g3"]);
        assert_eq!(m.samples(), &["S1", "S2"]);
        assert_eq!(m.values()[[2, 1]], 6.0);
        assert!(m.values()[[1, 1]].is_nan());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = AssayMatrix::new(vec!["a".into()], vec!["s".into()], array![[1.0, 2.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn select_reorders_columns() {
        let m = AssayMatrix::new(
            vec!["f".into()],
            vec!["A".into(), "B".into(), "C".into()],
            array![[1.0, 2.0, 3.0]],
        )
        .unwrap();
        let picked = m.select_samples(&[2, 0]);
        assert_eq!(picked.samples(), &["C", "A"]);
        assert_eq!(picked.values(), &array![[3.0, 1.0]]);
    }

    #[test]
    fn log2p_keeps_zero_finite() {
        let m = AssayMatrix::new(vec!["f".into()], vec!["A".into(), "B".into()], array![[0.0, 3.0]])
            .unwrap()
            .log2p();
        assert_eq!(m.values(), &array![[0.0, 2.0]]);
    }

    #[test]
    fn log2p_turns_non_finite_results_into_nan() {
        let m = AssayMatrix::new(
            vec!["f".into()],
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            array![[-1.0, f64::INFINITY, -3.0, 1.0]],
        )
        .unwrap()
        .log2p();
        let row: Vec<f64> = m.values().row(0).to_vec();
        assert!(row[..3].iter().all(|v| v.is_nan()));
        assert_eq!(row[3], 1.0);
    }
}
