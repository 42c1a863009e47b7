//! Per-sample quartile statistics on log-scale assay values.
//!
//! Quantiles interpolate linearly between order statistics at `p * (n - 1)`,
//! skipping NaN and infinite values. Outliers are values strictly beyond
//! `[Q1 - k * IQR, Q3 + k * IQR]`.

use ndarray::{Array1, ArrayView1, Axis};
use ndarray_stats::interpolate::Linear;
use ndarray_stats::QuantileExt;
use noisy_float::types::n64;
use polars::prelude::*;
use serde::Serialize;

use crate::data_handling::assay_matrix::AssayMatrix;
use crate::models::{polars_err, LabelResolver, WhiskerDistance};

/// min, 25%, median, 75%, max
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveNumber {
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl FiveNumber {
    pub fn of(values: ArrayView1<'_, f64>) -> PolarsResult<Self> {
        if values.is_empty() {
            return Err(PolarsError::NoData("no values to summarise".into()));
        }
        // the interpolation cannot handle infinities, so they count as missing
        let mut scratch: Array1<f64> = values.mapv(|v| if v.is_finite() { v } else { f64::NAN });
        let mut at = |p: f64| -> PolarsResult<f64> {
            let q = scratch
                .quantile_axis_skipnan_mut(Axis(0), n64(p), &Linear)
                .map_err(|e| polars_err(Box::new(e)))?;
            Ok(q[()])
        };
        Ok(Self {
            min: at(0.0)?,
            q25: at(0.25)?,
            median: at(0.5)?,
            q75: at(0.75)?,
            max: at(1.0)?,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q75 - self.q25
    }

    pub fn lower_fence(&self, k: WhiskerDistance) -> f64 {
        self.q25 - k.get() * self.iqr()
    }

    pub fn upper_fence(&self, k: WhiskerDistance) -> f64 {
        self.q75 + k.get() * self.iqr()
    }

    pub fn is_outlier(&self, value: f64, k: WhiskerDistance) -> bool {
        value > self.upper_fence(k) || value < self.lower_fence(k)
    }
}

/// A value beyond its sample's fences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub sample: String,
    pub feature: String,
    pub value: f64,
    pub label: String,
}

/// Five-number summary of every sample, in matrix column order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileSummary {
    pub samples: Vec<String>,
    pub stats: Vec<FiveNumber>,
}

impl QuantileSummary {
    /// Summarise `matrix` column by column. Pass the already log-transformed
    /// matrix.
    pub fn compute(matrix: &AssayMatrix) -> PolarsResult<Self> {
        if matrix.n_samples() == 0 || matrix.n_features() == 0 {
            return Err(PolarsError::NoData(
                format!(
                    "matrix has {} features and {} samples",
                    matrix.n_features(),
                    matrix.n_samples()
                )
                .into(),
            ));
        }
        let stats = (0..matrix.n_samples())
            .map(|j| FiveNumber::of(matrix.sample_values(j)))
            .collect::<PolarsResult<Vec<_>>>()?;
        Ok(Self {
            samples: matrix.samples().to_vec(),
            stats,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn column(&self, pick: impl Fn(&FiveNumber) -> f64) -> Vec<f64> {
        self.stats.iter().map(pick).collect()
    }

    /// `sample, min, q25, median, q75, max`
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::from(Series::new(PlSmallStr::from("sample"), self.samples.clone())),
            Column::from(Series::new(PlSmallStr::from("min"), self.column(|s| s.min))),
            Column::from(Series::new(PlSmallStr::from("q25"), self.column(|s| s.q25))),
            Column::from(Series::new(PlSmallStr::from("median"), self.column(|s| s.median))),
            Column::from(Series::new(PlSmallStr::from("q75"), self.column(|s| s.q75))),
            Column::from(Series::new(PlSmallStr::from("max"), self.column(|s| s.max))),
        ])
    }

    /// Every value of `matrix` beyond its sample's fences, sample by sample
    /// in column order, features in row order within a sample.
    pub fn outliers(
        &self,
        matrix: &AssayMatrix,
        k: WhiskerDistance,
        labels: &dyn LabelResolver,
    ) -> Vec<Outlier> {
        let mut out = Vec::new();
        for (j, (sample, stats)) in self.samples.iter().zip(&self.stats).enumerate() {
            for (feature, &value) in matrix.features().iter().zip(matrix.sample_values(j)) {
                if value.is_finite() && stats.is_outlier(value, k) {
                    out.push(Outlier {
                        sample: sample.clone(),
                        feature: feature.clone(),
                        value,
                        label: labels.label(feature),
                    });
                }
            }
        }
        out
    }
}

/// What one box of the static boxplot needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub summary: FiveNumber,
    /// Most extreme values still inside the fences.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn of(values: &[f64], k: WhiskerDistance) -> PolarsResult<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let summary = FiveNumber::of(ArrayView1::from(&finite))?;

        let mut lower_whisker = summary.q25;
        let mut upper_whisker = summary.q75;
        let mut outliers = Vec::new();
        for &v in &finite {
            if summary.is_outlier(v, k) {
                outliers.push(v);
            } else {
                lower_whisker = lower_whisker.min(v);
                upper_whisker = upper_whisker.max(v);
            }
        }

        Ok(Self {
            summary,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}
