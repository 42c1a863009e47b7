use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data_handling::assay_matrix::AssayMatrix;
use crate::data_handling::experiment::{ExperimentInfo, FeatureLabels, GroupPalette};
use crate::error::BoxplotError;

/// Wrap any foreign error into a polars compute error.
pub fn polars_err(e: Box<dyn std::error::Error>) -> PolarsError {
    PolarsError::ComputeError(format!("{e}").into())
}

/// Which of the two quartile views is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    Boxes,
    Lines,
}

impl PlotType {
    pub fn value(&self) -> &'static str {
        match self {
            PlotType::Boxes => "boxes",
            PlotType::Lines => "lines",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlotType::Boxes => "Boxes",
            PlotType::Lines => "Lines",
        }
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl std::str::FromStr for PlotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boxes" => Ok(PlotType::Boxes),
            "lines" => Ok(PlotType::Lines),
            other => Err(format!("unknown plot type '{other}' (expected 'boxes' or 'lines')")),
        }
    }
}

/// Multiplier applied to the IQR for whisker ends and outlier fences.
///
/// Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WhiskerDistance(f64);

impl WhiskerDistance {
    pub fn new(value: f64) -> Result<Self, BoxplotError> {
        if value.is_finite() && value >= 0.0 {
            Ok(Self(value))
        } else {
            Err(BoxplotError::InvalidWhiskerDistance(value.to_string()))
        }
    }

    /// Parse the raw text of the numeric input.
    pub fn parse(raw: &str) -> Result<Self, BoxplotError> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| BoxplotError::InvalidWhiskerDistance(raw.to_string()))?;
        Self::new(value)
    }

    pub fn get(&self) -> f64 {
        self.0
    }

    /// Bit pattern, used where the distance takes part in a hash key.
    pub fn key(&self) -> u64 {
        self.0.to_bits()
    }
}

impl Default for WhiskerDistance {
    fn default() -> Self {
        Self(1.5)
    }
}

/// Restrict the selected matrix to samples whose annotation value in
/// `column` is one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleFilter {
    pub column: String,
    pub values: Vec<String>,
}

/// Which matrix the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixSelection {
    pub experiment: String,
    pub assay: String,
    pub sample_filter: Option<SampleFilter>,
}

impl MatrixSelection {
    pub fn new(experiment: impl Into<String>, assay: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            assay: assay.into(),
            sample_filter: None,
        }
    }

    pub fn with_filter(mut self, filter: SampleFilter) -> Self {
        self.sample_filter = Some(filter);
        self
    }
}

/// Resolves feature identifiers to display labels.
pub trait LabelResolver {
    fn label(&self, feature_id: &str) -> String;
}

/// Identity resolution.
pub struct RawIds;

impl LabelResolver for RawIds {
    fn label(&self, feature_id: &str) -> String {
        feature_id.to_string()
    }
}

/// Source of assay matrices and their sample annotation.
///
/// Everything handed out is read-only to the plots; annotation rows line up
/// with matrix columns.
pub trait AssayProvider {
    fn experiments(&self) -> Vec<ExperimentInfo>;

    fn matrix(&self, selection: &MatrixSelection) -> Result<AssayMatrix, BoxplotError>;

    fn annotation(&self, selection: &MatrixSelection) -> Result<DataFrame, BoxplotError>;

    /// Human-readable unit of the values, e.g. "normalised counts".
    fn measurement_type(&self, selection: &MatrixSelection) -> Result<String, BoxplotError>;

    fn palette(
        &self,
        selection: &MatrixSelection,
        group_column: &str,
    ) -> Result<GroupPalette, BoxplotError>;

    fn feature_labels(&self, selection: &MatrixSelection) -> Result<FeatureLabels, BoxplotError>;
}
