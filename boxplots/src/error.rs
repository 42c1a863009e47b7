use polars::prelude::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum BoxplotError {
    #[error("whisker distance must be a non-negative number, got '{0}'")]
    InvalidWhiskerDistance(String),
    #[error("unknown experiment: {0}")]
    UnknownExperiment(String),
    #[error("unknown assay '{assay}' in experiment '{experiment}'")]
    UnknownAssay { experiment: String, assay: String },
    #[error("unknown annotation column: {0}")]
    UnknownColumn(String),
    #[error("no experiments available")]
    NoExperiments,
    #[error("asset not found: {0}")]
    AssetNotFound(String),
    #[error("data error: {0}")]
    Data(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
