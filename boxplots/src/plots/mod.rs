use std::fmt::Display;

use polars::prelude::PolarsError;

pub mod boxplot;
pub mod gene_model;
pub mod quartile_lines;

/// Plotting backend failures surface as polars compute errors like every
/// other failure in the data path.
pub(crate) fn render_err<E: Display>(e: E) -> PolarsError {
    PolarsError::ComputeError(format!("rendering failed: {e}").into())
}
