//! Per-sample quartile plots of an assay matrix: a static boxplot for small
//! experiments and an interactive quartile line chart for large ones, plus the
//! control and output panels that drive them.

pub mod analysis;
pub mod config;
pub mod controller;
pub mod data_handling;
pub mod error;
pub mod helper_functions;
pub mod models;
pub mod plots;
pub mod ui;

pub use config::BoxplotConfig;
pub use controller::{BoxplotSession, InputEvent, RenderedPlot};
pub use error::BoxplotError;
