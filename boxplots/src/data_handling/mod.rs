pub mod assay_matrix;
pub mod experiment;
pub mod grouping;
