pub mod long_form;
pub mod quantiles;
