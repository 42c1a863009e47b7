//! Interactive quartile chart for matrices with many samples: one line per
//! quantile bound across samples, outliers as hoverable points.

use plotly::common::{DashType, HoverInfo, Line, Marker, Mode};
use plotly::layout::{Axis, AxisType};
use plotly::{Layout, Plot, Scatter};
use polars::prelude::*;
use tracing::info;

use crate::analysis::quantiles::{Outlier, QuantileSummary};
use crate::data_handling::assay_matrix::AssayMatrix;
use crate::models::{LabelResolver, WhiskerDistance};

const MARGIN_COLOUR: &str = "#7f7f7f";
const QUARTILE_COLOUR: &str = "#1f77b4";
const MEDIAN_COLOUR: &str = "#000000";
const OUTLIER_COLOUR: &str = "#d62728";

pub struct QuartileChart {
    pub summary: QuantileSummary,
    pub outliers: Vec<Outlier>,
    pub plot: Plot,
}

impl QuartileChart {
    pub fn to_json(&self) -> String {
        self.plot.to_json()
    }

    pub fn to_inline_html(&self, div_id: &str) -> String {
        self.plot.to_inline_html(Some(div_id))
    }
}

fn bound_trace(
    samples: &[String],
    values: Vec<f64>,
    name: String,
    line: Line,
) -> Box<Scatter<String, f64>> {
    Scatter::new(samples.to_vec(), values)
        .mode(Mode::Lines)
        .name(name)
        .line(line)
}

/// Build the quartile chart of the raw (untransformed) `matrix`.
///
/// Sample order on the x axis is the matrix column order.
pub fn quartile_chart(
    matrix: &AssayMatrix,
    labels: &dyn LabelResolver,
    measurement_type: &str,
    whisker_distance: WhiskerDistance,
    height: usize,
) -> PolarsResult<QuartileChart> {
    let logged = matrix.log2p();
    let summary = QuantileSummary::compute(&logged)?;
    let outliers = summary.outliers(&logged, whisker_distance, labels);
    info!(
        "Quartile chart over {} samples x {} features, {} outliers",
        matrix.n_samples(),
        matrix.n_features(),
        outliers.len()
    );

    let k = whisker_distance.get();
    let samples = &summary.samples;
    let margin_line = || Line::new().color(MARGIN_COLOUR).dash(DashType::Dash).width(1.0);

    let mut plot = Plot::new();
    // The full-length traces go first: the category axis takes its order
    // from the first trace that mentions each sample.
    plot.add_trace(bound_trace(
        samples,
        summary.column(|s| s.upper_fence(whisker_distance)),
        format!("75% + {k} x IQR"),
        margin_line(),
    ));
    plot.add_trace(bound_trace(
        samples,
        summary.column(|s| s.q75),
        "75%".to_string(),
        Line::new().color(QUARTILE_COLOUR).width(1.5),
    ));
    plot.add_trace(bound_trace(
        samples,
        summary.column(|s| s.median),
        "median".to_string(),
        Line::new().color(MEDIAN_COLOUR).width(2.5),
    ));
    plot.add_trace(bound_trace(
        samples,
        summary.column(|s| s.q25),
        "25%".to_string(),
        Line::new().color(QUARTILE_COLOUR).width(1.5),
    ));
    plot.add_trace(bound_trace(
        samples,
        summary.column(|s| s.lower_fence(whisker_distance)),
        format!("25% - {k} x IQR"),
        margin_line(),
    ));

    let outlier_trace = Scatter::new(
        outliers.iter().map(|o| o.sample.clone()).collect::<Vec<_>>(),
        outliers.iter().map(|o| o.value).collect::<Vec<_>>(),
    )
    .mode(Mode::Markers)
    .name("outliers")
    .marker(Marker::new().color(OUTLIER_COLOUR).size(5))
    .hover_text_array(outliers.iter().map(|o| o.label.clone()).collect::<Vec<_>>())
    .hover_info(HoverInfo::Text);
    plot.add_trace(outlier_trace);

    let layout = Layout::new()
        .height(height)
        .x_axis(Axis::new().type_(AxisType::Category).tick_angle(90.0))
        .y_axis(Axis::new().title(format!("log2({measurement_type})")));
    plot.set_layout(layout);

    Ok(QuartileChart {
        summary,
        outliers,
        plot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::experiment::FeatureLabels;
    use crate::models::RawIds;
    use ndarray::{array, Array2};
    use serde_json::Value;
    use std::collections::HashMap;

    fn traces(chart: &QuartileChart) -> Vec<Value> {
        let json: Value = serde_json::from_str(&chart.to_json()).unwrap();
        json["data"].as_array().unwrap().clone()
    }

    fn matrix(values: Array2<f64>, samples: &[&str]) -> AssayMatrix {
        let features = (0..values.nrows()).map(|i| format!("ENSG{i}")).collect();
        AssayMatrix::new(features, samples.iter().map(|s| s.to_string()).collect(), values).unwrap()
    }

    #[test]
    fn six_traces_in_column_order() {
        let m = matrix(
            array![[0.0, 1.0, 3.0], [1.0, 3.0, 7.0], [3.0, 7.0, 15.0], [7.0, 15.0, 31.0]],
            &["10", "2", "1"],
        );
        let chart = quartile_chart(&m, &RawIds, "counts", WhiskerDistance::default(), 600).unwrap();
        let data = traces(&chart);
        assert_eq!(data.len(), 6);
        for trace in &data[..5] {
            assert_eq!(trace["x"], serde_json::json!(["10", "2", "1"]));
        }
        assert_eq!(data[0]["name"], "75% + 1.5 x IQR");
        assert_eq!(data[4]["line"]["dash"], "dash");

        let json: Value = serde_json::from_str(&chart.to_json()).unwrap();
        assert_eq!(json["layout"]["xaxis"]["type"], "category");
        assert_eq!(json["layout"]["height"], 600);
        assert!(json["layout"]["yaxis"]["title"].to_string().contains("log2(counts)"));
    }

    #[test]
    fn no_outliers_gives_an_empty_series() {
        let m = matrix(array![[0.0, 1.0], [1.0, 3.0], [3.0, 7.0]], &["A", "B"]);
        let chart = quartile_chart(&m, &RawIds, "counts", WhiskerDistance::default(), 600).unwrap();
        assert!(chart.outliers.is_empty());
        let outlier_trace = &traces(&chart)[5];
        assert_eq!(outlier_trace["x"], serde_json::json!([]));
    }

    #[test]
    fn outliers_carry_resolved_labels() {
        let mut values = Array2::<f64>::from_elem((8, 2), 3.0);
        for i in 0..8 {
            values[[i, 0]] = (i as f64 + 1.0).exp2() - 1.0;
        }
        values[[7, 1]] = 1023.0;
        values[[0, 1]] = 1.0;
        let m = matrix(values, &["A", "B"]);
        let labels = FeatureLabels::new(HashMap::from([("ENSG7".to_string(), "TP53".to_string())]));

        let chart = quartile_chart(&m, &labels, "counts", WhiskerDistance::default(), 600).unwrap();
        let flagged: Vec<(&str, &str)> = chart
            .outliers
            .iter()
            .map(|o| (o.sample.as_str(), o.label.as_str()))
            .collect();
        assert_eq!(flagged, vec![("B", "ENSG0"), ("B", "TP53")]);
        let outlier_trace = &traces(&chart)[5];
        assert_eq!(outlier_trace["hovertext"], serde_json::json!(["ENSG0", "TP53"]));
    }

    #[test]
    fn non_finite_cells_do_not_break_the_chart() {
        for bad in [-1.0, f64::INFINITY] {
            let m = matrix(
                array![[bad, 3.0], [3.0, 7.0], [7.0, 15.0], [15.0, 31.0]],
                &["A", "B"],
            );
            let chart = quartile_chart(&m, &RawIds, "counts", WhiskerDistance::default(), 600).unwrap();
            let a = chart.summary.stats[0];
            assert_eq!((a.min, a.median, a.max), (2.0, 3.0, 4.0));
            assert_eq!(chart.summary.stats[1].median, 3.5);
            assert!(chart.outliers.is_empty());
            assert_eq!(traces(&chart).len(), 6);
        }
    }

    #[test]
    fn empty_matrix_is_no_data() {
        let m = matrix(Array2::zeros((3, 0)), &[]);
        assert!(matches!(
            quartile_chart(&m, &RawIds, "counts", WhiskerDistance::default(), 600),
            Err(PolarsError::NoData(_))
        ));
    }
}
