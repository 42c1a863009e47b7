//! Control panel: plot type, whisker distance, colour-by grouping, matrix
//! selection and export.

use crate::config::BoxplotConfig;
use crate::data_handling::experiment::{ExperimentInfo, GroupVariable};
use crate::models::PlotType;
use crate::ui::{ns, Choice, Widget};

pub const PLOT_TYPE_ID: &str = "plotType";
pub const WHISKER_DISTANCE_ID: &str = "whiskerDistance";
pub const COLOR_BY_ID: &str = "colorBy";
pub const EXPERIMENT_ID: &str = "experiment";
pub const ASSAY_ID: &str = "assay";
pub const SAMPLE_FILTER_COLUMN_ID: &str = "sampleFilterColumn";
pub const SAMPLE_FILTER_VALUES_ID: &str = "sampleFilterValues";
pub const EXPORT_ID: &str = "exportBoxplot";

/// Boxes for small experiments, lines for large ones, judged on the first
/// experiment.
pub fn default_plot_type(experiments: &[ExperimentInfo], config: &BoxplotConfig) -> PlotType {
    let samples = experiments.first().map_or(0, |e| e.sample_count);
    if samples <= config.boxes_max_samples {
        PlotType::Boxes
    } else {
        PlotType::Lines
    }
}

pub fn control_panel(namespace: &str, experiments: &[ExperimentInfo], config: &BoxplotConfig) -> Widget {
    let plot_type = default_plot_type(experiments, config);
    let group_vars: &[GroupVariable] = experiments.first().map_or(&[], |e| e.group_vars.as_slice());

    let mut children = vec![Widget::FieldSet {
        id: ns(namespace, "boxplotOptions"),
        legend: "Plot options".to_string(),
        children: vec![
            Widget::RadioButtons {
                id: ns(namespace, PLOT_TYPE_ID),
                label: "Plot type".to_string(),
                choices: [PlotType::Boxes, PlotType::Lines]
                    .iter()
                    .map(|p| Choice::new(p.label(), p.value()))
                    .collect(),
                selected: plot_type.value().to_string(),
            },
            Widget::NumericInput {
                id: ns(namespace, WHISKER_DISTANCE_ID),
                label: "Whisker distance in multiples of IQR".to_string(),
                value: config.default_whisker_distance,
                min: Some(0.0),
                step: Some(0.1),
            },
        ],
    }];

    if let Some(grouping) = grouping_controls(namespace, group_vars) {
        children.push(grouping);
    }
    children.push(matrix_selection_controls(namespace, experiments));
    children.push(Widget::FieldSet {
        id: ns(namespace, "export"),
        legend: "Export".to_string(),
        children: vec![Widget::DownloadButton {
            id: ns(namespace, EXPORT_ID),
            label: "Download plot".to_string(),
            filename: config.export_filename.clone(),
        }],
    });

    Widget::Panel { children }
}

/// Colour-by selector; `None` when there is nothing to group by.
pub fn grouping_controls(namespace: &str, group_vars: &[GroupVariable]) -> Option<Widget> {
    let first = group_vars.first()?;
    Some(Widget::FieldSet {
        id: ns(namespace, "colors"),
        legend: "Colors".to_string(),
        children: vec![Widget::Select {
            id: ns(namespace, COLOR_BY_ID),
            label: "Color by".to_string(),
            choices: group_vars.iter().map(|g| Choice::plain(g.name.as_str())).collect(),
            selected: vec![first.name.clone()],
            multiple: false,
        }],
    })
}

/// Experiment and assay pickers, plus a sample filter on the first
/// experiment's first grouping variable when it has one.
pub fn matrix_selection_controls(namespace: &str, experiments: &[ExperimentInfo]) -> Widget {
    let mut children = vec![Widget::Select {
        id: ns(namespace, EXPERIMENT_ID),
        label: "Experiment".to_string(),
        choices: experiments.iter().map(|e| Choice::plain(e.name.as_str())).collect(),
        selected: experiments.first().map(|e| e.name.clone()).into_iter().collect(),
        multiple: false,
    }];

    if let Some(first) = experiments.first() {
        children.push(Widget::Select {
            id: ns(namespace, ASSAY_ID),
            label: "Matrix".to_string(),
            choices: first.assays.iter().map(|a| Choice::plain(a.as_str())).collect(),
            selected: first.assays.first().cloned().into_iter().collect(),
            multiple: false,
        });

        if let Some(var) = first.group_vars.first() {
            children.push(Widget::Select {
                id: ns(namespace, SAMPLE_FILTER_COLUMN_ID),
                label: "Select samples by".to_string(),
                choices: first
                    .group_vars
                    .iter()
                    .map(|g| Choice::plain(g.name.as_str()))
                    .collect(),
                selected: vec![var.name.clone()],
                multiple: false,
            });
            children.push(Widget::Select {
                id: ns(namespace, SAMPLE_FILTER_VALUES_ID),
                label: "Groups".to_string(),
                choices: var.levels.iter().map(|l| Choice::plain(l.as_str())).collect(),
                selected: var.levels.clone(),
                multiple: true,
            });
        }
    }

    Widget::FieldSet {
        id: ns(namespace, "selectSamples"),
        legend: "Select samples".to_string(),
        children,
    }
}
