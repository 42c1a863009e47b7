//! Session state for one boxplot module instance.
//!
//! The host delivers input changes one at a time through [`BoxplotSession::handle`].
//! The session keeps the last rendered view together with the inputs it was
//! rendered from, and only recomputes when an input that the visible view
//! depends on has changed.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::quantiles::QuantileSummary;
use crate::config::BoxplotConfig;
use crate::data_handling::assay_matrix::AssayMatrix;
use crate::error::BoxplotError;
use crate::models::{AssayProvider, MatrixSelection, PlotType, WhiskerDistance};
use crate::plots::boxplot::{render_boxplot_png, render_boxplot_svg, BoxplotData, BoxplotRequest};
use crate::plots::quartile_lines::{quartile_chart, QuartileChart};
use crate::ui::controls::control_panel;
use crate::ui::output::output_panel;
use crate::ui::{ns, AssetLoader, Widget};

pub const BOX_PLOT_ID: &str = "boxPlot";
pub const QUARTILES_PLOT_ID: &str = "quartilesPlotly";

/// A single input change coming from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PlotType(PlotType),
    /// Raw text of the numeric input; validated before it is applied.
    WhiskerDistance(String),
    /// `None` or an empty name switches grouping off.
    GroupBy(Option<String>),
    Matrix(MatrixSelection),
}

/// The current content of the plot region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedPlot {
    Boxplot { svg: String, width: u32, height: u32 },
    Quartiles { chart_json: String, height: u32 },
    /// The selected matrix has no samples or no features.
    NoData { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInputs {
    pub plot_type: PlotType,
    pub whisker_distance: WhiskerDistance,
    pub group_by: Option<String>,
    pub selection: MatrixSelection,
}

/// The inputs a view depends on. Grouping only matters to the box view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RenderKey {
    plot_type: PlotType,
    selection: MatrixSelection,
    whisker_bits: u64,
    group_by: Option<String>,
}

impl RenderKey {
    fn of(inputs: &SessionInputs) -> Self {
        Self {
            plot_type: inputs.plot_type,
            selection: inputs.selection.clone(),
            whisker_bits: inputs.whisker_distance.key(),
            group_by: match inputs.plot_type {
                PlotType::Boxes => inputs.group_by.clone(),
                PlotType::Lines => None,
            },
        }
    }
}

pub struct BoxplotSession<'a, P: AssayProvider + ?Sized> {
    namespace: String,
    provider: &'a P,
    config: BoxplotConfig,
    inputs: SessionInputs,
    current: Option<(RenderKey, RenderedPlot)>,
    renders: usize,
}

impl<'a, P: AssayProvider + ?Sized> BoxplotSession<'a, P> {
    /// Start on the first experiment's first assay with the default plot type,
    /// whisker distance and grouping variable. Nothing is rendered yet.
    pub fn new(
        namespace: impl Into<String>,
        provider: &'a P,
        config: BoxplotConfig,
    ) -> Result<Self, BoxplotError> {
        let experiments = provider.experiments();
        let first = experiments.first().ok_or(BoxplotError::NoExperiments)?;
        let assay = first
            .assays
            .first()
            .ok_or_else(|| BoxplotError::UnknownAssay {
                experiment: first.name.clone(),
                assay: String::new(),
            })?;

        let inputs = SessionInputs {
            plot_type: crate::ui::controls::default_plot_type(&experiments, &config),
            whisker_distance: WhiskerDistance::new(config.default_whisker_distance)?,
            group_by: first.group_vars.first().map(|g| g.name.clone()),
            selection: MatrixSelection::new(first.name.clone(), assay.clone()),
        };
        info!(
            "Boxplot session on {}/{} starts with {} view",
            inputs.selection.experiment, inputs.selection.assay, inputs.plot_type
        );

        Ok(Self {
            namespace: namespace.into(),
            provider,
            config,
            inputs,
            current: None,
            renders: 0,
        })
    }

    pub fn inputs(&self) -> &SessionInputs {
        &self.inputs
    }

    pub fn config(&self) -> &BoxplotConfig {
        &self.config
    }

    /// The last rendered view, if any.
    pub fn current(&self) -> Option<&RenderedPlot> {
        self.current.as_ref().map(|(_, plot)| plot)
    }

    /// How many times a renderer actually ran.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn control_panel(&self) -> Widget {
        control_panel(&self.namespace, &self.provider.experiments(), &self.config)
    }

    pub fn output_panel(&self, assets: &dyn AssetLoader) -> Result<Widget, BoxplotError> {
        output_panel(&self.namespace, assets, &self.config)
    }

    /// What goes into the output placeholder for the selected plot type.
    pub fn placeholder_content(&self) -> Widget {
        match self.inputs.plot_type {
            PlotType::Boxes => Widget::StaticPlot {
                id: ns(&self.namespace, BOX_PLOT_ID),
                width: self.config.display_width,
                height: self.config.display_height,
            },
            PlotType::Lines => Widget::InteractiveChart {
                id: ns(&self.namespace, QUARTILES_PLOT_ID),
                height: self.config.chart_height,
            },
        }
    }

    /// Apply one input change and redraw if needed. The change is only
    /// committed once it has been validated and the view rendered; on any
    /// error the inputs and the current view stay as they were.
    pub fn handle(&mut self, event: InputEvent) -> Result<&RenderedPlot, BoxplotError> {
        debug!("Input event: {:?}", event);
        let mut next = self.inputs.clone();
        match event {
            InputEvent::PlotType(plot_type) => next.plot_type = plot_type,
            InputEvent::WhiskerDistance(raw) => {
                next.whisker_distance = WhiskerDistance::parse(&raw)?;
            }
            InputEvent::GroupBy(column) => {
                let column = column.filter(|c| !c.is_empty());
                if let Some(name) = &column {
                    self.check_column(&next.selection, name)?;
                }
                next.group_by = column;
            }
            InputEvent::Matrix(selection) => {
                // fail early on unknown names or filter columns
                self.provider.matrix(&selection)?;
                next.group_by = match &next.group_by {
                    Some(name) if self.check_column(&selection, name).is_ok() => Some(name.clone()),
                    Some(name) => {
                        warn!("Grouping column '{name}' not in {}, grouping reset", selection.experiment);
                        self.first_group_var(&selection.experiment)
                    }
                    None => None,
                };
                next.selection = selection;
            }
        }
        self.redraw(next)
    }

    /// Render the visible view unless it is already up to date.
    pub fn refresh(&mut self) -> Result<&RenderedPlot, BoxplotError> {
        self.redraw(self.inputs.clone())
    }

    fn redraw(&mut self, inputs: SessionInputs) -> Result<&RenderedPlot, BoxplotError> {
        let key = RenderKey::of(&inputs);
        let stale = self.current.as_ref().map_or(true, |(k, _)| *k != key);
        if stale {
            let plot = match self.render(&inputs) {
                Ok(plot) => plot,
                Err(BoxplotError::Data(PolarsError::NoData(reason))) => {
                    warn!("Nothing to plot: {reason}");
                    RenderedPlot::NoData {
                        reason: reason.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };
            self.renders += 1;
            self.current = Some((key, plot));
        } else {
            debug!("Inputs unchanged, keeping the current {} view", inputs.plot_type);
        }
        self.inputs = inputs;
        match &self.current {
            Some((_, plot)) => Ok(plot),
            None => Err(BoxplotError::Data(PolarsError::NoData("nothing rendered".into()))),
        }
    }

    fn render(&self, inputs: &SessionInputs) -> Result<RenderedPlot, BoxplotError> {
        let selection = &inputs.selection;
        let matrix = self.provider.matrix(selection)?;
        let measurement = self.provider.measurement_type(selection)?;
        info!(
            "Rendering {} view of {}/{}: {} features x {} samples",
            inputs.plot_type,
            selection.experiment,
            selection.assay,
            matrix.n_features(),
            matrix.n_samples()
        );

        match inputs.plot_type {
            PlotType::Boxes => {
                let annotation = self.provider.annotation(selection)?;
                let palette = match &inputs.group_by {
                    Some(column) => Some(self.provider.palette(selection, column)?),
                    None => None,
                };
                let data = BoxplotData::prepare(&BoxplotRequest {
                    matrix: &matrix,
                    annotation: &annotation,
                    group_by: inputs.group_by.as_deref(),
                    palette: palette.as_ref(),
                    measurement_type: &measurement,
                    whisker_distance: inputs.whisker_distance,
                    ylab_wrap_width: self.config.ylab_wrap_width,
                })?;
                let (width, height) = (self.config.display_width, self.config.display_height);
                let svg = render_boxplot_svg(&data, (width, height))?;
                Ok(RenderedPlot::Boxplot { svg, width, height })
            }
            PlotType::Lines => {
                let chart = self.build_quartile_chart(inputs, &matrix, &measurement)?;
                Ok(RenderedPlot::Quartiles {
                    chart_json: chart.to_json(),
                    height: self.config.chart_height,
                })
            }
        }
    }

    /// The quartile chart of the current selection, whatever the visible view.
    pub fn quartile_chart(&self) -> Result<QuartileChart, BoxplotError> {
        let selection = &self.inputs.selection;
        let matrix = self.provider.matrix(selection)?;
        let measurement = self.provider.measurement_type(selection)?;
        self.build_quartile_chart(&self.inputs, &matrix, &measurement)
    }

    fn build_quartile_chart(
        &self,
        inputs: &SessionInputs,
        matrix: &AssayMatrix,
        measurement: &str,
    ) -> Result<QuartileChart, BoxplotError> {
        let labels = self.provider.feature_labels(&inputs.selection)?;
        Ok(quartile_chart(
            matrix,
            &labels,
            measurement,
            inputs.whisker_distance,
            self.config.chart_height as usize,
        )?)
    }

    /// Uncoloured boxplot of the current selection, written as a PNG into
    /// `dir` under the configured export file name.
    pub fn export_boxplot(&self, dir: &Path) -> Result<PathBuf, BoxplotError> {
        let selection = &self.inputs.selection;
        let matrix = self.provider.matrix(selection)?;
        let annotation = self.provider.annotation(selection)?;
        let measurement = self.provider.measurement_type(selection)?;
        let data = BoxplotData::prepare(&BoxplotRequest {
            matrix: &matrix,
            annotation: &annotation,
            group_by: None,
            palette: None,
            measurement_type: &measurement,
            whisker_distance: self.inputs.whisker_distance,
            ylab_wrap_width: self.config.ylab_wrap_width,
        })?;
        let path = dir.join(&self.config.export_filename);
        render_boxplot_png(
            &data,
            &path,
            (self.config.export_width, self.config.export_height),
        )?;
        Ok(path)
    }

    /// Per-sample five-number summary of the current selection after the
    /// log2(v + 1) transform.
    pub fn quantile_table(&self) -> Result<DataFrame, BoxplotError> {
        let matrix: AssayMatrix = self.provider.matrix(&self.inputs.selection)?;
        Ok(QuantileSummary::compute(&matrix.log2p())?.to_dataframe()?)
    }

    fn check_column(&self, selection: &MatrixSelection, column: &str) -> Result<(), BoxplotError> {
        let annotation = self.provider.annotation(selection)?;
        if annotation.column(column).is_err() {
            return Err(BoxplotError::UnknownColumn(column.to_string()));
        }
        Ok(())
    }

    fn first_group_var(&self, experiment: &str) -> Option<String> {
        self.provider
            .experiments()
            .into_iter()
            .find(|e| e.name == experiment)
            .and_then(|e| e.group_vars.into_iter().next())
            .map(|g| g.name)
    }
}
