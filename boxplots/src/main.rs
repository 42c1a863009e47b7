use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use boxplots::config::BoxplotConfig;
use boxplots::controller::{BoxplotSession, InputEvent, RenderedPlot};
use boxplots::data_handling::experiment::{Experiment, ExperimentStore, FeatureLabels};
use boxplots::helper_functions::project_root;
use boxplots::models::PlotType;
use boxplots::ui::{AssetLoader, DirAssetLoader, EmbeddedAssets};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Render quartile plots of an assay matrix and dump the panel descriptors.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct Cli {
    /// Matrix CSV: first column feature ids, one column per sample.
    #[arg(long, required_unless_present = "write_config")]
    matrix: Option<PathBuf>,

    /// Sample annotation CSV: first column sample ids.
    #[arg(long, required_unless_present = "write_config")]
    annotation: Option<PathBuf>,

    /// Optional feature id -> label CSV.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Unit of the matrix values, used in the y axis title.
    #[arg(long, default_value = "counts")]
    measurement: String,

    #[arg(long, default_value = "experiment")]
    experiment_name: String,

    #[arg(long, default_value = "counts")]
    assay_name: String,

    /// Annotation column to colour boxes by; pass an empty string for none.
    #[arg(long)]
    group_by: Option<String>,

    #[arg(long)]
    whisker: Option<String>,

    /// `boxes` or `lines`; picked from the sample count when omitted.
    #[arg(long)]
    plot_type: Option<PlotType>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "boxplot_output")]
    output_dir: PathBuf,

    #[arg(long, default_value = "boxplot")]
    namespace: String,

    /// Write the default configuration to this path and exit.
    #[arg(long)]
    write_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.write_config {
        BoxplotConfig::default().write_json(path)?;
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => BoxplotConfig::from_json_file(path)?,
        None => BoxplotConfig::default(),
    };

    let matrix_path = cli.matrix.as_ref().context("--matrix is required")?;
    let annotation_path = cli.annotation.as_ref().context("--annotation is required")?;
    let mut experiment = Experiment::from_csv(
        &cli.experiment_name,
        &cli.assay_name,
        &cli.measurement,
        matrix_path,
        annotation_path,
    )
    .with_context(|| format!("loading {}", matrix_path.display()))?;
    if let Some(path) = &cli.labels {
        let labels = FeatureLabels::from_csv(path)?;
        info!("Loaded {} feature labels", labels.len());
        experiment = experiment.with_feature_labels(labels);
    }
    let store = ExperimentStore::new(vec![experiment]);

    let mut session = BoxplotSession::new(cli.namespace.as_str(), &store, config)?;
    if let Some(plot_type) = cli.plot_type {
        session.handle(InputEvent::PlotType(plot_type))?;
    }
    if let Some(raw) = cli.whisker {
        session.handle(InputEvent::WhiskerDistance(raw))?;
    }
    if let Some(column) = cli.group_by {
        session.handle(InputEvent::GroupBy(Some(column)))?;
    }
    let plot = session.refresh()?.clone();

    fs::create_dir_all(&cli.output_dir)?;

    let asset_dir = project_root().join("assets");
    let assets: Box<dyn AssetLoader> = if asset_dir.join(&session.config().help_asset).is_file() {
        Box::new(DirAssetLoader { root: asset_dir })
    } else {
        Box::new(EmbeddedAssets::default())
    };
    let controls = session.control_panel();
    let outputs = json!({
        "panel": session.output_panel(assets.as_ref())?,
        "placeholder": session.placeholder_content(),
    });
    fs::write(
        cli.output_dir.join("controls.json"),
        serde_json::to_string_pretty(&controls)?,
    )?;
    fs::write(
        cli.output_dir.join("outputs.json"),
        serde_json::to_string_pretty(&outputs)?,
    )?;

    match &plot {
        RenderedPlot::Boxplot { svg, .. } => {
            let path = cli.output_dir.join("boxplot.svg");
            fs::write(&path, svg)?;
            info!("Wrote {}", path.display());
        }
        RenderedPlot::Quartiles { .. } => {
            let path = cli.output_dir.join("quartiles.html");
            session.quartile_chart()?.plot.write_html(&path);
            info!("Wrote {}", path.display());
        }
        RenderedPlot::NoData { reason } => {
            warn!("No plot written: {reason}");
            return Ok(());
        }
    }

    let export = session.export_boxplot(&cli.output_dir)?;
    info!("Exported {}", export.display());
    Ok(())
}
