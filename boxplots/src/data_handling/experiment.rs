use std::collections::HashMap;
use std::path::Path;

use plotters::style::RGBColor;
use polars::prelude::*;
use serde::Serialize;
use tracing::{error, info};

use crate::data_handling::assay_matrix::AssayMatrix;
use crate::data_handling::grouping::{first_occurrence_order, group_labels, grouping_candidates};
use crate::error::BoxplotError;
use crate::helper_functions::read_csv;
use crate::models::{AssayProvider, LabelResolver, MatrixSelection};

/// Colour-blind-safe colours handed out to group levels in order.
pub const DEFAULT_GROUP_COLOURS: [RGBColor; 8] = [
    RGBColor(230, 159, 0),
    RGBColor(86, 180, 233),
    RGBColor(0, 158, 115),
    RGBColor(240, 228, 66),
    RGBColor(0, 114, 178),
    RGBColor(213, 94, 0),
    RGBColor(204, 121, 167),
    RGBColor(0, 0, 0),
];

const UNMAPPED_COLOUR: RGBColor = RGBColor(160, 160, 160);

/// Group value -> colour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupPalette {
    colours: Vec<(String, RGBColor)>,
}

impl GroupPalette {
    pub fn for_levels<S: AsRef<str>>(levels: &[S]) -> Self {
        let colours = levels
            .iter()
            .zip(DEFAULT_GROUP_COLOURS.iter().cycle())
            .map(|(level, colour)| (level.as_ref().to_string(), *colour))
            .collect();
        Self { colours }
    }

    pub fn with_colour(mut self, level: impl Into<String>, colour: RGBColor) -> Self {
        let level = level.into();
        match self.colours.iter_mut().find(|(l, _)| *l == level) {
            Some(slot) => slot.1 = colour,
            None => self.colours.push((level, colour)),
        }
        self
    }

    pub fn colour(&self, level: &str) -> RGBColor {
        self.colours
            .iter()
            .find(|(l, _)| l == level)
            .map(|(_, c)| *c)
            .unwrap_or(UNMAPPED_COLOUR)
    }

    /// CSS hex form, e.g. `#e69f00`.
    pub fn hex(&self, level: &str) -> String {
        let RGBColor(r, g, b) = self.colour(level);
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// Feature id -> display label (e.g. Ensembl id -> gene symbol).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureLabels(HashMap<String, String>);

impl FeatureLabels {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self(map)
    }

    /// Two-column CSV: feature id, label.
    pub fn from_csv(path: impl AsRef<Path>) -> PolarsResult<Self> {
        let df = read_csv(path)?;
        let columns = df.get_columns();
        if columns.len() < 2 {
            return Err(PolarsError::ShapeMismatch(
                "feature label table needs an id and a label column".into(),
            ));
        }
        let ids = columns[0].cast(&DataType::String)?;
        let labels = columns[1].cast(&DataType::String)?;
        let map = ids
            .str()?
            .into_iter()
            .zip(labels.str()?.into_iter())
            .filter_map(|(id, label)| Some((id?.to_string(), label?.to_string())))
            .collect();
        Ok(Self(map))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl LabelResolver for FeatureLabels {
    fn label(&self, feature_id: &str) -> String {
        self.0
            .get(feature_id)
            .cloned()
            .unwrap_or_else(|| feature_id.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Assay {
    pub name: String,
    pub measurement: String,
    pub matrix: AssayMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupVariable {
    pub name: String,
    pub levels: Vec<String>,
}

/// What the control panel needs to know about an experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentInfo {
    pub name: String,
    pub assays: Vec<String>,
    pub sample_count: usize,
    pub group_vars: Vec<GroupVariable>,
}

/// One experiment: several assays over the same samples plus their
/// annotation, one annotation row per matrix column.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub name: String,
    pub annotation: DataFrame,
    pub assays: Vec<Assay>,
    pub group_vars: Vec<String>,
    pub palettes: HashMap<String, GroupPalette>,
    pub feature_labels: FeatureLabels,
}

impl Experiment {
    pub fn new(
        name: impl Into<String>,
        annotation: DataFrame,
        assays: Vec<Assay>,
    ) -> PolarsResult<Self> {
        let name = name.into();
        for assay in &assays {
            if assay.matrix.n_samples() != annotation.height() {
                return Err(PolarsError::ShapeMismatch(
                    format!(
                        "assay '{}' of '{}' has {} samples but the annotation has {} rows",
                        assay.name,
                        name,
                        assay.matrix.n_samples(),
                        annotation.height()
                    )
                    .into(),
                ));
            }
        }
        let group_vars = grouping_candidates(&annotation)?;
        Ok(Self {
            name,
            annotation,
            assays,
            group_vars,
            palettes: HashMap::new(),
            feature_labels: FeatureLabels::default(),
        })
    }

    /// Load one assay from a matrix CSV and its sample annotation CSV.
    ///
    /// Annotation rows are matched to matrix columns through the first
    /// annotation column and reordered to follow the matrix.
    pub fn from_csv(
        name: &str,
        assay_name: &str,
        measurement: &str,
        matrix_path: impl AsRef<Path>,
        annotation_path: impl AsRef<Path>,
    ) -> PolarsResult<Self> {
        let matrix_path = matrix_path.as_ref();
        info!("Reading assay matrix from {}", matrix_path.display());
        let matrix_df = match read_csv(matrix_path) {
            Ok(df) => df,
            Err(e) => {
                error!("Failed to read matrix CSV: {}", e);
                return Err(e);
            }
        };
        let matrix = AssayMatrix::from_dataframe(&matrix_df)?;

        let annotation_path = annotation_path.as_ref();
        info!("Reading sample annotation from {}", annotation_path.display());
        let annotation = read_csv(annotation_path)?;
        let annotation = align_annotation(&annotation, matrix.samples())?;

        Self::new(
            name,
            annotation,
            vec![Assay {
                name: assay_name.to_string(),
                measurement: measurement.to_string(),
                matrix,
            }],
        )
    }

    pub fn with_group_vars(mut self, group_vars: Vec<String>) -> Self {
        self.group_vars = group_vars;
        self
    }

    pub fn with_palette(mut self, column: impl Into<String>, palette: GroupPalette) -> Self {
        self.palettes.insert(column.into(), palette);
        self
    }

    pub fn with_feature_labels(mut self, labels: FeatureLabels) -> Self {
        self.feature_labels = labels;
        self
    }

    pub fn sample_count(&self) -> usize {
        self.annotation.height()
    }

    pub fn info(&self) -> PolarsResult<ExperimentInfo> {
        let group_vars = self
            .group_vars
            .iter()
            .map(|name| {
                let labels = group_labels(&self.annotation, name)?;
                let (_, levels) = first_occurrence_order(&labels);
                Ok(GroupVariable {
                    name: name.clone(),
                    levels,
                })
            })
            .collect::<PolarsResult<Vec<_>>>()?;

        Ok(ExperimentInfo {
            name: self.name.clone(),
            assays: self.assays.iter().map(|a| a.name.clone()).collect(),
            sample_count: self.sample_count(),
            group_vars,
        })
    }

    fn assay(&self, name: &str) -> Result<&Assay, BoxplotError> {
        self.assays
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| BoxplotError::UnknownAssay {
                experiment: self.name.clone(),
                assay: name.to_string(),
            })
    }

    /// Indices of samples kept by the selection's filter, in matrix order.
    fn selected_samples(&self, selection: &MatrixSelection) -> Result<Option<Vec<usize>>, BoxplotError> {
        let Some(filter) = &selection.sample_filter else {
            return Ok(None);
        };
        if self.annotation.column(&filter.column).is_err() {
            return Err(BoxplotError::UnknownColumn(filter.column.clone()));
        }
        let labels = group_labels(&self.annotation, &filter.column)?;
        let keep = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| filter.values.contains(label))
            .map(|(i, _)| i)
            .collect();
        Ok(Some(keep))
    }
}

/// Reorder annotation rows so that row `i` describes `samples[i]`.
fn align_annotation(annotation: &DataFrame, samples: &[String]) -> PolarsResult<DataFrame> {
    let Some(id_col) = annotation.get_columns().first() else {
        return Err(PolarsError::NoData("annotation table has no columns".into()));
    };
    let ids = id_col.cast(&DataType::String)?;
    let row_of: HashMap<&str, IdxSize> = ids
        .str()?
        .into_iter()
        .enumerate()
        .filter_map(|(row, id)| Some((id?, row as IdxSize)))
        .collect();

    let rows = samples
        .iter()
        .map(|s| {
            row_of.get(s.as_str()).copied().ok_or_else(|| {
                PolarsError::ComputeError(format!("sample '{s}' has no annotation row").into())
            })
        })
        .collect::<PolarsResult<Vec<IdxSize>>>()?;

    annotation.take(&IdxCa::from_vec(PlSmallStr::from("row"), rows))
}

/// In-memory provider over a fixed list of experiments.
#[derive(Debug, Clone, Default)]
pub struct ExperimentStore {
    experiments: Vec<Experiment>,
}

impl ExperimentStore {
    pub fn new(experiments: Vec<Experiment>) -> Self {
        Self { experiments }
    }

    pub fn push(&mut self, experiment: Experiment) {
        self.experiments.push(experiment);
    }

    fn experiment(&self, name: &str) -> Result<&Experiment, BoxplotError> {
        self.experiments
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| BoxplotError::UnknownExperiment(name.to_string()))
    }
}

impl AssayProvider for ExperimentStore {
    fn experiments(&self) -> Vec<ExperimentInfo> {
        self.experiments
            .iter()
            .filter_map(|e| match e.info() {
                Ok(info) => Some(info),
                Err(err) => {
                    error!("Skipping experiment '{}': {}", e.name, err);
                    None
                }
            })
            .collect()
    }

    fn matrix(&self, selection: &MatrixSelection) -> Result<AssayMatrix, BoxplotError> {
        let experiment = self.experiment(&selection.experiment)?;
        let assay = experiment.assay(&selection.assay)?;
        Ok(match experiment.selected_samples(selection)? {
            Some(keep) => assay.matrix.select_samples(&keep),
            None => assay.matrix.clone(),
        })
    }

    fn annotation(&self, selection: &MatrixSelection) -> Result<DataFrame, BoxplotError> {
        let experiment = self.experiment(&selection.experiment)?;
        Ok(match experiment.selected_samples(selection)? {
            Some(keep) => {
                let rows = keep.into_iter().map(|i| i as IdxSize).collect();
                experiment
                    .annotation
                    .take(&IdxCa::from_vec(PlSmallStr::from("row"), rows))?
            }
            None => experiment.annotation.clone(),
        })
    }

    fn measurement_type(&self, selection: &MatrixSelection) -> Result<String, BoxplotError> {
        let experiment = self.experiment(&selection.experiment)?;
        Ok(experiment.assay(&selection.assay)?.measurement.clone())
    }

    fn palette(
        &self,
        selection: &MatrixSelection,
        group_column: &str,
    ) -> Result<GroupPalette, BoxplotError> {
        let experiment = self.experiment(&selection.experiment)?;
        if let Some(palette) = experiment.palettes.get(group_column) {
            return Ok(palette.clone());
        }
        if experiment.annotation.column(group_column).is_err() {
            return Err(BoxplotError::UnknownColumn(group_column.to_string()));
        }
        let labels = group_labels(&experiment.annotation, group_column)?;
        let (_, levels) = first_occurrence_order(&labels);
        Ok(GroupPalette::for_levels(&levels))
    }

    fn feature_labels(&self, selection: &MatrixSelection) -> Result<FeatureLabels, BoxplotError> {
        Ok(self.experiment(&selection.experiment)?.feature_labels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SampleFilter, WhiskerDistance};
    use crate::plots::boxplot::{BoxplotData, BoxplotRequest};
    use ndarray::array;
    use plotters::style::Color;
    use polars::df;
    use std::io::Write;

    fn store() -> ExperimentStore {
        let annotation = df![
            "sample" => &["A", "B", "C", "D"],
            "treatment" => &[Some("ctrl"), Some("drug"), None, Some("drug")]
        ]
        .unwrap();
        let matrix = AssayMatrix::new(
            vec!["f1".into(), "f2".into()],
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]],
        )
        .unwrap();
        let exp = Experiment::new(
            "rnaseq",
            annotation,
            vec![Assay {
                name: "counts".into(),
                measurement: "normalised counts".into(),
                matrix,
            }],
        )
        .unwrap();
        ExperimentStore::new(vec![exp])
    }

    #[test]
    fn info_lists_group_levels() {
        let infos = store().experiments();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].sample_count, 4);
        assert_eq!(infos[0].group_vars[0].name, "treatment");
        assert_eq!(infos[0].group_vars[0].levels, vec!["ctrl", "drug", "N/A"]);
    }

    #[test]
    fn sample_filter_restricts_matrix_and_annotation() {
        let store = store();
        let sel = MatrixSelection::new("rnaseq", "counts").with_filter(SampleFilter {
            column: "treatment".into(),
            values: vec!["drug".into()],
        });
        let m = store.matrix(&sel).unwrap();
        assert_eq!(m.samples(), &["B", "D"]);
        assert_eq!(store.annotation(&sel).unwrap().height(), 2);
    }

    #[test]
    fn unknown_names_are_reported() {
        let store = store();
        assert!(matches!(
            store.matrix(&MatrixSelection::new("proteomics", "counts")),
            Err(BoxplotError::UnknownExperiment(_))
        ));
        assert!(matches!(
            store.matrix(&MatrixSelection::new("rnaseq", "tpm")),
            Err(BoxplotError::UnknownAssay { .. })
        ));
        assert!(matches!(
            store.palette(&MatrixSelection::new("rnaseq", "counts"), "batch"),
            Err(BoxplotError::UnknownColumn(_))
        ));
    }

    #[test]
    fn default_palette_follows_level_order() {
        let store = store();
        let palette = store
            .palette(&MatrixSelection::new("rnaseq", "counts"), "treatment")
            .unwrap();
        assert_eq!(palette.colour("ctrl"), DEFAULT_GROUP_COLOURS[0]);
        assert_eq!(palette.colour("drug"), DEFAULT_GROUP_COLOURS[1]);
        assert_eq!(palette.hex("ctrl"), "#e69f00");
        assert_eq!(palette.colour("unseen"), UNMAPPED_COLOUR);
    }

    #[test]
    fn registered_palette_reaches_the_boxes() {
        let custom = RGBColor(12, 34, 56);
        let mut store = store();
        let exp = store.experiments.remove(0).with_palette(
            "treatment",
            GroupPalette::for_levels(&["ctrl", "drug", "N/A"]).with_colour("drug", custom),
        );
        store.push(exp);

        let sel = MatrixSelection::new("rnaseq", "counts");
        let palette = store.palette(&sel, "treatment").unwrap();
        assert_eq!(palette.colour("drug"), custom);
        assert_eq!(palette.colour("ctrl"), DEFAULT_GROUP_COLOURS[0]);

        let matrix = store.matrix(&sel).unwrap();
        let annotation = store.annotation(&sel).unwrap();
        let data = BoxplotData::prepare(&BoxplotRequest {
            matrix: &matrix,
            annotation: &annotation,
            group_by: Some("treatment"),
            palette: Some(&palette),
            measurement_type: "normalised counts",
            whisker_distance: WhiskerDistance::default(),
            ylab_wrap_width: 30,
        })
        .unwrap();
        // display order A (ctrl), B, D (drug), C (N/A)
        assert_eq!(data.samples, vec!["A", "B", "D", "C"]);
        assert_eq!(data.fill_of(1).color, custom.mix(0.85));
        assert_eq!(data.fill_of(2).color, custom.mix(0.85));
        assert_eq!(data.fill_of(0).color, DEFAULT_GROUP_COLOURS[0].mix(0.85));
    }

    #[test]
    fn feature_labels_fall_back_to_ids() {
        let labels = FeatureLabels::new(HashMap::from([("ENSG1".to_string(), "TP53".to_string())]));
        assert_eq!(labels.label("ENSG1"), "TP53");
        assert_eq!(labels.label("ENSG2"), "ENSG2");
    }

    #[test]
    fn csv_annotation_is_aligned_to_matrix_columns() {
        let dir = tempfile::tempdir().unwrap();
        let matrix_path = dir.path().join("matrix.csv");
        let annotation_path = dir.path().join("samples.csv");
        let mut f = std::fs::File::create(&matrix_path).unwrap();
        writeln!(f, "gene,S1,S2,S3\ng1,1,2,3\ng2,4,5,6").unwrap();
        let mut f = std::fs::File::create(&annotation_path).unwrap();
        writeln!(f, "sample,group\nS3,b\nS1,a\nS2,a").unwrap();

        let exp = Experiment::from_csv("exp", "counts", "counts", &matrix_path, &annotation_path).unwrap();
        let groups = group_labels(&exp.annotation, "group").unwrap();
        assert_eq!(groups, vec!["a", "a", "b"]);
        assert_eq!(exp.group_vars, vec!["group"]);
    }
}
