//! Static per-sample boxplot, optionally filled by a colour-by group.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use polars::prelude::*;
use tracing::{debug, info};

use crate::analysis::long_form::{long_form, values_by_sample};
use crate::analysis::quantiles::BoxStats;
use crate::data_handling::assay_matrix::AssayMatrix;
use crate::data_handling::experiment::GroupPalette;
use crate::data_handling::grouping::regroup;
use crate::helper_functions::{expand_range, wrap_words};
use crate::models::WhiskerDistance;
use crate::plots::render_err;

const BOX_HALF_WIDTH: f64 = 0.35;
const LEGEND_ROW_HEIGHT: u32 = 24;
const LEGEND_ROWS: usize = 2;

/// Inputs of one boxplot render.
#[derive(Clone, Copy)]
pub struct BoxplotRequest<'a> {
    pub matrix: &'a AssayMatrix,
    pub annotation: &'a DataFrame,
    pub group_by: Option<&'a str>,
    pub palette: Option<&'a GroupPalette>,
    pub measurement_type: &'a str,
    pub whisker_distance: WhiskerDistance,
    pub ylab_wrap_width: usize,
}

/// Everything the drawing step needs, samples already in display order.
#[derive(Debug, Clone)]
pub struct BoxplotData {
    pub samples: Vec<String>,
    /// `None` for samples without a single finite value.
    pub boxes: Vec<Option<BoxStats>>,
    pub groups: Option<Vec<String>>,
    pub levels: Vec<String>,
    pub palette: GroupPalette,
    pub y_label: Vec<String>,
}

impl BoxplotData {
    pub fn prepare(req: &BoxplotRequest<'_>) -> PolarsResult<Self> {
        if req.matrix.n_samples() == 0 || req.matrix.n_features() == 0 {
            return Err(PolarsError::NoData(
                format!(
                    "nothing to plot: {} features x {} samples",
                    req.matrix.n_features(),
                    req.matrix.n_samples()
                )
                .into(),
            ));
        }

        let grouping = regroup(req.annotation, req.matrix.n_samples(), req.group_by)?;
        let ordered = match &grouping {
            Some(g) => req.matrix.select_samples(&g.order),
            None => req.matrix.clone(),
        }
        .log2p();

        let melted = long_form(&ordered, grouping.as_ref().map(|g| g.labels.as_slice()))?;
        debug!("Boxplot long form has {} rows", melted.height());

        // category order is fixed here, never re-sorted downstream
        let samples = ordered.samples().to_vec();
        let boxes = values_by_sample(&melted, &samples)?
            .into_iter()
            .map(|(_, values)| {
                if values.iter().all(|v| !v.is_finite()) {
                    Ok(None)
                } else {
                    BoxStats::of(&values, req.whisker_distance).map(Some)
                }
            })
            .collect::<PolarsResult<Vec<_>>>()?;

        let (groups, levels, palette) = match grouping {
            Some(g) => {
                let palette = req
                    .palette
                    .cloned()
                    .unwrap_or_else(|| GroupPalette::for_levels(&g.levels));
                (Some(g.labels), g.levels, palette)
            }
            None => (None, Vec::new(), GroupPalette::default()),
        };

        Ok(Self {
            samples,
            boxes,
            groups,
            levels,
            palette,
            y_label: wrap_words(
                &format!("log2({})", req.measurement_type),
                req.ylab_wrap_width,
            ),
        })
    }

    pub(crate) fn fill_of(&self, idx: usize) -> ShapeStyle {
        match &self.groups {
            Some(groups) => self.palette.colour(&groups[idx]).mix(0.85).filled(),
            None => WHITE.filled(),
        }
    }

    fn value_range(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for b in self.boxes.iter().flatten() {
            lo = lo.min(b.summary.min);
            hi = hi.max(b.summary.max);
        }
        if lo.is_finite() && hi.is_finite() {
            expand_range(lo, hi, 0.05)
        } else {
            (0.0, 1.0)
        }
    }
}

/// Draw onto any plotters backend.
pub fn draw_boxplot<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    data: &BoxplotData,
) -> PolarsResult<()> {
    root.fill(&WHITE).map_err(render_err)?;

    let (_, height) = root.dim_in_pixel();
    let legend_height = if data.levels.is_empty() {
        0
    } else {
        LEGEND_ROW_HEIGHT * LEGEND_ROWS.min(data.levels.len()) as u32 + 16
    };
    let (upper, legend_area) = root.split_vertically(height.saturating_sub(legend_height));

    let ylab_width = 24 * data.y_label.len().max(1) as u32 + 8;
    let (ylab_area, plot_area) = upper.split_horizontally(ylab_width);

    let longest_name = data.samples.iter().map(|s| s.chars().count()).max().unwrap_or(1);
    let x_label_area = (longest_name as u32 * 9 + 16).min(220);

    let n = data.samples.len();
    let (y_lo, y_hi) = data.value_range();
    let mut chart = ChartBuilder::on(&plot_area)
        .margin(10)
        .x_label_area_size(x_label_area)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_lo..y_hi)
        .map_err(render_err)?;

    let x_label_style = TextStyle::from(("sans-serif", 16)).transform(FontTransform::Rotate90);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_style(x_label_style)
        .x_label_formatter(&|val: &f64| {
            let idx = val.round();
            if (val - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            data.samples.get(idx as usize).cloned().unwrap_or_default()
        })
        .y_label_style(("sans-serif", 18))
        .draw()
        .map_err(render_err)?;

    for (i, stats) in data.boxes.iter().enumerate() {
        let Some(b) = stats else {
            continue;
        };
        let x = i as f64;
        let s = &b.summary;

        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, b.lower_whisker), (x, s.q25)],
                BLACK.stroke_width(1),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, s.q75), (x, b.upper_whisker)],
                BLACK.stroke_width(1),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x - BOX_HALF_WIDTH, s.q25), (x + BOX_HALF_WIDTH, s.q75)],
                data.fill_of(i),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x - BOX_HALF_WIDTH, s.q25), (x + BOX_HALF_WIDTH, s.q75)],
                BLACK.stroke_width(1),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x - BOX_HALF_WIDTH, s.median), (x + BOX_HALF_WIDTH, s.median)],
                BLACK.stroke_width(2),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(
                b.outliers
                    .iter()
                    .map(|&v| Circle::new((x, v), 2, BLACK.filled())),
            )
            .map_err(render_err)?;
    }

    let (_, ylab_height) = ylab_area.dim_in_pixel();
    let centre_y = (ylab_height.saturating_sub(x_label_area) / 2) as i32;
    let label_style = TextStyle::from(("sans-serif", 20))
        .transform(FontTransform::Rotate270)
        .pos(Pos::new(HPos::Center, VPos::Center));
    for (i, line) in data.y_label.iter().enumerate() {
        let x = 14 + 24 * i as i32;
        ylab_area
            .draw(&Text::new(line.clone(), (x, centre_y), label_style.clone()))
            .map_err(render_err)?;
    }

    if !data.levels.is_empty() {
        draw_legend(&legend_area, &data.levels, &data.palette)?;
    }

    Ok(())
}

/// Colour keys laid out over at most two rows.
fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    levels: &[String],
    palette: &GroupPalette,
) -> PolarsResult<()> {
    let per_row = levels.len().div_ceil(LEGEND_ROWS).max(1);
    let (width, _) = area.dim_in_pixel();
    let cell_width = ((width as i32 - 20) / per_row as i32).max(40);

    for (idx, level) in levels.iter().enumerate() {
        let row = (idx / per_row) as i32;
        let col = (idx % per_row) as i32;
        let x = 10 + col * cell_width;
        let y = 8 + row * LEGEND_ROW_HEIGHT as i32;
        area.draw(&Rectangle::new(
            [(x, y), (x + 16, y + 16)],
            palette.colour(level).filled(),
        ))
        .map_err(render_err)?;
        area.draw(&Text::new(level.clone(), (x + 22, y), ("sans-serif", 18)))
            .map_err(render_err)?;
    }
    Ok(())
}

pub fn render_boxplot_svg(data: &BoxplotData, size: (u32, u32)) -> PolarsResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_boxplot(&root, data)?;
        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

pub fn render_boxplot_png(data: &BoxplotData, path: &Path, size: (u32, u32)) -> PolarsResult<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    draw_boxplot(&root, data)?;
    root.present().map_err(render_err)?;
    info!("Saved boxplot to {}", path.display());
    Ok(())
}
