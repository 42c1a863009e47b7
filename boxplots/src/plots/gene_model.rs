//! Transcript/exon tracks over a genomic window. The annotation itself comes
//! from a [`GeneModelSource`]; this module only lays the tracks out.

use plotters::coord::Shift;
use plotters::prelude::*;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::plots::render_err;

const TRACK_HEIGHT: f64 = 1.0;
const EXON_HALF_HEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicRange {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl GenomicRange {
    pub fn new(chromosome: impl Into<String>, start: u64, end: u64) -> PolarsResult<Self> {
        if end <= start {
            return Err(PolarsError::InvalidOperation(
                format!("empty genomic range {start}..{end}").into(),
            ));
        }
        Ok(Self {
            chromosome: chromosome.into(),
            start,
            end,
        })
    }

    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        start < self.end && end > self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub gene: String,
    pub strand: Strand,
    /// Half-open `[start, end)` exon coordinates.
    pub exons: Vec<(u64, u64)>,
}

impl Transcript {
    pub fn span(&self) -> Option<(u64, u64)> {
        let start = self.exons.iter().map(|e| e.0).min()?;
        let end = self.exons.iter().map(|e| e.1).max()?;
        Some((start, end))
    }
}

/// Genome annotation lookup.
pub trait GeneModelSource {
    fn transcripts(&self, species: &str, range: &GenomicRange) -> PolarsResult<Vec<Transcript>>;
}

/// Draw every transcript overlapping `range` as its own track.
pub fn plot_gene_model<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    source: &dyn GeneModelSource,
    species: &str,
    range: &GenomicRange,
) -> PolarsResult<usize> {
    let transcripts: Vec<Transcript> = source
        .transcripts(species, range)?
        .into_iter()
        .filter(|t| t.span().is_some_and(|(s, e)| range.overlaps(s, e)))
        .collect();
    info!(
        "Drawing {} transcripts for {species} {}:{}-{}",
        transcripts.len(),
        range.chromosome,
        range.start,
        range.end
    );

    root.fill(&WHITE).map_err(render_err)?;
    let tracks = transcripts.len().max(1) as f64;
    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("{species} {}:{}-{}", range.chromosome, range.start, range.end),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(10)
        .build_cartesian_2d(range.start as f64..range.end as f64, 0.0..tracks * TRACK_HEIGHT)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_y_axis()
        .disable_mesh()
        .x_desc(format!("{} position", range.chromosome))
        .draw()
        .map_err(render_err)?;

    let clamp = |v: u64| v.clamp(range.start, range.end) as f64;
    for (i, t) in transcripts.iter().enumerate() {
        let y = (tracks - i as f64 - 0.5) * TRACK_HEIGHT;
        let Some((start, end)) = t.span() else {
            continue;
        };
        let colour = match t.strand {
            Strand::Forward => RGBColor(0, 114, 178),
            Strand::Reverse => RGBColor(213, 94, 0),
        };

        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(clamp(start), y), (clamp(end), y)],
                colour.stroke_width(1),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(
                t.exons
                    .iter()
                    .filter(|(s, e)| range.overlaps(*s, *e))
                    .map(|&(s, e)| {
                        Rectangle::new(
                            [(clamp(s), y - EXON_HALF_HEIGHT), (clamp(e), y + EXON_HALF_HEIGHT)],
                            colour.filled(),
                        )
                    }),
            )
            .map_err(render_err)?;
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{} ({})", t.gene, t.id),
                (clamp(start), y + EXON_HALF_HEIGHT + 0.1),
                ("sans-serif", 14),
            )))
            .map_err(render_err)?;
    }

    Ok(transcripts.len())
}

pub fn render_gene_model_svg(
    source: &dyn GeneModelSource,
    species: &str,
    range: &GenomicRange,
    size: (u32, u32),
) -> PolarsResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        plot_gene_model(&root, source, species, range)?;
        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Transcript>);

    impl GeneModelSource for Fixed {
        fn transcripts(&self, species: &str, _range: &GenomicRange) -> PolarsResult<Vec<Transcript>> {
            if species != "Homo sapiens" {
                return Err(PolarsError::NoData(format!("no annotation for {species}").into()));
            }
            Ok(self.0.clone())
        }
    }

    fn source() -> Fixed {
        Fixed(vec![
            Transcript {
                id: "ENST1".into(),
                gene: "TP53".into(),
                strand: Strand::Reverse,
                exons: vec![(1_000, 1_200), (1_500, 1_800)],
            },
            Transcript {
                id: "ENST2".into(),
                gene: "WRAP53".into(),
                strand: Strand::Forward,
                exons: vec![(9_000, 9_500)],
            },
        ])
    }

    #[test]
    fn ranges_must_be_non_empty() {
        assert!(GenomicRange::new("chr17", 10, 10).is_err());
        let r = GenomicRange::new("chr17", 100, 200).unwrap();
        assert!(r.overlaps(150, 400));
        assert!(!r.overlaps(200, 300));
    }

    #[test]
    fn span_covers_all_exons() {
        assert_eq!(source().0[0].span(), Some((1_000, 1_800)));
    }

    #[test]
    fn source_errors_propagate() {
        let range = GenomicRange::new("chr17", 0, 2_000).unwrap();
        assert!(render_gene_model_svg(&source(), "Mus musculus", &range, (600, 300)).is_err());
    }

    #[test]
    #[ignore = "text layout needs system fonts"]
    fn only_overlapping_transcripts_are_drawn() {
        let range = GenomicRange::new("chr17", 0, 2_000).unwrap();
        let mut svg = String::new();
        let drawn = {
            let root = SVGBackend::with_string(&mut svg, (600, 300)).into_drawing_area();
            plot_gene_model(&root, &source(), "Homo sapiens", &range).unwrap()
        };
        assert_eq!(drawn, 1);
        assert!(svg.contains("TP53"));
        assert!(!svg.contains("WRAP53"));
    }
}
