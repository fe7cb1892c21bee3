//! Turns annotation and feature tables into drawable rectangles and
//! labels in data coordinates: x is the genomic position, y is measured
//! in track band units around a center line at 0.

use crate::annotation::{AnnotationRecord, FeatureType, Strand};
use crate::features::FeatureRecord;
use crate::palette::{Rgb, BLACK, GREY, LIGHT_CORAL, SKY_BLUE};
use crate::region::Region;
use rustc_hash::FxHashMap;

/// Gene names with this prefix are microRNAs and never drawn.
const MICRO_RNA_PREFIX: &str = "MIR";

/// Gene labels start this many bases right of the gene start.
const GENE_LABEL_OFFSET: u64 = 10;
/// Feature labels start this many bases left of the feature start.
const FEATURE_LABEL_OFFSET: u64 = 500;

pub const GENE_TRACK_YLIM: (f64, f64) = (-1.9, 1.9);
pub const FEATURE_TRACK_YLIM: (f64, f64) = (-0.2, 1.8);

/// Vertical placement of one strand: exon band, transcript band, label
/// baseline and color.
struct StrandStyle {
    exon: (f64, f64),
    transcript: (f64, f64),
    label_y: f64,
    color: Rgb,
}

static FORWARD_STYLE: StrandStyle = StrandStyle {
    exon: (0.1, 0.9),
    transcript: (0.4, 0.3),
    label_y: 1.2,
    color: SKY_BLUE,
};

static REVERSE_STYLE: StrandStyle = StrandStyle {
    exon: (-1.0, 0.9),
    transcript: (-0.7, 0.3),
    label_y: -1.6,
    color: LIGHT_CORAL,
};

static UNKNOWN_STYLE: StrandStyle = StrandStyle {
    exon: (-0.45, 0.9),
    transcript: (-0.15, 0.3),
    label_y: 1.2,
    color: GREY,
};

fn strand_style(strand: Strand) -> &'static StrandStyle {
    match strand {
        Strand::Forward => &FORWARD_STYLE,
        Strand::Reverse => &REVERSE_STYLE,
        Strand::Unknown => &UNKNOWN_STYLE,
    }
}

/// An axis-aligned box covering genomic positions `start..=end`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRect {
    pub start: u64,
    pub end: u64,
    pub y: f64,
    pub height: f64,
    pub color: Rgb,
}

impl TrackRect {
    /// Drawn width; both ends are inclusive.
    pub fn width(&self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Overall genomic extent of one gene's transcripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSpan {
    pub gene_name: String,
    pub min_start: u64,
    pub max_end: u64,
    pub strand: Strand,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneTrackLayout {
    pub exons: Vec<TrackRect>,
    pub transcripts: Vec<TrackRect>,
    pub labels: Vec<TrackLabel>,
}

impl GeneTrackLayout {
    pub fn is_empty(&self) -> bool {
        self.exons.is_empty() && self.transcripts.is_empty()
    }

    /// Transcripts first so exons are painted over them.
    pub fn rects(&self) -> impl Iterator<Item = &TrackRect> {
        self.transcripts.iter().chain(self.exons.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTrackLayout {
    pub rects: Vec<TrackRect>,
    pub labels: Vec<TrackLabel>,
}

fn is_micro_rna(gene_name: &str) -> bool {
    gene_name.starts_with(MICRO_RNA_PREFIX)
}

/// Fold transcript records into one span per gene, in first-seen order.
pub fn gene_spans<'a, I>(transcripts: I) -> Vec<GeneSpan>
where
    I: IntoIterator<Item = &'a AnnotationRecord>,
{
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut spans: Vec<GeneSpan> = Vec::new();

    for rec in transcripts {
        match index.get(rec.gene_name.as_str()) {
            Some(&i) => {
                let span = &mut spans[i];
                span.min_start = span.min_start.min(rec.start);
                span.max_end = span.max_end.max(rec.end);
                span.strand = rec.strand;
            }
            None => {
                index.insert(rec.gene_name.as_str(), spans.len());
                spans.push(GeneSpan {
                    gene_name: rec.gene_name.clone(),
                    min_start: rec.start,
                    max_end: rec.end,
                    strand: rec.strand,
                });
            }
        }
    }

    spans
}

/// Lay out the gene annotation track for `region`.
///
/// Only transcript and exon records on the region's chromosome that
/// overlap it (inclusive on both ends) contribute; microRNA genes are
/// skipped entirely. One label is emitted per gene.
pub fn resolve_gene_track(region: &Region, records: &[AnnotationRecord]) -> GeneTrackLayout {
    let mut layout = GeneTrackLayout::default();
    let mut transcripts: Vec<&AnnotationRecord> = Vec::new();

    let visible = records
        .iter()
        .filter(|r| region.overlaps(&r.chromosome, r.start, r.end))
        .filter(|r| !is_micro_rna(&r.gene_name));

    for rec in visible {
        let style = strand_style(rec.strand);
        match rec.feature_type {
            FeatureType::Transcript => {
                let (y, height) = style.transcript;
                layout.transcripts.push(TrackRect {
                    start: rec.start,
                    end: rec.end,
                    y,
                    height,
                    color: style.color,
                });
                transcripts.push(rec);
            }
            FeatureType::Exon => {
                let (y, height) = style.exon;
                layout.exons.push(TrackRect {
                    start: rec.start,
                    end: rec.end,
                    y,
                    height,
                    color: style.color,
                });
            }
            FeatureType::Other(_) => {}
        }
    }

    layout.labels = gene_spans(transcripts)
        .into_iter()
        .map(|span| TrackLabel {
            x: (span.min_start + GENE_LABEL_OFFSET) as f64,
            y: strand_style(span.strand).label_y,
            text: span.gene_name,
        })
        .collect();

    layout
}

/// How rectangles of a feature track are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureColoring {
    Fixed(Rgb),
    /// Hash each feature's label; unlabelled features use the fixed color.
    ByLabel(Rgb),
}

impl Default for FeatureColoring {
    fn default() -> Self {
        FeatureColoring::Fixed(BLACK)
    }
}

/// Lay out a generic feature track: one band, optional labels.
pub fn resolve_feature_track(
    region: &Region,
    features: &[FeatureRecord],
    coloring: FeatureColoring,
) -> FeatureTrackLayout {
    let mut layout = FeatureTrackLayout::default();

    for feat in features
        .iter()
        .filter(|f| region.overlaps(&f.chromosome, f.start, f.end))
    {
        let color = match (coloring, &feat.label) {
            (FeatureColoring::ByLabel(_), Some(label)) => crate::palette::name_color(label),
            (FeatureColoring::ByLabel(c), None) | (FeatureColoring::Fixed(c), _) => c,
        };
        layout.rects.push(TrackRect {
            start: feat.start,
            end: feat.end,
            y: 0.1,
            height: 1.2,
            color,
        });
        if let Some(label) = &feat.label {
            layout.labels.push(TrackLabel {
                x: feat.start as f64 - FEATURE_LABEL_OFFSET as f64,
                y: 1.5,
                text: label.clone(),
            });
        }
    }

    layout
}
