//! Figure composition: stacks the title, gene track, optional feature
//! track and optional cluster legend on a canvas and writes the result.

use crate::annotation::AnnotationRecord;
use crate::canvas::{Canvas, PixelRect, RasterCanvas, SvgCanvas, TextStyle, Viewport};
use crate::features::FeatureRecord;
use crate::layout::{
    resolve_feature_track, resolve_gene_track, FeatureColoring, FeatureTrackLayout, GeneTrackLayout,
    TrackLabel, TrackRect, FEATURE_TRACK_YLIM, GENE_TRACK_YLIM,
};
use crate::palette::{Palette, BLACK};
use crate::region::Region;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

const TITLE_HEIGHT: u32 = 24;
const LEGEND_ROW_HEIGHT: u32 = 16;
const LEGEND_COLUMN_WIDTH: u32 = 160;
const PADDING: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    /// `.svg` selects SVG; every other extension is rasterised.
    pub fn from_path(path: &Path) -> OutputFormat {
        let is_svg = path
            .extension()
            .map(|ext| ext.to_ascii_lowercase() == "svg")
            .unwrap_or(false);
        if is_svg {
            OutputFormat::Svg
        } else {
            OutputFormat::Png
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FigureOptions {
    pub width: u32,
    pub track_height: u32,
    /// Left margin reserved for track names.
    pub margin: u32,
    pub label_size: f64,
    pub feature_name: String,
    pub feature_coloring: FeatureColoring,
}

impl Default for FigureOptions {
    fn default() -> Self {
        FigureOptions {
            width: 1500,
            track_height: 120,
            margin: 120,
            label_size: 10.0,
            feature_name: "features".to_string(),
            feature_coloring: FeatureColoring::default(),
        }
    }
}

/// Tables shared by every region of a run.
#[derive(Clone, Copy)]
pub struct FigureInputs<'a> {
    pub annotation: &'a [AnnotationRecord],
    pub features: Option<&'a [FeatureRecord]>,
    pub palette: Option<&'a Palette>,
}

fn legend_height(palette: Option<&Palette>, opts: &FigureOptions) -> u32 {
    match palette {
        Some(p) if !p.is_empty() => {
            let columns = legend_columns(opts);
            let rows = (p.len() as u32).div_ceil(columns);
            rows * LEGEND_ROW_HEIGHT + 2 * PADDING
        }
        _ => 0,
    }
}

fn legend_columns(opts: &FigureOptions) -> u32 {
    (opts.width.saturating_sub(opts.margin) / LEGEND_COLUMN_WIDTH).max(1)
}

fn feature_track_height(opts: &FigureOptions) -> u32 {
    (opts.track_height / 2).max(LEGEND_ROW_HEIGHT)
}

pub fn figure_height(inputs: &FigureInputs, opts: &FigureOptions) -> u32 {
    let features = if inputs.features.is_some() { feature_track_height(opts) } else { 0 };
    TITLE_HEIGHT + opts.track_height + features + legend_height(inputs.palette, opts) + PADDING
}

fn track_viewport(region: &Region, opts: &FigureOptions, top: u32, height: u32, ylim: (f64, f64)) -> Viewport {
    Viewport {
        left: opts.margin as f64,
        top: top as f64,
        width: opts.width.saturating_sub(opts.margin.saturating_add(PADDING)) as f64,
        height: height as f64,
        // Rectangles cover end + 1, so the last base stays visible.
        xlim: (region.start as f64, region.end as f64 + 1.0),
        ylim,
    }
}

fn draw_rects<'r, C, I>(canvas: &mut C, rects: I, vp: &Viewport)
where
    C: Canvas + ?Sized,
    I: IntoIterator<Item = &'r TrackRect>,
{
    for rect in rects {
        let x0 = rect.start as f64;
        let x1 = x0 + rect.width() as f64;
        if let Some(px) = vp.project_rect(x0, x1, rect.y, rect.height) {
            canvas.fill_rect(&px, rect.color);
        }
    }
}

fn draw_labels<C: Canvas + ?Sized>(canvas: &mut C, labels: &[TrackLabel], vp: &Viewport, size: f64) {
    let style = TextStyle { color: BLACK, size, italic: true };
    for label in labels {
        // Labels sit on their baseline, like axis text does.
        let x = vp.x(label.x).max(vp.left);
        let y = vp.y(label.y) - size;
        canvas.draw_text(x, y, &label.text, &style);
    }
}

pub fn draw_gene_track<C: Canvas + ?Sized>(canvas: &mut C, layout: &GeneTrackLayout, vp: &Viewport, label_size: f64) {
    draw_rects(canvas, layout.rects(), vp);
    draw_labels(canvas, &layout.labels, vp, label_size);
}

pub fn draw_feature_track<C: Canvas + ?Sized>(
    canvas: &mut C,
    layout: &FeatureTrackLayout,
    vp: &Viewport,
    name: &str,
    label_size: f64,
) {
    draw_rects(canvas, &layout.rects, vp);
    draw_labels(canvas, &layout.labels, vp, label_size);

    let style = TextStyle { color: BLACK, size: label_size, italic: false };
    let text_width = canvas.text_width(name, &style);
    let x = (vp.left - text_width - PADDING as f64).max(0.0);
    let y = vp.top + (vp.height - label_size) / 2.0;
    canvas.draw_text(x, y, name, &style);
}

/// Swatch plus label per cluster, laid out in columns. Returns the
/// height used.
pub fn draw_palette_legend<C: Canvas + ?Sized>(
    canvas: &mut C,
    palette: &Palette,
    top: u32,
    opts: &FigureOptions,
) -> u32 {
    let columns = legend_columns(opts);
    let swatch = (LEGEND_ROW_HEIGHT - 4) as f64;
    let style = TextStyle { color: BLACK, size: opts.label_size, italic: false };

    for (i, (label, color)) in palette.iter().enumerate() {
        let col = i as u32 % columns;
        let row = i as u32 / columns;
        let x = (opts.margin + col * LEGEND_COLUMN_WIDTH) as f64;
        let y = (top + PADDING + row * LEGEND_ROW_HEIGHT) as f64;
        canvas.fill_rect(&PixelRect { x, y, width: swatch, height: swatch }, color);
        canvas.draw_text(x + swatch + 4.0, y, label, &style);
    }

    legend_height(Some(palette), opts)
}

/// Draw every panel of one region's figure.
pub fn draw_figure<C: Canvas + ?Sized>(canvas: &mut C, region: &Region, inputs: &FigureInputs, opts: &FigureOptions) {
    let genes = resolve_gene_track(region, inputs.annotation);
    if genes.is_empty() {
        warn!("No genes overlap {}", region);
    }
    debug!(
        "{}: {} transcripts, {} exons, {} genes",
        region,
        genes.transcripts.len(),
        genes.exons.len(),
        genes.labels.len()
    );

    let title = match &region.name {
        Some(name) => format!("{}  {}", name, region),
        None => region.to_string(),
    };
    let title_style = TextStyle { color: BLACK, size: opts.label_size, italic: false };
    canvas.draw_text(opts.margin as f64, PADDING as f64, &title, &title_style);

    let mut top = TITLE_HEIGHT;
    let vp = track_viewport(region, opts, top, opts.track_height, GENE_TRACK_YLIM);
    draw_gene_track(canvas, &genes, &vp, opts.label_size);
    top += opts.track_height;

    if let Some(features) = inputs.features {
        let layout = resolve_feature_track(region, features, opts.feature_coloring);
        debug!("{}: {} features", region, layout.rects.len());
        let height = feature_track_height(opts);
        let vp = track_viewport(region, opts, top, height, FEATURE_TRACK_YLIM);
        draw_feature_track(canvas, &layout, &vp, &opts.feature_name, opts.label_size);
        top += height;
    }

    if let Some(palette) = inputs.palette {
        if !palette.is_empty() {
            draw_palette_legend(canvas, palette, top, opts);
        }
    }
}

/// Render one region to `out`, choosing PNG or SVG by extension.
pub fn render_region(region: &Region, inputs: &FigureInputs, opts: &FigureOptions, out: &Path) -> Result<()> {
    let height = figure_height(inputs, opts);

    match OutputFormat::from_path(out) {
        OutputFormat::Svg => {
            let mut canvas = SvgCanvas::new(opts.width, height);
            draw_figure(&mut canvas, region, inputs, opts);
            std::fs::write(out, canvas.finish()).with_context(|| format!("writing {}", out.display()))?;
        }
        OutputFormat::Png => {
            let mut canvas = RasterCanvas::new(opts.width, height);
            draw_figure(&mut canvas, region, inputs, opts);
            canvas.save(out).with_context(|| format!("saving {}", out.display()))?;
        }
    }

    info!("Saved {} to {:?}", region, out);
    Ok(())
}

/// Render every region into `out_dir` in parallel. Returns the files
/// written, in input order.
pub fn render_batch(
    regions: &[Region],
    inputs: &FigureInputs,
    opts: &FigureOptions,
    out_dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    info!("Rendering {} regions into {:?}", regions.len(), out_dir);

    regions
        .par_iter()
        .map(|region| {
            let out = out_dir.join(format!("{}.{}", region.file_stem(), format.extension()));
            render_region(region, inputs, opts, &out)?;
            Ok::<PathBuf, anyhow::Error>(out)
        })
        .collect()
}

/// Write `label<TAB>color` next to a figure: `foo.png` -> `foo.palette.tsv`.
pub fn write_palette_tsv(figure: &Path, palette: &Palette) -> Result<PathBuf> {
    let tsv_path = figure.with_extension("palette.tsv");
    std::fs::write(&tsv_path, palette.to_tsv()).with_context(|| format!("writing {}", tsv_path.display()))?;
    info!("Cluster colors saved to {:?}", tsv_path);
    Ok(tsv_path)
}
