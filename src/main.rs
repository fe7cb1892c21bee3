mod annotation;
mod canvas;
mod features;
mod layout;
mod palette;
mod region;
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use annotation::{load_annotation, GeneNameSource};
use features::load_features;
use layout::FeatureColoring;
use palette::{assign_palette, Rgb};
use region::{load_regions, Region};
use render::{render_batch, render_region, write_palette_tsv, FigureInputs, FigureOptions, OutputFormat};

#[derive(Parser)]
#[command(name = "genetrack")]
#[command(about = "Draw gene annotation and feature tracks for genomic regions.", long_about = None)]
struct Args {
    // MANDATORY OPTIONS
    /// Load gene annotations in GTF format from this FILE.
    #[arg(short = 'g', long = "gtf", value_name = "FILE")]
    gtf: PathBuf,

    // Region Selection Options
    /// Region to draw: STRING=CHR:START-END.
    #[arg(short = 'r', long = "region", value_name = "STRING", conflicts_with = "regions")]
    region: Option<String>,

    /// Draw every region of this BED FILE (optional 4th column names the figure).
    #[arg(short = 'R', long = "regions", value_name = "FILE", requires = "out_dir")]
    regions: Option<PathBuf>,

    // Output Options
    /// Write the figure to this FILE (PNG or SVG based on extension).
    #[arg(short = 'o', long = "out", value_name = "FILE", conflicts_with = "regions")]
    out: Option<PathBuf>,

    /// Write one figure per region into this DIR, creating it if needed.
    #[arg(short = 'D', long = "out-dir", value_name = "DIR", requires = "regions")]
    out_dir: Option<PathBuf>,

    /// Figure format in batch mode.
    #[arg(long = "format", value_name = "png|svg", default_value = "png")]
    format: String,

    // Annotation Options
    /// Take gene names from this attribute instead of the first one.
    #[arg(long = "gene-name-key", value_name = "KEY")]
    gene_name_key: Option<String>,

    // Feature Track Options
    /// Draw a feature track from this BED FILE.
    #[arg(short = 'f', long = "features", value_name = "FILE")]
    features: Option<PathBuf>,

    /// Name printed next to the feature track.
    #[arg(long = "feature-name", value_name = "STRING", default_value = "features")]
    feature_name: String,

    /// Feature color as #RRGGBB, R,G,B or a color name.
    #[arg(long = "feature-color", value_name = "COLOR", default_value = "black")]
    feature_color: String,

    /// Color each labelled feature by a hash of its name.
    #[arg(long = "color-features-by-name", requires = "features")]
    color_features_by_name: bool,

    // Cluster Legend Options
    /// Assign colors to the cluster labels in FILE (one per line) and draw a legend.
    #[arg(short = 'c', long = "clusters", value_name = "FILE")]
    clusters: Option<PathBuf>,

    // Visualization Options
    /// Set the width in pixels of the output image.
    #[arg(short = 'x', long = "width", value_name = "N", default_value_t = 1500)]
    width: u32,

    /// The height in pixels of the gene track.
    #[arg(short = 'a', long = "track-height", value_name = "N", default_value_t = 120)]
    track_height: u32,

    /// Left margin in pixels reserved for track names.
    #[arg(short = 'm', long = "margin", value_name = "N", default_value_t = 120)]
    margin: u32,

    // Threading
    /// Number of threads to use for batch rendering.
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,

    // Logging
    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1)]
    verbose: u8,
}

fn load_cluster_labels(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut labels = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            labels.push(line.to_string());
        }
    }

    Ok(labels)
}

fn figure_options(args: &Args) -> Result<FigureOptions> {
    let color = Rgb::parse(&args.feature_color)
        .with_context(|| format!("unrecognized feature color '{}'", args.feature_color))?;
    let feature_coloring = if args.color_features_by_name {
        FeatureColoring::ByLabel(color)
    } else {
        FeatureColoring::Fixed(color)
    };

    if args.margin.saturating_add(16) >= args.width {
        bail!("width {} leaves no room next to a {} px margin", args.width, args.margin);
    }

    Ok(FigureOptions {
        width: args.width,
        track_height: args.track_height.max(16),
        margin: args.margin,
        feature_name: args.feature_name.clone(),
        feature_coloring,
        ..FigureOptions::default()
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring thread pool")?;
    }

    let opts = figure_options(&args)?;

    info!("Loading annotation...");
    let source = match &args.gene_name_key {
        Some(key) => GeneNameSource::Key(key.clone()),
        None => GeneNameSource::FirstAttribute,
    };
    let annotation = load_annotation(&args.gtf, &source)
        .with_context(|| format!("reading annotation {}", args.gtf.display()))?;
    info!("Loaded {} transcript/exon records", annotation.len());

    let features = match &args.features {
        Some(path) => {
            let feats = load_features(path).with_context(|| format!("reading features {}", path.display()))?;
            info!("Loaded {} features", feats.len());
            Some(feats)
        }
        None => None,
    };

    let palette = match &args.clusters {
        Some(path) => {
            let labels =
                load_cluster_labels(path).with_context(|| format!("reading clusters {}", path.display()))?;
            if labels.is_empty() {
                warn!("No cluster labels found in {:?}", path);
            }
            Some(assign_palette(&labels))
        }
        None => None,
    };

    let inputs = FigureInputs {
        annotation: &annotation,
        features: features.as_deref(),
        palette: palette.as_ref(),
    };

    match (&args.region, &args.regions) {
        (Some(region), None) => {
            let region = Region::parse(region)
                .with_context(|| format!("invalid region '{}', expected CHR:START-END", region))?;
            let out = args
                .out
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.png", region.file_stem())));
            info!("Rendering {}...", region);
            render_region(&region, &inputs, &opts, &out)?;
            if let Some(palette) = &palette {
                write_palette_tsv(&out, palette)?;
            }
        }
        (None, Some(path)) => {
            let regions = load_regions(path).with_context(|| format!("reading regions {}", path.display()))?;
            let format = match args.format.to_ascii_lowercase().as_str() {
                "png" => OutputFormat::Png,
                "svg" => OutputFormat::Svg,
                other => bail!("unsupported format '{}', expected png or svg", other),
            };
            // `requires = "out_dir"` guarantees this.
            let out_dir = args.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            let written = render_batch(&regions, &inputs, &opts, &out_dir, format)?;
            if let Some(palette) = &palette {
                write_palette_tsv(&out_dir.join("clusters"), palette)?;
            }
            info!("Wrote {} figures", written.len());
        }
        _ => bail!("pass either --region or --regions"),
    }

    info!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["genetrack", "-g", "genes.gtf"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn out_dir_needs_a_region_list() {
        assert!(parse(&["-r", "chr1:1-100", "-D", "figs"]).is_err());
        assert!(parse(&["-R", "regions.bed"]).is_err());
        let args = parse(&["-R", "regions.bed", "-D", "figs"]).unwrap();
        assert_eq!(args.out_dir, Some(PathBuf::from("figs")));
    }

    #[test]
    fn huge_margin_is_rejected_without_overflow() {
        let args = parse(&["-r", "chr1:1-100", "-m", "4294967295"]).unwrap();
        assert!(figure_options(&args).is_err());

        let args = parse(&["-r", "chr1:1-100", "-x", "400", "-m", "100"]).unwrap();
        let opts = figure_options(&args).unwrap();
        assert_eq!(opts.width, 400);
        assert_eq!(opts.margin, 100);
    }
}
