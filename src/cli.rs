use crate::config::{load_config, RenderConfig};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_svg, write_output};
use crate::scene::{parse_scene, run_scene, PassReport, Scene, SceneResult};
use crate::text_metrics::{FontMetrics, HeuristicMetrics, SystemFontMetrics};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "labelgrid", version, about = "Bitmap label collision and placement")]
pub struct Args {
    /// Scene file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (default options and render colors)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Chart width, overrides the scene size
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Chart height, overrides the scene size
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Print the final solid grid as ASCII art to stderr
    #[arg(long = "dump-grid")]
    pub dump_grid: bool,

    /// Measure text with a fixed advance per character instead of system fonts
    #[arg(long = "heuristic-metrics")]
    pub heuristic_metrics: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Svg,
    #[cfg(feature = "png")]
    Png,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passes: &'a [PassReport],
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let mut scene = parse_scene(&input)?;
    apply_size_override(&mut scene, args.width, args.height)?;

    let metrics: Box<dyn FontMetrics> = if args.heuristic_metrics {
        Box::new(HeuristicMetrics::default())
    } else {
        Box::new(SystemFontMetrics)
    };
    let result = run_scene(&scene, &config.options, metrics.as_ref())?;

    if args.dump_grid
        && let Some(bitmaps) = &result.bitmaps
    {
        eprint!("{}", bitmaps.solid.to_ascii());
    }

    match args.output_format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonReport {
                passes: &result.passes,
            })?;
            write_output(&json, args.output.as_deref())?;
        }
        OutputFormat::Svg => {
            let svg = last_pass_svg(&scene, &result, &config.render, metrics.as_ref())?;
            write_output(&svg, args.output.as_deref())?;
        }
        #[cfg(feature = "png")]
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = last_pass_svg(&scene, &result, &config.render, metrics.as_ref())?;
            let size = result
                .passes
                .last()
                .map(|pass| pass.size)
                .ok_or_else(|| anyhow::anyhow!("Scene has no passes"))?;
            write_output_png(&svg, &output, size, &config.render)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn last_pass_svg(
    scene: &Scene,
    result: &SceneResult,
    render: &RenderConfig,
    metrics: &dyn FontMetrics,
) -> Result<String> {
    let (Some(pass), Some(report), Some(bitmaps)) = (
        scene.passes.last(),
        result.passes.last(),
        result.bitmaps.as_ref(),
    ) else {
        return Err(anyhow::anyhow!("Scene has no passes"));
    };
    Ok(render_svg(pass, report, bitmaps, render, metrics))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(feature = "png")]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}

fn apply_size_override(scene: &mut Scene, width: Option<f32>, height: Option<f32>) -> Result<()> {
    if width.is_none() && height.is_none() {
        return Ok(());
    }
    let current = match scene.size.as_slice() {
        [w, h] => Some((*w, *h)),
        _ => None,
    };
    let (w, h) = match (width, height, current) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some((_, h))) => (w, h),
        (None, Some(h), Some((w, _))) => (w, h),
        _ => {
            return Err(anyhow::anyhow!(
                "Both --width and --height are required when the scene has no size"
            ));
        }
    };
    scene.size = vec![w, h];
    Ok(())
}
