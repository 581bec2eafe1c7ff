//! inkline: turn an image into a transparent line-art PNG.
//!
//! Runs the full pipeline on a local image, writes the outline next to
//! it (or to `--output`), and prints per-stage diagnostics. Useful for
//! tuning the threshold and cleanup parameters on real artwork.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin inkline -- [OPTIONS] <INPUT>
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use inkline_io::{FileFetcher, ImageFetcher, ImageReference};
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use inkline_pipeline::diagnostics::{PipelineDiagnostics, SystemClock};
use inkline_pipeline::{EdgeMask, Parameters};
use tracing::{debug, error, info};

/// Convert an image to a transparent line-art outline.
///
/// Edges are drawn opaque black; everything else is fully transparent.
#[derive(Parser)]
#[command(name = "inkline", version)]
struct Cli {
    /// Input image (PNG, JPEG, BMP, WebP, GIF): a path or `file://` URL.
    input: String,

    /// Where to write the PNG. Defaults to `<stem>-outline.png` beside
    /// the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gradient magnitude above which a pixel is an edge.
    #[arg(long, default_value_t = Parameters::DEFAULT_THRESHOLD)]
    threshold: f32,

    /// Gaussian blur radius in pixels (0 disables blurring).
    #[arg(long, default_value_t = Parameters::DEFAULT_BLUR_RADIUS)]
    blur_radius: u32,

    /// Edge pixels with fewer edge neighbours than this are removed.
    #[arg(long, default_value_t = Parameters::DEFAULT_DESPECKLE_MIN)]
    despeckle_min: u8,

    /// Background pixels with at least this many edge neighbours become
    /// edges.
    #[arg(long, default_value_t = Parameters::DEFAULT_CLOSE_MIN)]
    close_min: u8,

    /// Full parameters as a JSON object.
    ///
    /// When provided, the individual parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    params_json: Option<String>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Also write the cleaned edge mask as a grayscale PNG (white
    /// edges on black) for inspecting the cleanup parameters.
    #[arg(long, value_name = "PATH")]
    mask_preview: Option<PathBuf>,
}

/// Build [`Parameters`] from CLI arguments.
fn params_from_cli(cli: &Cli) -> Result<Parameters, String> {
    if let Some(ref json) = cli.params_json {
        return serde_json::from_str(json).map_err(|e| format!("invalid --params-json: {e}"));
    }

    Ok(Parameters {
        threshold: cli.threshold,
        blur_radius: cli.blur_radius,
        despeckle_min: cli.despeckle_min,
        close_min: cli.close_min,
    })
}

/// Resolve where the outline PNG goes.
fn output_path(cli: &Cli, reference: &ImageReference) -> PathBuf {
    if let Some(ref path) = cli.output {
        return path.clone();
    }
    match reference {
        ImageReference::Path(input) => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            input.with_file_name(format!("{stem}-outline.png"))
        }
        ImageReference::Url(_) | ImageReference::Bytes(_) => PathBuf::from("image-outline.png"),
    }
}

/// Encode an edge mask as a grayscale PNG preview.
fn mask_preview_png(mask: &EdgeMask) -> Result<Vec<u8>, image::ImageError> {
    let gray = mask.to_gray_image();
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        gray.as_raw(),
        gray.width(),
        gray.height(),
        image::ExtendedColorType::L8,
    )?;
    Ok(buf)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let params = match params_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let reference = ImageReference::parse(&cli.input);
    let image_bytes = match FileFetcher.fetch(&reference).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(%reference, "cannot load input: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(%reference, bytes = image_bytes.len(), runs = cli.runs, "processing");
    debug!(?params, "parameters");

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) =
            match inkline_pipeline::diagnostics::process_staged_with_diagnostics(
                &image_bytes,
                &params,
                &SystemClock,
            ) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(%reference, "conversion failed: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!("cannot serialize diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        if run == 0 {
            if let Some(ref preview) = cli.mask_preview {
                let written = match mask_preview_png(&staged.mask) {
                    Ok(png) => tokio::fs::write(preview, &png).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                if let Err(e) = written {
                    error!(path = %preview.display(), "cannot write mask preview: {e}");
                    return ExitCode::FAILURE;
                }
                info!(path = %preview.display(), "wrote mask preview");
            }

            let path = output_path(&cli, &reference);
            let png = staged.artifact.into_png();
            if let Err(e) = tokio::fs::write(&path, &png).await {
                error!(path = %path.display(), "cannot write output: {e}");
                return ExitCode::FAILURE;
            }
            info!(path = %path.display(), bytes = png.len(), "wrote line art");
        }

        all_diagnostics.push(diagnostics);
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<16} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(30));

    for name in first.stages.iter().map(|s| s.name.as_str()) {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.stage(name))
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();
        if stage_durations.is_empty() {
            continue;
        }
        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<16} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("inkline").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let cli = parse(&["page.png"]);
        assert_eq!(params_from_cli(&cli).unwrap(), Parameters::default());
        assert_eq!(cli.runs, 1);
    }

    #[test]
    fn individual_flags_are_applied() {
        let cli = parse(&["page.png", "--threshold", "40", "--blur-radius", "0", "--close-min", "5"]);
        let params = params_from_cli(&cli).unwrap();
        assert!((params.threshold - 40.0).abs() < f32::EPSILON);
        assert_eq!(params.blur_radius, 0);
        assert_eq!(params.close_min, 5);
        assert_eq!(params.despeckle_min, Parameters::DEFAULT_DESPECKLE_MIN);
    }

    #[test]
    fn params_json_overrides_flags() {
        let cli = parse(&["page.png", "--threshold", "99", "--params-json", r#"{"close_min": 4}"#]);
        let params = params_from_cli(&cli).unwrap();
        assert_eq!(params.close_min, 4);
        assert!((params.threshold - Parameters::DEFAULT_THRESHOLD).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_params_json_is_reported() {
        let cli = parse(&["page.png", "--params-json", "{"]);
        assert!(params_from_cli(&cli).unwrap_err().contains("--params-json"));
    }

    #[test]
    fn zero_runs_is_rejected() {
        let result = Cli::try_parse_from(["inkline", "page.png", "--runs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn default_output_sits_beside_input() {
        let cli = parse(&["art/cat.jpg"]);
        let reference = ImageReference::parse(&cli.input);
        assert_eq!(
            output_path(&cli, &reference),
            Path::new("art").join("cat-outline.png")
        );
    }

    #[test]
    fn mask_preview_is_a_grayscale_png_of_the_mask() {
        let mask = EdgeMask::from_fn(3, 2, |x, y| x == 1 && y == 0);
        let png = mask_preview_png(&mask).unwrap();
        let preview = image::load_from_memory(&png).unwrap();
        assert_eq!(preview.color(), image::ColorType::L8);
        let gray = preview.into_luma8();
        assert_eq!(gray.dimensions(), (3, 2));
        assert_eq!(gray.get_pixel(1, 0).0, [255]);
        assert_eq!(gray.get_pixel(0, 0).0, [0]);
        assert_eq!(gray.get_pixel(1, 1).0, [0]);
    }

    #[test]
    fn mask_preview_flag_is_optional() {
        assert!(parse(&["page.png"]).mask_preview.is_none());
        let cli = parse(&["page.png", "--mask-preview", "mask.png"]);
        assert_eq!(cli.mask_preview, Some(PathBuf::from("mask.png")));
    }

    #[test]
    fn explicit_output_wins() {
        let cli = parse(&["art/cat.jpg", "-o", "out.png"]);
        let reference = ImageReference::parse(&cli.input);
        assert_eq!(output_path(&cli, &reference), PathBuf::from("out.png"));
    }
}
