//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`process_staged_with_diagnostics`] drives the pipeline through the
//! [`Stage`](crate::pipeline::Stage) loop and records, for every stage,
//! its wall-clock duration and the [`StageMetrics`] it reports.
//!
//! Timing goes through the [`Clock`] trait so the caller picks the time
//! source. [`SystemClock`] uses the `web-time` crate, which is
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::pipeline::{Advance, Pipeline, Stage};
use crate::types::{EdgeMask, FloatField, Parameters, PipelineError, StagedResult};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Monotonic time source used to measure stage durations.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> Self::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// One entry per executed stage, in pipeline order. The initial
    /// `source` stage does no work and is not listed.
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Stage name (`"decode"`, `"blur"`, ...).
    pub name: String,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes (0 when started from pixels).
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Luma extraction metrics.
    Luma {
        /// Darkest intensity.
        min_intensity: f32,
        /// Brightest intensity.
        max_intensity: f32,
        /// Mean intensity.
        mean_intensity: f64,
    },
    /// Gaussian blur metrics.
    Blur {
        /// Kernel radius in pixels.
        radius: u32,
        /// Number of kernel taps (`2 * radius + 1`).
        kernel_size: u32,
    },
    /// Sobel gradient metrics.
    Gradient {
        /// Largest gradient magnitude.
        max_magnitude: f32,
        /// Mean gradient magnitude.
        mean_magnitude: f64,
    },
    /// Thresholding metrics.
    Threshold {
        /// Magnitude cutoff.
        threshold: f32,
        /// Edge pixels in the raw mask.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Morphological cleanup metrics.
    Cleanup {
        /// Despeckle neighbour minimum.
        despeckle_min: u8,
        /// Closing neighbour minimum.
        close_min: u8,
        /// Edge pixels before cleanup.
        edges_before: u64,
        /// Edge pixels after cleanup.
        edges_after: u64,
        /// Edge pixels removed as specks.
        removed: u64,
        /// Background pixels promoted by closing.
        added: u64,
    },
    /// Output encoding metrics.
    Encode {
        /// Size of the encoded source image (0 when started from pixels).
        input_bytes: usize,
        /// Size of the encoded PNG.
        png_bytes: usize,
        /// Opaque pixels in the output.
        edge_pixel_count: u64,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Edge pixels in the final mask.
    pub edge_pixel_count: u64,
    /// Size of the encoded output.
    pub output_bytes: usize,
}

impl PipelineDiagnostics {
    /// Diagnostics for the stage called `name`, if it ran.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageDiagnostics> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&stage.metrics);
            lines.push(format!("{:<16} {ms:>8.3}ms {pct:>9.1}%  {details}", stage.name));
        }

        lines.push(String::new());
        lines.push(format!(
            "Edge pixels: {}  |  Output: {} bytes",
            self.summary.edge_pixel_count, self.summary.output_bytes,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Luma {
            min_intensity,
            max_intensity,
            mean_intensity,
        } => format!("min={min_intensity:.1} max={max_intensity:.1} mean={mean_intensity:.1}"),
        StageMetrics::Blur {
            radius,
            kernel_size,
        } => format!("radius={radius} taps={kernel_size}"),
        StageMetrics::Gradient {
            max_magnitude,
            mean_magnitude,
        } => format!("max={max_magnitude:.1} mean={mean_magnitude:.2}"),
        StageMetrics::Threshold {
            threshold,
            edge_pixel_count,
            total_pixel_count,
        } => format!(
            "t={threshold:.1} edges={edge_pixel_count} ({:.1}%)",
            percent(*edge_pixel_count, *total_pixel_count),
        ),
        StageMetrics::Cleanup {
            despeckle_min,
            close_min,
            edges_before,
            edges_after,
            removed,
            added,
        } => format!(
            "despeckle<{despeckle_min} close>={close_min} {edges_before}->{edges_after} (-{removed} +{added})",
        ),
        StageMetrics::Encode {
            input_bytes,
            png_bytes,
            edge_pixel_count,
        } => format!("{png_bytes} bytes (from {input_bytes}), {edge_pixel_count} ink pixels"),
    }
}

/// Min, max, and mean of a float field.
pub(crate) struct FieldStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
}

pub(crate) fn field_stats(field: &FloatField) -> FieldStats {
    let values = field.as_raw();
    let min = values.iter().copied().reduce(f32::min).unwrap_or(0.0);
    let max = values.iter().copied().reduce(f32::max).unwrap_or(0.0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if values.is_empty() {
        0.0
    } else {
        values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
    };
    FieldStats { min, max, mean }
}

/// Count pixels that went edge -> background and background -> edge.
pub(crate) fn mask_changes(before: &EdgeMask, after: &EdgeMask) -> (u64, u64) {
    before
        .as_slice()
        .iter()
        .zip(after.as_slice())
        .fold((0, 0), |(removed, added), (&b, &a)| {
            (
                removed + u64::from(b && !a),
                added + u64::from(!b && a),
            )
        })
}

/// Run the full pipeline and time every stage.
///
/// Produces the same [`StagedResult`] as
/// [`process_staged`](crate::process_staged) plus a
/// [`PipelineDiagnostics`] record.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by any stage.
#[instrument(skip_all, fields(input_bytes = image_bytes.len()))]
pub fn process_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    params: &Parameters,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();
    let mut stages = Vec::with_capacity(crate::pipeline::STAGE_COUNT - 1);
    let mut stage: Stage = Pipeline::new(image_bytes.to_vec(), params.clone()).into();

    loop {
        let stage_start = clock.now();
        match stage.advance()? {
            Advance::Next(next) => {
                let duration = clock.elapsed(&stage_start);
                if let Some(metrics) = next.metrics() {
                    stages.push(StageDiagnostics {
                        name: next.name().to_string(),
                        duration,
                        metrics,
                    });
                }
                stage = next;
            }
            Advance::Complete(done) => {
                stage = done;
                break;
            }
        }
    }

    let result = stage.complete()?;
    let total_duration = clock.elapsed(&start);
    let dimensions = result.dimensions();
    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: dimensions.pixel_count(),
        edge_pixel_count: result.mask.edge_count(),
        output_bytes: result.artifact.png.len(),
    };

    Ok((
        result,
        PipelineDiagnostics {
            stages,
            total_duration,
            summary,
        },
    ))
}
