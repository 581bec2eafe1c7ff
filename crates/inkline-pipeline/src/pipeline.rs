//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process_staged`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use inkline_pipeline::{Parameters, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(png, Parameters::default())
//!     .decode()?
//!     .extract_luma()
//!     .blur()
//!     .compute_gradient()
//!     .threshold()
//!     .clean()
//!     .encode()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates.
//!
//! # Memory
//!
//! Every stage retains the decoded source plus each `f32` field computed
//! so far. For a 1000×1000 source that is roughly 16 MB by the
//! [`Encoded`] stage. Callers that only need the artifact should use
//! [`crate::process`], which drops each intermediate as soon as the next
//! one exists.

use tracing::debug;

use crate::diagnostics::StageMetrics;
use crate::types::{
    Dimensions, EdgeMask, GradientField, IntensityField, OutputArtifact, Parameters,
    PipelineError, RgbaImage, StagedResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    params: Parameters,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the parameters, decode the source, and check that the
    /// working buffers fit.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameters`] for out-of-range
    /// parameters, [`PipelineError::EmptyInput`] or
    /// [`PipelineError::ImageDecode`] when decoding fails,
    /// [`PipelineError::DegenerateInput`] for a zero-sized image, and
    /// [`PipelineError::Context`] when the image is too large.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.params.validate()?;
        let original = crate::decode::decode(&self.source)?;
        Decoded::checked(self.params, original, self.source.len())
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding: the RGBA source is available.
#[must_use = "pipeline stages are consumed by advancing; call .extract_luma() to continue"]
pub struct Decoded {
    params: Parameters,
    original: RgbaImage,
    source_len: usize,
}

impl Decoded {
    fn checked(
        params: Parameters,
        original: RgbaImage,
        source_len: usize,
    ) -> Result<Self, PipelineError> {
        crate::decode::check_surface(original.width(), original.height())?;
        debug!(
            width = original.width(),
            height = original.height(),
            source_len,
            "decoded source image"
        );
        Ok(Self {
            params,
            original,
            source_len,
        })
    }

    /// The decoded RGBA source.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Compute the perceptual luma of every pixel.
    pub fn extract_luma(self) -> LumaExtracted {
        let intensity = crate::luma::extract(&self.original);
        debug!("extracted luma");
        LumaExtracted {
            params: self.params,
            original: self.original,
            source_len: self.source_len,
            intensity,
        }
    }
}

// ───────────────────────── Stage 2: LumaExtracted ────────────────────

/// Pipeline state after luma extraction.
#[must_use = "pipeline stages are consumed by advancing; call .blur() to continue"]
pub struct LumaExtracted {
    params: Parameters,
    original: RgbaImage,
    source_len: usize,
    intensity: IntensityField,
}

impl LumaExtracted {
    /// The intensity field.
    #[must_use]
    pub const fn intensity(&self) -> &IntensityField {
        &self.intensity
    }

    /// Apply the separable Gaussian blur.
    pub fn blur(self) -> Blurred {
        let blurred = crate::blur::gaussian_blur(&self.intensity, self.params.blur_radius);
        debug!(radius = self.params.blur_radius, "blurred intensity");
        Blurred {
            params: self.params,
            original: self.original,
            source_len: self.source_len,
            intensity: self.intensity,
            blurred,
        }
    }
}

// ───────────────────────── Stage 3: Blurred ──────────────────────────

/// Pipeline state after Gaussian blur.
#[must_use = "pipeline stages are consumed by advancing; call .compute_gradient() to continue"]
pub struct Blurred {
    params: Parameters,
    original: RgbaImage,
    source_len: usize,
    intensity: IntensityField,
    blurred: IntensityField,
}

impl Blurred {
    /// The blurred intensity field.
    #[must_use]
    pub const fn blurred(&self) -> &IntensityField {
        &self.blurred
    }

    /// Compute the Sobel gradient magnitude.
    pub fn compute_gradient(self) -> GradientComputed {
        let gradient = crate::sobel::gradient_magnitude(&self.blurred);
        debug!("computed gradient magnitude");
        GradientComputed {
            params: self.params,
            original: self.original,
            source_len: self.source_len,
            intensity: self.intensity,
            blurred: self.blurred,
            gradient,
        }
    }
}

// ───────────────────────── Stage 4: GradientComputed ─────────────────

/// Pipeline state after the Sobel operator.
#[must_use = "pipeline stages are consumed by advancing; call .threshold() to continue"]
pub struct GradientComputed {
    params: Parameters,
    original: RgbaImage,
    source_len: usize,
    intensity: IntensityField,
    blurred: IntensityField,
    gradient: GradientField,
}

impl GradientComputed {
    /// The gradient magnitude field.
    #[must_use]
    pub const fn gradient(&self) -> &GradientField {
        &self.gradient
    }

    /// Binarize the gradient with the configured threshold.
    pub fn threshold(self) -> Thresholded {
        let raw_mask = crate::threshold::binarize(&self.gradient, self.params.threshold);
        debug!(
            threshold = self.params.threshold,
            edges = raw_mask.edge_count(),
            "thresholded gradient"
        );
        Thresholded {
            params: self.params,
            original: self.original,
            source_len: self.source_len,
            intensity: self.intensity,
            blurred: self.blurred,
            gradient: self.gradient,
            raw_mask,
        }
    }
}

// ───────────────────────── Stage 5: Thresholded ──────────────────────

/// Pipeline state after thresholding.
#[must_use = "pipeline stages are consumed by advancing; call .clean() to continue"]
pub struct Thresholded {
    params: Parameters,
    original: RgbaImage,
    source_len: usize,
    intensity: IntensityField,
    blurred: IntensityField,
    gradient: GradientField,
    raw_mask: EdgeMask,
}

impl Thresholded {
    /// The edge mask before cleanup.
    #[must_use]
    pub const fn raw_mask(&self) -> &EdgeMask {
        &self.raw_mask
    }

    /// Run despeckle and closing against the thresholded mask.
    pub fn clean(self) -> Cleaned {
        let mask = crate::cleanup::clean(
            &self.raw_mask,
            self.params.despeckle_min,
            self.params.close_min,
        );
        debug!(
            before = self.raw_mask.edge_count(),
            after = mask.edge_count(),
            "cleaned edge mask"
        );
        Cleaned {
            params: self.params,
            original: self.original,
            source_len: self.source_len,
            intensity: self.intensity,
            blurred: self.blurred,
            gradient: self.gradient,
            raw_mask: self.raw_mask,
            mask,
        }
    }
}

// ───────────────────────── Stage 6: Cleaned ──────────────────────────

/// Pipeline state after morphological cleanup.
#[must_use = "pipeline stages are consumed by advancing; call .encode() to continue"]
pub struct Cleaned {
    params: Parameters,
    original: RgbaImage,
    source_len: usize,
    intensity: IntensityField,
    blurred: IntensityField,
    gradient: GradientField,
    raw_mask: EdgeMask,
    mask: EdgeMask,
}

impl Cleaned {
    /// The final edge mask.
    #[must_use]
    pub const fn mask(&self) -> &EdgeMask {
        &self.mask
    }

    /// Render and encode the output artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if PNG encoding fails.
    pub fn encode(self) -> Result<Encoded, PipelineError> {
        let artifact = crate::encode::encode(&self.mask)?;
        debug!(png_bytes = artifact.png.len(), "encoded output");
        Ok(Encoded {
            original: self.original,
            source_len: self.source_len,
            intensity: self.intensity,
            blurred: self.blurred,
            gradient: self.gradient,
            raw_mask: self.raw_mask,
            mask: self.mask,
            artifact,
        })
    }
}

// ───────────────────────── Stage 7: Encoded ──────────────────────────

/// Pipeline state after encoding, the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`].
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Encoded {
    original: RgbaImage,
    source_len: usize,
    intensity: IntensityField,
    blurred: IntensityField,
    gradient: GradientField,
    raw_mask: EdgeMask,
    mask: EdgeMask,
    artifact: OutputArtifact,
}

impl Encoded {
    /// The encoded artifact.
    #[must_use]
    pub const fn artifact(&self) -> &OutputArtifact {
        &self.artifact
    }

    /// Output dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.artifact.dimensions
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.original,
            intensity: self.intensity,
            blurred: self.blurred,
            gradient: self.gradient,
            raw_mask: self.raw_mask,
            mask: self.mask,
            artifact: self.artifact,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 8;

/// The output produced by a single pipeline stage.
#[must_use]
pub enum StageOutput<'a> {
    /// Source image bytes (not yet decoded).
    Source {
        /// The raw image bytes.
        bytes: &'a [u8],
    },
    /// Decoded RGBA image.
    Decoded {
        /// The original image.
        original: &'a RgbaImage,
    },
    /// Luma intensity.
    Luma {
        /// The intensity field.
        intensity: &'a IntensityField,
    },
    /// Gaussian blur result.
    Blurred {
        /// The blurred intensity field.
        blurred: &'a IntensityField,
    },
    /// Sobel gradient magnitude.
    Gradient {
        /// The gradient field.
        gradient: &'a GradientField,
    },
    /// Thresholded edge mask.
    Thresholded {
        /// The raw mask.
        mask: &'a EdgeMask,
    },
    /// Cleaned edge mask.
    Cleaned {
        /// The final mask.
        mask: &'a EdgeMask,
    },
    /// Encoded output.
    Encoded {
        /// The artifact.
        artifact: &'a OutputArtifact,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// Each stage struct implements it and [`Stage`] delegates to whichever
/// variant it holds.
///
/// ```rust
/// # use inkline_pipeline::{Parameters, Pipeline, PipelineError};
/// # use inkline_pipeline::pipeline::{Advance, Stage};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let mut stage: Stage = Pipeline::new(png, Parameters::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Short name of this stage (e.g. `"source"`, `"blur"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `7` for
    /// Encoded).
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Metrics describing the work done to reach this state, or `None`
    /// for [`Pending`].
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(None)` if already at the final stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the stage transition fails.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages and return the [`StagedResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            bytes: &self.source,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Decoded(self.decode()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Decoded {
            original: &self.original,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Decode {
            input_bytes: self.source_len,
            width: self.original.width(),
            height: self.original.height(),
            pixel_count: u64::from(self.original.width()) * u64::from(self.original.height()),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::LumaExtracted(self.extract_luma())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.extract_luma().complete()
    }
}

impl PipelineStage for LumaExtracted {
    const NAME: &str = "luma";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Luma {
            intensity: &self.intensity,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        let stats = crate::diagnostics::field_stats(&self.intensity);
        Some(StageMetrics::Luma {
            min_intensity: stats.min,
            max_intensity: stats.max,
            mean_intensity: stats.mean,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Blurred(self.blur())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.blur().complete()
    }
}

impl PipelineStage for Blurred {
    const NAME: &str = "blur";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Blurred {
            blurred: &self.blurred,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Blur {
            radius: self.params.blur_radius,
            kernel_size: 2 * self.params.blur_radius + 1,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::GradientComputed(self.compute_gradient())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.compute_gradient().complete()
    }
}

impl PipelineStage for GradientComputed {
    const NAME: &str = "gradient";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Gradient {
            gradient: &self.gradient,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        let stats = crate::diagnostics::field_stats(&self.gradient);
        Some(StageMetrics::Gradient {
            max_magnitude: stats.max,
            mean_magnitude: stats.mean,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Thresholded(self.threshold())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.threshold().complete()
    }
}

impl PipelineStage for Thresholded {
    const NAME: &str = "threshold";
    const INDEX: usize = 5;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Thresholded {
            mask: &self.raw_mask,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Threshold {
            threshold: self.params.threshold,
            edge_pixel_count: self.raw_mask.edge_count(),
            total_pixel_count: self.raw_mask.dimensions().pixel_count(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Cleaned(self.clean())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.clean().complete()
    }
}

impl PipelineStage for Cleaned {
    const NAME: &str = "cleanup";
    const INDEX: usize = 6;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Cleaned { mask: &self.mask }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        let (removed, added) = crate::diagnostics::mask_changes(&self.raw_mask, &self.mask);
        Some(StageMetrics::Cleanup {
            despeckle_min: self.params.despeckle_min,
            close_min: self.params.close_min,
            edges_before: self.raw_mask.edge_count(),
            edges_after: self.mask.edge_count(),
            removed,
            added,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Encoded(self.encode()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.encode()?.into_result())
    }
}

impl PipelineStage for Encoded {
    const NAME: &str = "encode";
    const INDEX: usize = 7;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Encoded {
            artifact: &self.artifact,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Encode {
            input_bytes: self.source_len,
            png_bytes: self.artifact.png.len(),
            edge_pixel_count: self.mask.edge_count(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`LumaExtracted`].
    LumaExtracted(LumaExtracted),
    /// See [`Blurred`].
    Blurred(Blurred),
    /// See [`GradientComputed`].
    GradientComputed(GradientComputed),
    /// See [`Thresholded`].
    Thresholded(Thresholded),
    /// See [`Cleaned`].
    Cleaned(Cleaned),
    /// See [`Encoded`].
    Encoded(Encoded),
}

/// Compile-time guard: adding a [`Stage`] variant makes this match
/// non-exhaustive, a reminder to bump [`STAGE_COUNT`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Decoded(_)
        | Stage::LumaExtracted(_)
        | Stage::Blurred(_)
        | Stage::GradientComputed(_)
        | Stage::Thresholded(_)
        | Stage::Cleaned(_)
        | Stage::Encoded(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::LumaExtracted(s) => s.$method($($arg),*),
            Self::Blurred(s) => s.$method($($arg),*),
            Self::GradientComputed(s) => s.$method($($arg),*),
            Self::Thresholded(s) => s.$method($($arg),*),
            Self::Cleaned(s) => s.$method($($arg),*),
            Self::Encoded(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Short name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Stage-specific metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Advance to the next stage. Returns `Ok(None)` (consuming the
    /// final stage) if already complete.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        delegate!(self, complete)
    }
}

// Associated constants are not reachable through `self.NAME`, so the
// macro goes through this helper.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

macro_rules! stage_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Stage {
                fn from(s: $variant) -> Self {
                    Self::$variant(s)
                }
            }
        )*
    };
}

stage_from!(
    Pending,
    Decoded,
    LumaExtracted,
    Blurred,
    GradientComputed,
    Thresholded,
    Cleaned,
    Encoded,
);

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental line-art pipeline.
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Store source bytes and parameters without doing any work.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, params: Parameters) -> Pending {
        Pending {
            params,
            source: image_bytes,
        }
    }

    /// Start from an already-decoded RGBA image, skipping the decoder.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameters`],
    /// [`PipelineError::DegenerateInput`], or [`PipelineError::Context`]
    /// under the same conditions as [`Pending::decode`].
    pub fn from_image(image: RgbaImage, params: Parameters) -> Result<Decoded, PipelineError> {
        params.validate()?;
        Decoded::checked(params, image, 0)
    }
}
