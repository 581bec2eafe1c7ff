//! Shared types for the inkline line-art pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference the decoded
/// source and the encoded output without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` for edge-mask previews.
pub use image::GrayImage;

/// Single-channel `f32` raster, one value per pixel.
pub type FloatField = imageproc::definitions::Image<image::Luma<f32>>;

/// Perceptual luma of every source pixel (0.0 to 255.0).
///
/// Produced by [`luma::extract`](crate::luma::extract) and replaced by
/// its blurred copy in the blur stage.
pub type IntensityField = FloatField;

/// Sobel gradient magnitude of every pixel. The one-pixel border ring
/// is always zero.
pub type GradientField = FloatField;

/// Largest accepted blur radius (kernel size 65).
pub const MAX_BLUR_RADIUS: u32 = 32;

/// Number of 8-connected neighbours a pixel can have.
pub const NEIGHBOR_COUNT: u8 = 8;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Tuning parameters for a single conversion.
///
/// Supplied per invocation and never mutated while a run is in
/// progress. The defaults are the compiled-in constants of the
/// outline converter: threshold 25, blur radius 2, despeckle 1,
/// closing 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Gradient magnitude cutoff. A pixel is an edge when its magnitude
    /// is strictly greater than this value.
    pub threshold: f32,

    /// Gaussian blur radius in pixels. The kernel has `2 * radius + 1`
    /// taps and `sigma = radius / 2`. Zero disables blurring.
    pub blur_radius: u32,

    /// An edge pixel with fewer than this many edge neighbours is
    /// removed as a speck.
    pub despeckle_min: u8,

    /// A background pixel with at least this many edge neighbours is
    /// promoted to an edge, closing small gaps.
    pub close_min: u8,
}

impl Parameters {
    /// Default gradient magnitude cutoff.
    pub const DEFAULT_THRESHOLD: f32 = 25.0;
    /// Default Gaussian blur radius.
    pub const DEFAULT_BLUR_RADIUS: u32 = 2;
    /// Default minimum neighbour count for an edge pixel to survive.
    pub const DEFAULT_DESPECKLE_MIN: u8 = 1;
    /// Default neighbour count that promotes a background pixel.
    pub const DEFAULT_CLOSE_MIN: u8 = 3;

    /// Parameters with the default values and the given threshold.
    #[must_use]
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Check that every field is within its supported range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameters`] when `threshold` is
    /// not finite, `blur_radius` exceeds [`MAX_BLUR_RADIUS`],
    /// `despeckle_min` or `close_min` exceed [`NEIGHBOR_COUNT`], or
    /// `close_min` is zero (which would promote every background pixel).
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.threshold.is_finite() {
            return Err(PipelineError::InvalidParameters(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.blur_radius > MAX_BLUR_RADIUS {
            return Err(PipelineError::InvalidParameters(format!(
                "blur_radius must be at most {MAX_BLUR_RADIUS}, got {}",
                self.blur_radius
            )));
        }
        if self.despeckle_min > NEIGHBOR_COUNT {
            return Err(PipelineError::InvalidParameters(format!(
                "despeckle_min must be at most {NEIGHBOR_COUNT}, got {}",
                self.despeckle_min
            )));
        }
        if self.close_min == 0 || self.close_min > NEIGHBOR_COUNT {
            return Err(PipelineError::InvalidParameters(format!(
                "close_min must be between 1 and {NEIGHBOR_COUNT}, got {}",
                self.close_min
            )));
        }
        Ok(())
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
            despeckle_min: Self::DEFAULT_DESPECKLE_MIN,
            close_min: Self::DEFAULT_CLOSE_MIN,
        }
    }
}

/// Binary per-pixel edge flags.
///
/// Values are strictly edge / not-edge. The mask is never rewritten
/// while it is being read: cleanup borrows one mask and builds a new
/// one (see [`cleanup::clean`](crate::cleanup::clean)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl EdgeMask {
    /// An all-background mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Mask dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether `(x, y)` is an edge. Out-of-bounds coordinates are not
    /// edges.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x as usize, y as usize)]
    }

    /// Set the flag at `(x, y)`. Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, x: u32, y: u32, edge: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x as usize, y as usize);
            self.cells[i] = edge;
        }
    }

    /// Number of edge pixels.
    #[must_use]
    pub fn edge_count(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    /// Number of edge pixels among the 8 neighbours of `(x, y)`.
    ///
    /// Neighbours outside the image are skipped rather than counted
    /// as either edge or background.
    #[must_use]
    pub fn edge_neighbors(&self, x: u32, y: u32) -> u8 {
        self.neighbors_at(x as usize, y as usize)
    }

    /// Row-major flags, one per pixel.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [bool] {
        &mut self.cells
    }

    pub(crate) fn neighbors_at(&self, x: usize, y: usize) -> u8 {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut count = 0;
        for dy in -1..=1_isize {
            for dx in -1..=1_isize {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy))
                else {
                    continue;
                };
                if nx < w && ny < h && self.cells[ny * w + nx] {
                    count += 1;
                }
            }
        }
        count
    }

    pub(crate) fn at(&self, x: usize, y: usize) -> bool {
        self.cells[self.index(x, y)]
    }

    const fn index(&self, x: usize, y: usize) -> usize {
        y * self.width as usize + x
    }

    /// Render the mask as a grayscale preview: 255 for edges, 0 for
    /// background.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }
}

/// The finished line-art image.
///
/// `rgba` holds the raw pixels (opaque black ink on a fully transparent
/// background) and `png` the same pixels encoded for transport.
/// Ownership passes to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// Output dimensions, always equal to the source dimensions.
    pub dimensions: Dimensions,
    /// Raw RGBA8 pixels.
    pub rgba: RgbaImage,
    /// PNG-encoded `rgba`.
    pub png: Vec<u8>,
}

impl OutputArtifact {
    /// MIME type of [`png`](Self::png).
    pub const MIME_TYPE: &str = "image/png";

    /// Consume the artifact, keeping only the encoded bytes.
    #[must_use]
    pub fn into_png(self) -> Vec<u8> {
        self.png
    }
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Each field captures the output of one stage so hosts can preview
/// or inspect the whole chain.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Decoded RGBA source.
    pub original: RgbaImage,
    /// Luma intensity of the source.
    pub intensity: IntensityField,
    /// Gaussian-blurred intensity.
    pub blurred: IntensityField,
    /// Sobel gradient magnitude.
    pub gradient: GradientField,
    /// Edge mask straight out of thresholding.
    pub raw_mask: EdgeMask,
    /// Edge mask after despeckle and closing.
    pub mask: EdgeMask,
    /// Encoded output.
    pub artifact: OutputArtifact,
}

impl StagedResult {
    /// Source (and output) dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.artifact.dimensions
    }
}

/// Errors that can occur during pipeline processing.
///
/// Every error is terminal for one invocation: no partial artifact is
/// produced.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The input bytes are not a decodable image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// A raster buffer of the required size could not be allocated.
    #[error("cannot allocate raster surface: {0}")]
    Context(String),

    /// The source image has zero width or height.
    #[error("source image has degenerate dimensions {width}x{height}")]
    DegenerateInput {
        /// Source width.
        width: u32,
        /// Source height.
        height: u32,
    },

    /// A parameter is outside its supported range.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The output raster could not be encoded.
    #[error("failed to encode output image: {0}")]
    Encode(String),
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    EmptyInput,
    ImageDecode(String),
    Context(String),
    DegenerateInput { width: u32, height: u32 },
    InvalidParameters(String),
    Encode(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::Context(s) => PipelineErrorProxy::Context(s.clone()),
            Self::DegenerateInput { width, height } => PipelineErrorProxy::DegenerateInput {
                width: *width,
                height: *height,
            },
            Self::InvalidParameters(s) => PipelineErrorProxy::InvalidParameters(s.clone()),
            Self::Encode(s) => PipelineErrorProxy::Encode(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            // The typed decoder error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::ImageDecode(image::ImageError::Decoding(
                    image::error::DecodingError::new(image::error::ImageFormatHint::Unknown, msg),
                ))
            }
            PipelineErrorProxy::Context(s) => Self::Context(s),
            PipelineErrorProxy::DegenerateInput { width, height } => {
                Self::DegenerateInput { width, height }
            }
            PipelineErrorProxy::InvalidParameters(s) => Self::InvalidParameters(s),
            PipelineErrorProxy::Encode(s) => Self::Encode(s),
        })
    }
}
