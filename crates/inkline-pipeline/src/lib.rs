//! inkline-pipeline: Pure line-art extraction pipeline (sans-IO).
//!
//! Turns a raster image into a transparent outline through:
//! decode -> luma -> Gaussian blur -> Sobel gradient -> threshold ->
//! despeckle/close -> encode.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Fetching images from a URL
//! or the filesystem lives in `inkline-io`.

pub mod blur;
pub mod cleanup;
pub mod decode;
pub mod diagnostics;
pub mod encode;
pub mod luma;
pub mod pipeline;
mod rows;
pub mod sobel;
pub mod threshold;
pub mod types;

use tracing::instrument;

pub use pipeline::{Pipeline, STAGE_COUNT};
pub use types::{
    Dimensions, EdgeMask, GradientField, GrayImage, IntensityField, OutputArtifact, Parameters,
    PipelineError, RgbaImage, StagedResult,
};

/// Run the full pipeline on encoded image bytes.
///
/// Accepts PNG, JPEG, BMP, WebP, and GIF input. Each intermediate field
/// is dropped as soon as the next one has been computed.
///
/// # Pipeline steps
///
/// 1. Validate parameters, decode, and check the surface size
/// 2. Perceptual luma (`0.299 R + 0.587 G + 0.114 B`)
/// 3. Separable Gaussian blur with edge clamping
/// 4. Sobel gradient magnitude (border ring is zero)
/// 5. Strict threshold into an edge mask
/// 6. Despeckle and closing against the thresholded mask
/// 7. Render black-on-transparent RGBA and encode as PNG
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameters`] for out-of-range
/// parameters, [`PipelineError::EmptyInput`] or
/// [`PipelineError::ImageDecode`] when the bytes are not an image,
/// [`PipelineError::DegenerateInput`] for a zero-sized image,
/// [`PipelineError::Context`] when the image is too large to process,
/// and [`PipelineError::Encode`] if PNG encoding fails.
#[instrument(skip_all, fields(input_bytes = image_bytes.len()))]
pub fn process(image_bytes: &[u8], params: &Parameters) -> Result<OutputArtifact, PipelineError> {
    params.validate()?;
    let original = decode::decode(image_bytes)?;
    run(&original, params)
}

/// Run the full pipeline on an already-decoded RGBA image.
///
/// # Errors
///
/// Same as [`process`], minus the decoding errors.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn process_image(image: &RgbaImage, params: &Parameters) -> Result<OutputArtifact, PipelineError> {
    params.validate()?;
    run(image, params)
}

/// Run the full pipeline, keeping every intermediate.
///
/// Equivalent to driving [`Pipeline`] through every stage.
///
/// # Errors
///
/// Same as [`process`].
#[instrument(skip_all, fields(input_bytes = image_bytes.len()))]
pub fn process_staged(
    image_bytes: &[u8],
    params: &Parameters,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), params.clone())
        .decode()?
        .extract_luma()
        .blur()
        .compute_gradient()
        .threshold()
        .clean()
        .encode()?
        .into_result())
}

fn run(original: &RgbaImage, params: &Parameters) -> Result<OutputArtifact, PipelineError> {
    decode::check_surface(original.width(), original.height())?;

    let intensity = luma::extract(original);
    let blurred = blur::gaussian_blur(&intensity, params.blur_radius);
    drop(intensity);
    let gradient = sobel::gradient_magnitude(&blurred);
    drop(blurred);
    let raw_mask = threshold::binarize(&gradient, params.threshold);
    drop(gradient);
    let mask = cleanup::clean(&raw_mask, params.despeckle_min, params.close_min);
    tracing::debug!(
        raw_edges = raw_mask.edge_count(),
        edges = mask.edge_count(),
        "edge mask ready"
    );
    drop(raw_mask);

    encode::encode(&mask)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Left half black, right half white: a single strong vertical edge.
    fn split_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        encode::encode_png(&img).unwrap()
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &Parameters::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &Parameters::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_rejects_invalid_parameters() {
        let params = Parameters {
            blur_radius: 1000,
            ..Parameters::default()
        };
        let result = process(&split_png(8, 8), &params);
        assert!(matches!(result, Err(PipelineError::InvalidParameters(_))));
    }

    #[test]
    fn process_split_image_draws_a_vertical_line() {
        let artifact = process(&split_png(40, 20), &Parameters::default()).unwrap();
        assert_eq!(
            artifact.dimensions,
            Dimensions {
                width: 40,
                height: 20
            }
        );
        // Interior rows carry ink around the boundary column only.
        for y in 1..19 {
            assert_eq!(artifact.rgba.get_pixel(19, y).0, encode::INK, "row {y}");
            assert_eq!(artifact.rgba.get_pixel(5, y).0, encode::PAPER, "row {y}");
            assert_eq!(artifact.rgba.get_pixel(35, y).0, encode::PAPER, "row {y}");
        }
    }

    #[test]
    fn process_image_matches_process() {
        let png = split_png(24, 24);
        let decoded = image::load_from_memory(&png).unwrap().into_rgba8();
        let from_bytes = process(&png, &Parameters::default()).unwrap();
        let from_pixels = process_image(&decoded, &Parameters::default()).unwrap();
        assert_eq!(from_bytes, from_pixels);
    }

    #[test]
    fn process_staged_matches_process() {
        let png = split_png(24, 24);
        let staged = process_staged(&png, &Parameters::default()).unwrap();
        let artifact = process(&png, &Parameters::default()).unwrap();
        assert_eq!(staged.artifact, artifact);
        assert_eq!(staged.original.dimensions(), (24, 24));
        assert_eq!(staged.gradient.dimensions(), (24, 24));
    }

    #[test]
    fn process_image_rejects_empty_surface() {
        let result = process_image(&RgbaImage::new(3, 0), &Parameters::default());
        assert!(matches!(
            result,
            Err(PipelineError::DegenerateInput {
                width: 3,
                height: 0
            })
        ));
    }
}
