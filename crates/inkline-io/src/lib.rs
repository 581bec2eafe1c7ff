//! inkline-io: image loading and the reference-to-line-art entry point.
//!
//! [`convert`] is the invocation contract hosts use: give it an image
//! reference and [`Parameters`] and it returns the encoded
//! [`OutputArtifact`] or a typed [`ConvertError`]. Fetching is the only
//! asynchronous step; everything after it runs synchronously in
//! `inkline-pipeline`.

pub mod error;
pub mod fetch;
#[cfg(target_arch = "wasm32")]
pub mod raster;
pub mod reference;

use inkline_pipeline::{OutputArtifact, Parameters, RgbaImage};
use tracing::{info, warn};

pub use error::{ConvertError, LoadError};
#[cfg(target_arch = "wasm32")]
pub use fetch::BrowserFetcher;
#[cfg(not(target_arch = "wasm32"))]
pub use fetch::FileFetcher;
pub use fetch::ImageFetcher;
pub use reference::ImageReference;

/// Resolve `reference` into a decoded RGBA source image.
///
/// This is the single asynchronous step of a conversion.
///
/// # Errors
///
/// Returns [`ConvertError::Load`] with whatever [`LoadError`] the
/// fetcher reports, or with [`LoadError::Decode`] if the bytes are not a
/// decodable image. Returns [`ConvertError::Context`] if the decoder
/// cannot allocate a buffer for the image.
pub async fn load<F: ImageFetcher>(
    fetcher: &F,
    reference: &ImageReference,
) -> Result<RgbaImage, ConvertError> {
    info!(%reference, "loading image");
    let bytes = fetcher.fetch(reference).await.inspect_err(|e| {
        warn!(%reference, error = %e, "image fetch failed");
    })?;
    inkline_pipeline::decode::decode(&bytes).map_err(|e| {
        warn!(%reference, error = %e, "image decode failed");
        ConvertError::from(e)
    })
}

/// Convert the image behind `reference` into transparent line art.
///
/// Parameters are validated before anything is fetched. There is no
/// retry; dropping the returned future abandons the fetch.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidParameters`] for out-of-range
/// parameters, any error from [`load`],
/// [`ConvertError::DegenerateInput`] for a zero-sized image,
/// [`ConvertError::Context`] if the image is too large to process, and
/// [`ConvertError::Encode`] if the output cannot be encoded.
pub async fn convert<F: ImageFetcher>(
    fetcher: &F,
    reference: &ImageReference,
    params: &Parameters,
) -> Result<OutputArtifact, ConvertError> {
    params.validate()?;
    let source = load(fetcher, reference).await?;

    let artifact = inkline_pipeline::process_image(&source, params).map_err(|e| {
        warn!(%reference, error = %e, "conversion failed");
        ConvertError::from(e)
    })?;
    info!(
        %reference,
        width = artifact.dimensions.width,
        height = artifact.dimensions.height,
        png_bytes = artifact.png.len(),
        "converted to line art"
    );
    Ok(artifact)
}
