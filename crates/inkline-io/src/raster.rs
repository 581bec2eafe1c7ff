//! Blob URL creation for displaying an artifact in the browser.

use inkline_pipeline::OutputArtifact;
use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// A browser API call failed.
#[derive(Debug, thiserror::Error)]
#[error("browser API error: {0}")]
pub struct RasterError(String);

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        Self(format!("{value:?}"))
    }
}

/// Wrap encoded image bytes in a `Blob` and return an object URL for it.
///
/// The returned URL must be revoked via [`revoke_blob_url`] when no
/// longer needed to avoid memory leaks.
///
/// # Errors
///
/// Returns [`RasterError`] if Blob or URL creation fails.
pub fn bytes_to_blob_url(bytes: &[u8], mime_type: &str) -> Result<String, RasterError> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));

    let opts = BlobPropertyBag::new();
    opts.set_type(mime_type);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Object URL for the artifact's PNG, for use as an `<img src>`.
///
/// # Errors
///
/// Returns [`RasterError`] if Blob or URL creation fails.
pub fn artifact_to_blob_url(artifact: &OutputArtifact) -> Result<String, RasterError> {
    bytes_to_blob_url(&artifact.png, OutputArtifact::MIME_TYPE)
}

/// Revoke a URL created by [`bytes_to_blob_url`] or
/// [`artifact_to_blob_url`].
///
/// Best-effort: the URL may already have been revoked.
pub fn revoke_blob_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}
