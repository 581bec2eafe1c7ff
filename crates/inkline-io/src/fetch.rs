//! Byte fetchers: turn an [`ImageReference`] into encoded image bytes.
//!
//! The decode and filter stages only need bytes, so where those bytes
//! come from is a pluggable service. [`FileFetcher`] serves native
//! hosts from the filesystem; [`BrowserFetcher`] uses the browser's
//! `fetch` in CORS mode from either a window or a worker. Hosts with
//! other sources (an authenticated asset store, a cache) implement
//! [`ImageFetcher`] themselves.

use crate::error::LoadError;
use crate::reference::ImageReference;

/// Source of encoded image bytes.
// Browser fetchers await `JsFuture`s, which are not `Send`, so the
// returned future carries no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    /// Fetch the encoded bytes behind `reference`.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] describing why the bytes could not be
    /// obtained.
    async fn fetch(&self, reference: &ImageReference) -> Result<Vec<u8>, LoadError>;
}

/// Reads [`ImageReference::Path`] from the local filesystem.
///
/// In-memory [`ImageReference::Bytes`] are passed through. URLs are
/// rejected with [`LoadError::UnsupportedReference`].
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[cfg(not(target_arch = "wasm32"))]
impl ImageFetcher for FileFetcher {
    async fn fetch(&self, reference: &ImageReference) -> Result<Vec<u8>, LoadError> {
        match reference {
            ImageReference::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            ImageReference::Bytes(bytes) => Ok(bytes.clone()),
            ImageReference::Url(url) => Err(LoadError::UnsupportedReference(format!(
                "{url} (the filesystem fetcher cannot download URLs)"
            ))),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserFetcher;

#[cfg(target_arch = "wasm32")]
mod browser {
    use js_sys::{Promise, Uint8Array};
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    use super::ImageFetcher;
    use crate::error::LoadError;
    use crate::reference::ImageReference;

    /// Fetches [`ImageReference::Url`] with the browser `fetch` API in
    /// CORS mode.
    ///
    /// Works from a `Window` or any `WorkerGlobalScope`. Local paths
    /// are rejected with [`LoadError::UnsupportedReference`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct BrowserFetcher;

    impl ImageFetcher for BrowserFetcher {
        async fn fetch(&self, reference: &ImageReference) -> Result<Vec<u8>, LoadError> {
            match reference {
                ImageReference::Url(url) => fetch_url(url).await,
                ImageReference::Bytes(bytes) => Ok(bytes.clone()),
                ImageReference::Path(path) => Err(LoadError::UnsupportedReference(format!(
                    "{} (the browser fetcher only loads URLs)",
                    path.display()
                ))),
            }
        }
    }

    fn network(err: JsValue) -> LoadError {
        LoadError::Network(
            err.as_string()
                .or_else(|| {
                    err.dyn_ref::<js_sys::Error>()
                        .map(|e| String::from(e.message()))
                })
                .unwrap_or_else(|| format!("{err:?}")),
        )
    }

    /// Start a fetch from whichever global scope we are running in.
    fn start_fetch(request: &Request) -> Result<Promise, LoadError> {
        let global = js_sys::global();
        if let Some(window) = global.dyn_ref::<web_sys::Window>() {
            Ok(window.fetch_with_request(request))
        } else if let Some(worker) = global.dyn_ref::<web_sys::WorkerGlobalScope>() {
            Ok(worker.fetch_with_request(request))
        } else {
            Err(LoadError::Network(
                "no fetch-capable global scope".to_string(),
            ))
        }
    }

    async fn fetch_url(url: &str) -> Result<Vec<u8>, LoadError> {
        let init = RequestInit::new();
        init.set_method("GET");
        init.set_mode(RequestMode::Cors);
        let request = Request::new_with_str_and_init(url, &init).map_err(network)?;

        let response: Response = JsFuture::from(start_fetch(&request)?)
            .await
            .map_err(network)?
            .dyn_into()
            .map_err(network)?;

        if !response.ok() {
            return Err(LoadError::Http {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .map_err(network)?
            .unwrap_or_default();
        if !super::is_image_content_type(&content_type) {
            return Err(LoadError::NotAnImage(content_type));
        }

        let buffer = JsFuture::from(response.array_buffer().map_err(network)?)
            .await
            .map_err(network)?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

/// Whether a response with this `Content-Type` may carry an image.
///
/// A missing header or a generic binary type is accepted and left to
/// the decoder.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn is_image_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.is_empty() || essence.starts_with("image/") || essence == "application/octet-stream"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_content_types_are_accepted() {
        assert!(is_image_content_type("image/png"));
        assert!(is_image_content_type("Image/JPEG; charset=binary"));
        assert!(is_image_content_type("application/octet-stream"));
        assert!(is_image_content_type(""));
    }

    #[test]
    fn other_content_types_are_rejected() {
        assert!(!is_image_content_type("text/html; charset=utf-8"));
        assert!(!is_image_content_type("application/json"));
    }
}
