//! Web worker entry point for inkline line-art conversion.
//!
//! This crate compiles to a standalone WASM module that runs inside a
//! `Worker`. It receives an image URL and JSON-encoded `Parameters` via
//! `postMessage`, fetches the image with CORS, runs the conversion, and
//! posts the encoded PNG back as a `Uint8Array`.
//!
//! Running the conversion in a worker keeps the browser's main thread
//! free. To abort a long conversion the host terminates the worker.
//!
//! # Message protocol
//!
//! Request object:
//! - `url`: `String` image URL (`https:`, `blob:`, `data:`), or
//!   `imageBytes`: `Uint8Array` when the host already holds the file
//! - `paramsJson`: `String` JSON-serialized `Parameters` (missing
//!   fields take their defaults)
//! - `generation`: `f64` counter echoed back so the host can drop
//!   stale results
//!
//! Success response:
//! - `generation`, `ok: true`
//! - `width`, `height`: `f64`
//! - `png`: `Uint8Array`
//!
//! Error response:
//! - `generation`, `ok: false`
//! - `errorJson`: `String` JSON-serialized [`WorkerError`]

use inkline_io::ConvertError;
use inkline_pipeline::Parameters;
use serde::{Deserialize, Serialize};

/// Error reported to the host: a stable category plus a readable
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerError {
    /// One of `load`, `context`, `degenerate_input`,
    /// `invalid_parameters`, `encode`.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl WorkerError {
    /// JSON form sent in `errorJson`.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"kind":"{}","message":"serialization error: {e}"}}"#, self.kind)
        })
    }
}

impl From<&ConvertError> for WorkerError {
    fn from(err: &ConvertError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Parse the `paramsJson` request field.
///
/// # Errors
///
/// Returns a `WorkerError` of kind `invalid_parameters` if the JSON is
/// malformed.
pub fn parse_params(json: &str) -> Result<Parameters, WorkerError> {
    serde_json::from_str(json).map_err(|e| WorkerError {
        kind: "invalid_parameters".to_string(),
        message: format!("failed to parse parameters: {e}"),
    })
}

#[cfg(target_arch = "wasm32")]
mod entry {
    use inkline_io::{BrowserFetcher, ImageReference};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use super::{WorkerError, parse_params};

    /// Called automatically when the WASM module is instantiated in the
    /// worker context.
    #[wasm_bindgen(start)]
    pub fn worker_main() {
        console_error_panic_hook::set_once();

        let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
            .dyn_into()
            .expect_throw("not running in a DedicatedWorkerGlobalScope");

        let onmessage =
            Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
                wasm_bindgen_futures::spawn_local(handle_message(event.data()));
            });
        global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget(); // lives for the worker lifetime
    }

    fn field(data: &JsValue, key: &str) -> JsValue {
        js_sys::Reflect::get(data, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
    }

    fn request_reference(data: &JsValue) -> Option<ImageReference> {
        if let Some(url) = field(data, "url").as_string() {
            return Some(ImageReference::Url(url));
        }
        field(data, "imageBytes")
            .dyn_into::<js_sys::Uint8Array>()
            .ok()
            .map(|bytes| ImageReference::Bytes(bytes.to_vec()))
    }

    async fn handle_message(data: JsValue) {
        let generation = field(&data, "generation").as_f64().unwrap_or(0.0);

        let Some(reference) = request_reference(&data) else {
            post_error(
                generation,
                &WorkerError {
                    kind: "load".to_string(),
                    message: "request has neither url nor imageBytes".to_string(),
                },
            );
            return;
        };

        let params_json = field(&data, "paramsJson")
            .as_string()
            .unwrap_or_else(|| "{}".to_string());
        let params = match parse_params(&params_json) {
            Ok(p) => p,
            Err(e) => {
                post_error(generation, &e);
                return;
            }
        };

        match inkline_io::convert(&BrowserFetcher, &reference, &params).await {
            Ok(artifact) => {
                let response = js_sys::Object::new();
                let set = |key: &str, val: &JsValue| {
                    let _ = js_sys::Reflect::set(&response, &JsValue::from_str(key), val);
                };
                set("generation", &JsValue::from_f64(generation));
                set("ok", &JsValue::from_bool(true));
                set("width", &JsValue::from_f64(f64::from(artifact.dimensions.width)));
                set("height", &JsValue::from_f64(f64::from(artifact.dimensions.height)));
                set("png", &js_sys::Uint8Array::from(artifact.png.as_slice()));
                post(&response);
            }
            Err(e) => post_error(generation, &WorkerError::from(&e)),
        }
    }

    fn post_error(generation: f64, error: &WorkerError) {
        let response = js_sys::Object::new();
        let _ = js_sys::Reflect::set(
            &response,
            &JsValue::from_str("generation"),
            &JsValue::from_f64(generation),
        );
        let _ = js_sys::Reflect::set(
            &response,
            &JsValue::from_str("ok"),
            &JsValue::from_bool(false),
        );
        let _ = js_sys::Reflect::set(
            &response,
            &JsValue::from_str("errorJson"),
            &JsValue::from_str(&error.to_json()),
        );
        post(&response);
    }

    fn post(response: &js_sys::Object) {
        if let Ok(global) = js_sys::global().dyn_into::<web_sys::DedicatedWorkerGlobalScope>() {
            let _ = global.post_message(response);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use inkline_io::LoadError;
    use inkline_pipeline::PipelineError;

    use super::*;

    #[test]
    fn empty_params_json_uses_defaults() {
        assert_eq!(parse_params("{}").unwrap(), Parameters::default());
    }

    #[test]
    fn partial_params_json_overrides_one_field() {
        let params = parse_params(r#"{"threshold": 60}"#).unwrap();
        assert!((params.threshold - 60.0).abs() < f32::EPSILON);
        assert_eq!(params.close_min, Parameters::DEFAULT_CLOSE_MIN);
    }

    #[test]
    fn malformed_params_json_is_invalid_parameters() {
        let err = parse_params("{threshold:").unwrap_err();
        assert_eq!(err.kind, "invalid_parameters");
    }

    #[test]
    fn convert_errors_map_to_kinds() {
        let cases = [
            (
                ConvertError::from(LoadError::Http {
                    status: 403,
                    url: "https://x/y.png".into(),
                }),
                "load",
            ),
            (
                ConvertError::from(PipelineError::Context("too large".into())),
                "context",
            ),
            (
                ConvertError::from(PipelineError::DegenerateInput {
                    width: 0,
                    height: 0,
                }),
                "degenerate_input",
            ),
        ];
        for (err, kind) in cases {
            let worker = WorkerError::from(&err);
            assert_eq!(worker.kind, kind);
            assert_eq!(worker.message, err.to_string());
        }
    }

    #[test]
    fn error_json_round_trips() {
        let err = WorkerError {
            kind: "encode".to_string(),
            message: "disk \"full\"".to_string(),
        };
        let back: WorkerError = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(back, err);
    }
}
