//! Error types for WebAssembly bridge implementations

use bridge_traits::error::BridgeError;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors that can occur in WebAssembly bridge implementations
#[derive(Error, Debug)]
pub enum WasmError {
    /// JavaScript error from web-sys
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A browser API is missing (no window, no Web Audio, ...)
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// Node belongs to another bridge implementation
    #[error("Foreign audio node: {0}")]
    ForeignNode(String),
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::NotAvailable(what) => BridgeError::NotAvailable(what),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

impl From<JsValue> for WasmError {
    fn from(js_value: JsValue) -> Self {
        WasmError::JavaScript(js_message(&js_value))
    }
}

pub(crate) fn js_message(err: &JsValue) -> String {
    if err.is_string() {
        err.as_string().unwrap_or_default()
    } else if let Some(js_err) = err.dyn_ref::<js_sys::Error>() {
        js_err.message().into()
    } else {
        format!("{err:?}")
    }
}

pub(crate) fn js_error(context: &str, err: JsValue) -> BridgeError {
    BridgeError::OperationFailed(format!("web audio {context}: {}", js_message(&err)))
}
