//! Layout solver backed by a JavaScript function.
//!
//! The function receives the layout request as a JSON string and returns a
//! Promise (or a plain value) resolving to the response, either as a JSON
//! string or as an object.

use fc_layout::{LayoutError, LayoutRequest, LayoutResponse, LayoutSolver};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

pub struct JsSolver {
    function: js_sys::Function,
}

impl JsSolver {
    pub fn new(function: js_sys::Function) -> Self {
        Self { function }
    }
}

fn failure(value: JsValue) -> LayoutError {
    let message = value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{value:?}"));
    LayoutError::SolverFailure(message)
}

impl LayoutSolver for JsSolver {
    async fn solve(&self, request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
        let json = serde_json::to_string(request)
            .map_err(|e| LayoutError::SolverFailure(format!("encoding request: {e}")))?;
        let returned = self
            .function
            .call1(&JsValue::NULL, &JsValue::from_str(&json))
            .map_err(failure)?;
        let resolved = JsFuture::from(js_sys::Promise::resolve(&returned))
            .await
            .map_err(failure)?;
        let text = match resolved.as_string() {
            Some(text) => text,
            None => js_sys::JSON::stringify(&resolved)
                .map(String::from)
                .map_err(failure)?,
        };
        serde_json::from_str(&text)
            .map_err(|e| LayoutError::SolverFailure(format!("malformed solver response: {e}")))
    }
}
