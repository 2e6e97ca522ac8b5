use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::codec;
use crate::render::style::TraceStyle;

fn to_js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

fn error_result(msg: &str) -> JsValue {
    let obj = serde_json::json!({"error": msg});
    to_js(&obj)
}

fn style_from(style_json: Option<String>) -> Result<TraceStyle, String> {
    match style_json.as_deref() {
        None | Some("") => Ok(TraceStyle::plain()),
        Some(text) => TraceStyle::from_json(text).map_err(|e| e.to_string()),
    }
}

/// Render a JSON-encoded error chain as a trace.
///
/// Without a style the trace is plain text. Failures come back as a
/// one-line `error: ...` string.
#[wasm_bindgen]
pub fn trace_json(json: &str, style_json: Option<String>) -> String {
    let style = match style_from(style_json) {
        Ok(style) => style,
        Err(e) => return format!("error: {e}"),
    };
    match codec::render_json(json, &style) {
        Ok(Some(trace)) => trace,
        Ok(None) => "error: document is not an encoded error".to_string(),
        Err(e) => format!("error: {e}"),
    }
}

/// Decode a JSON-encoded error chain and encode it again.
#[wasm_bindgen]
pub fn normalize_json(json: &str) -> JsValue {
    match codec::normalize_json(json) {
        Ok(Some(map)) => to_js(&map),
        Ok(None) => error_result("Document is not an encoded error"),
        Err(e) => error_result(&e.to_string()),
    }
}

/// Whether a JSON document decodes to an error chain.
#[wasm_bindgen]
pub fn is_encoded_error(json: &str) -> bool {
    matches!(codec::decode_from_json(json), Ok(Some(_)))
}
