//! Conversion between error chains and JSON maps.
//!
//! An encoded node is `{"message": .., "meta": {..}?, "cause": {..} | [..]?}`.
//! Foreign errors keep only their message, so a decoded chain ends in a
//! [`PlainError`] wherever the encoded chain held some other error type.

use std::error::Error as StdError;

use serde_json::{Map, Value};

use crate::chain::walker::{Link, classify, fanout};
use crate::chain::{Cause, ErrorNode, PlainError, join};
use crate::error::Error;
use crate::render::{render, style::TraceStyle};
use crate::types::{Metadata, Scalar};

pub const MESSAGE_KEY: &str = "message";
pub const META_KEY: &str = "meta";
pub const CAUSE_KEY: &str = "cause";

pub fn encode(err: &(dyn StdError + 'static)) -> Map<String, Value> {
    encode_link(classify(err))
}

pub fn encode_to_json(err: &(dyn StdError + 'static)) -> Result<String, Error> {
    Ok(serde_json::to_string(&encode(err))?)
}

pub fn encode_to_json_pretty(err: &(dyn StdError + 'static)) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(&encode(err))?)
}

/// A join handed in directly has no message of its own and is encoded like
/// a foreign error.
fn encode_link(link: Link<'_>) -> Map<String, Value> {
    let Link::Node(node) = link else {
        let mut map = Map::new();
        map.insert(MESSAGE_KEY.into(), Value::String(link.message()));
        return map;
    };

    let mut map = Map::new();
    map.insert(MESSAGE_KEY.into(), Value::String(node.message().to_string()));

    if !node.metadata().is_empty() {
        let meta: Map<String, Value> = node
            .metadata()
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        map.insert(META_KEY.into(), Value::Object(meta));
    }

    if let Some(cause) = node.cause() {
        let members = match cause.link() {
            Link::Join(causes) => fanout(causes),
            single => vec![single],
        };
        let mut encoded: Vec<Value> = members
            .into_iter()
            .map(|member| Value::Object(encode_link(member)))
            .collect();
        let value = if encoded.len() == 1 {
            encoded.remove(0)
        } else {
            Value::Array(encoded)
        };
        map.insert(CAUSE_KEY.into(), value);
    }

    map
}

/// Rebuild a chain from an encoded map.
///
/// Returns `None` when `message` is missing or not a string. A map with
/// neither `meta` nor `cause` becomes a [`PlainError`]: nothing in it says
/// whether it started out as a node.
pub fn decode(map: &Map<String, Value>) -> Option<Cause> {
    let Some(message) = map.get(MESSAGE_KEY).and_then(Value::as_str) else {
        tracing::debug!("encoded error has no string message, skipping");
        return None;
    };

    let meta = map.get(META_KEY).and_then(Value::as_object);
    let cause = map.get(CAUSE_KEY);
    if meta.is_none() && cause.is_none() {
        return Some(PlainError::new(message).into());
    }

    let meta = meta.map(decode_meta).unwrap_or_default();
    let cause = cause.and_then(decode_cause);
    Some(ErrorNode::from_parts(message.to_string(), cause, meta).into())
}

fn decode_meta(object: &Map<String, Value>) -> Metadata {
    let mut meta = Metadata::new();
    for (key, value) in object {
        match Scalar::from_json(value) {
            Some(scalar) => {
                meta.insert(key.clone(), scalar);
            }
            None => tracing::warn!(key = %key, "dropping non-scalar metadata value"),
        }
    }
    meta
}

fn decode_cause(value: &Value) -> Option<Cause> {
    match value {
        Value::Object(map) => decode(map),
        Value::Array(items) => {
            let members: Vec<Cause> = items
                .iter()
                .filter_map(|item| item.as_object().and_then(decode))
                .collect();
            if members.len() < items.len() {
                tracing::debug!(
                    dropped = items.len() - members.len(),
                    "skipping undecodable join members"
                );
            }
            join(members)
        }
        other => {
            tracing::debug!(kind = json_kind(other), "ignoring cause of unexpected shape");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `Ok(None)` when the document is valid JSON but not an object, or an
/// object that does not decode.
pub fn decode_from_json(text: &str) -> Result<Option<Cause>, Error> {
    let value: Value = serde_json::from_str(text)?;
    Ok(value.as_object().and_then(decode))
}

/// Decode a JSON document and render it as a trace.
pub fn render_json(text: &str, style: &TraceStyle) -> Result<Option<String>, Error> {
    Ok(decode_from_json(text)?.map(|cause| render(&cause, style)))
}

/// Decode a JSON document and encode it again, dropping whatever the
/// decoder ignores.
pub fn normalize_json(text: &str) -> Result<Option<Map<String, Value>>, Error> {
    Ok(decode_from_json(text)?.map(|cause| encode(&cause)))
}
