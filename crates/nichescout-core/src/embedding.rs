//! Normalization of stored embedding vectors.
//!
//! Embeddings reach storage either as a native JSON array or as a string
//! holding an array literal (`"[0.1, 0.2]"`, pgvector text form). Everything
//! read back from persistence goes through [`decode_embedding`] so the rest
//! of the pipeline only ever sees `Some(vector)` or `None`.

use serde_json::Value;

use crate::CoreError;

/// Decode a stored embedding into a numeric vector.
///
/// Returns `Ok(None)` for an absent value (`None`, JSON `null`, empty
/// string). Empty arrays, non-numeric or non-finite elements, and strings
/// that are not array literals are errors so callers can log and degrade.
///
/// # Errors
///
/// Returns [`CoreError::MalformedEmbedding`] describing why the value was rejected.
pub fn decode_embedding(raw: Option<&Value>) -> Result<Option<Vec<f32>>, CoreError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => decode_array(items).map(Some),
        Some(Value::String(text)) => decode_text(text),
        Some(other) => Err(CoreError::MalformedEmbedding(format!(
            "unsupported JSON type: {}",
            json_type(other)
        ))),
    }
}

/// Encode a vector as a native JSON array for storage.
#[must_use]
pub fn encode_embedding(vector: &[f32]) -> Value {
    Value::Array(vector.iter().map(|v| Value::from(f64::from(*v))).collect())
}

fn decode_array(items: &[Value]) -> Result<Vec<f32>, CoreError> {
    if items.is_empty() {
        return Err(CoreError::MalformedEmbedding("empty vector".to_string()));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64()
                .filter(|v| v.is_finite())
                .map(narrow)
                .ok_or_else(|| {
                    CoreError::MalformedEmbedding(format!("element {i} is not a finite number"))
                })
        })
        .collect()
}

fn decode_text(text: &str) -> Result<Option<Vec<f32>>, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return decode_array(&items).map(Some);
    }

    // pgvector / Postgres array text: "[1,2,3]" with odd spacing or "{1,2,3}".
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .ok_or_else(|| {
            CoreError::MalformedEmbedding("string is not an array literal".to_string())
        })?;

    let values = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CoreError::MalformedEmbedding(format!("'{s}' is not a number")))
        })
        .collect::<Result<Vec<f32>, CoreError>>()?;

    if values.is_empty() {
        return Err(CoreError::MalformedEmbedding("empty vector".to_string()));
    }
    Ok(Some(values))
}

#[allow(clippy::cast_possible_truncation)]
fn narrow(v: f64) -> f32 {
    v as f32
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
