//! Shared driver-value-to-JSON conversion helpers.

use base64::Engine as _;
use serde_json::Value;

/// Converts a float to a JSON number, mapping NaN/infinity to null.
pub(super) fn number(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Converts an arbitrary-precision decimal, preferring a JSON number and
/// falling back to its string form when it does not fit an f64.
pub(super) fn decimal(d: sqlx::types::BigDecimal) -> Value {
    let text = d.to_string();
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => number(f),
        _ => Value::String(text),
    }
}

/// Encodes binary column data as base64 text.
pub(super) fn bytes(b: Vec<u8>) -> Value {
    Value::String(base64::engine::general_purpose::STANDARD.encode(b))
}

/// Renders a decoded temporal value as its string form, degrading to null
/// on decode failure rather than failing the whole row.
pub(super) fn stringify<T: ToString>(
    decoded: std::result::Result<Option<T>, sqlx::Error>,
) -> Value {
    decoded
        .ok()
        .flatten()
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}
