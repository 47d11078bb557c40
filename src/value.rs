//! Data contexts and the loose value coercions templates rely on
//!
//! Template data is plain JSON. Placeholders are filled by coercing values to
//! text, and block tags test values for truthiness, using the same rules a
//! browser script would apply to the data.

use serde_json::{Map, Number, Value};

/// A data context: an ordered mapping from key to value.
///
/// Key order is significant for rendering: top-level substitution visits keys
/// in insertion order.
pub type Context = Map<String, Value>;

/// Returns `true` unless the value is one of the falsy values
/// (`false`, `0`, `""`, `null`).
///
/// Empty arrays and empty objects are truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Truthiness of an optional lookup; an absent key is falsy.
pub fn is_present_and_truthy(value: Option<&Value>) -> bool {
    value.map_or(false, is_truthy)
}

/// Text a placeholder expands to: the value's text form, or the empty string
/// when the value is falsy.
pub fn placeholder_text(value: &Value) -> String {
    if is_truthy(value) {
        to_text(value)
    } else {
        String::new()
    }
}

/// Coerce a value to text.
///
/// Arrays join their elements with `,` (nulls become empty), objects render as
/// `[object Object]`.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // Integral floats print without a fractional part
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
