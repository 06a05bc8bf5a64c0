//! Value builders used by instrumented code to capture arguments and results.

use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize a call-time value. Values that refuse to serialize are recorded as
/// a descriptive string rather than failing the call.
pub fn capture<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to serialize captured value");
            Value::String(format!("<unserializable: {err}>"))
        }
    }
}

/// Object built from a destructured struct parameter.
pub fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    let mut map = Map::with_capacity(N);
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// Array built from a destructured positional parameter.
pub fn array<const N: usize>(items: [Value; N]) -> Value {
    Value::Array(items.into())
}

/// Placeholder for a positional slot the pattern does not bind.
pub fn hole() -> Value {
    Value::Null
}

/// Wraps a plain (non-`Result`) return value so hooks record it as a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Returned<T>(pub T);
