/// Argument coercion for tool calls
///
/// Some clients send arguments in the wrong JSON type: objects and arrays as
/// JSON-encoded strings, numbers and booleans as strings, ids as numbers. Before
/// dispatch each argument is converted to the type its schema declares when the
/// conversion is lossless; anything else is passed through untouched.

use serde_json::{Map, Number, Value};

/// Coerce arguments to the types declared by a tool's input schema
///
/// Arguments without a schema entry, invalid JSON, JSON of the wrong shape and
/// strings that are not numbers or `true`/`false` are left untouched.
pub fn coerce_stringified_params(input_schema: &Value, args: Map<String, Value>) -> Map<String, Value> {
    let Some(properties) = input_schema.get("properties").and_then(Value::as_object) else {
        return args;
    };

    args.into_iter()
        .map(|(key, value)| {
            let expected = properties
                .get(&key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str);

            let value = match expected {
                Some(kind) => match coerce_value(kind, &value) {
                    Some(coerced) => {
                        tracing::debug!(param = %key, "Coerced argument to {}", kind);
                        coerced
                    }
                    None => value,
                },
                None => value,
            };

            (key, value)
        })
        .collect()
}

/// Converted value, or None when `value` should stay as it is
fn coerce_value(kind: &str, value: &Value) -> Option<Value> {
    match (kind, value) {
        ("object" | "array", Value::String(raw)) => {
            let parsed = serde_json::from_str::<Value>(raw.trim()).ok()?;
            matches_kind(kind, &parsed).then_some(parsed)
        }
        ("number", Value::String(raw)) => parse_number(raw.trim(), true),
        ("integer", Value::String(raw)) => parse_number(raw.trim(), false),
        ("boolean", Value::String(raw)) => match raw.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn parse_number(raw: &str, allow_fraction: bool) -> Option<Value> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    if !allow_fraction {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn matches_kind(kind: &str, value: &Value) -> bool {
    match kind {
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => false,
    }
}
