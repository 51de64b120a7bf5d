//! snake_case → camelCase key rewriting for JSON bodies.

use serde_json::{Map, Value};

/// How far key rewriting reaches into a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Keys are emitted as produced by the handler.
    #[default]
    Preserve,
    /// Rewrites keys of the top-level object, or of each object directly
    /// inside a top-level array.
    Camel,
    /// Rewrites keys at every depth, through nested objects and array elements.
    CamelDeep,
}

/// Converts one snake_case key to camelCase.
///
/// Leading underscores are kept, as is a single trailing one. Keys without
/// inner underscores are returned unchanged, so applying this twice is the same
/// as applying it once.
///
/// ```
/// use cms_backend::utils::key_case::to_camel_case;
///
/// assert_eq!(to_camel_case("full_name"), "fullName");
/// assert_eq!(to_camel_case("fullName"), "fullName");
/// assert_eq!(to_camel_case("_private_id"), "_privateId");
/// ```
pub fn to_camel_case(key: &str) -> String {
    let body = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..key.len() - body.len()]);

    let mut upper_next = false;
    for ch in body.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    if upper_next {
        out.push('_');
    }

    out
}

/// Rewrites object keys in `value` according to `mode`.
pub fn transform(value: Value, mode: KeyCase) -> Value {
    match mode {
        KeyCase::Preserve => value,
        KeyCase::CamelDeep => camelize_deep(value),
        KeyCase::Camel => match value {
            Value::Object(map) => Value::Object(camelize_keys(map, |v| v)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(map) => Value::Object(camelize_keys(map, |v| v)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        },
    }
}

fn camelize_deep(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(camelize_keys(map, camelize_deep)),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_deep).collect()),
        other => other,
    }
}

fn camelize_keys(map: Map<String, Value>, child: impl Fn(Value) -> Value) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (to_camel_case(&k), child(v)))
        .collect()
}
