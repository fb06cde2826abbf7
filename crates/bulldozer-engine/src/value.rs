//! Loose value semantics for editor- and author-supplied JSON values.
//!
//! Attributes and field values come from the host as untyped JSON. Block
//! code mostly wants to know "is there something here" and "what does it
//! look like as text", so these helpers centralise those rules.

use serde_json::Value;

/// Whether a value counts as empty: null, `false`, `0`, `""`, `"0"`, `[]` or `{}`.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Whether an optional value is present and non-empty.
pub fn is_truthy(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !is_empty(v))
}

/// Render a scalar value as plain text.
///
/// Strings are returned without quotes, booleans as `1`/empty, null as empty.
/// Arrays and objects fall back to their JSON encoding.
pub fn to_plain_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Interpret a value as an integer, parsing numeric strings.
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Loose conversion of a field value into a Rust type.
///
/// Casts never fail: numeric strings become numbers, `0`/`1` become booleans
/// and a scalar read as a list becomes a one-element list.
pub trait FieldCast: Sized {
    fn cast(value: &Value) -> Self;
}

impl FieldCast for Value {
    fn cast(value: &Value) -> Self {
        value.clone()
    }
}

impl FieldCast for String {
    fn cast(value: &Value) -> Self {
        to_plain_string(value)
    }
}

impl FieldCast for bool {
    fn cast(value: &Value) -> Self {
        !is_empty(value)
    }
}

impl FieldCast for i64 {
    fn cast(value: &Value) -> Self {
        match value {
            Value::Array(_) | Value::Object(_) => i64::from(!is_empty(value)),
            Value::String(s) => leading_int(s),
            other => to_i64(other).unwrap_or_default(),
        }
    }
}

macro_rules! cast_via_i64 {
    ($($ty:ty),*) => {
        $(
            impl FieldCast for $ty {
                fn cast(value: &Value) -> Self {
                    <$ty>::try_from(i64::cast(value)).unwrap_or_default()
                }
            }
        )*
    };
}

cast_via_i64!(i32, u32, u64, usize);

impl FieldCast for f64 {
    fn cast(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_else(|_| leading_int(s) as f64),
            other => i64::cast(other) as f64,
        }
    }
}

impl<T: FieldCast> FieldCast for Vec<T> {
    fn cast(value: &Value) -> Self {
        match value {
            Value::Array(items) => items.iter().map(T::cast).collect(),
            Value::Object(map) => map.values().map(T::cast).collect(),
            scalar => vec![T::cast(scalar)],
        }
    }
}

/// Integer prefix of a string, `0` when there is none (`"12px"` is 12).
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['-', '+']));
    let digits = s[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |end| end + sign_len);
    s[..digits].parse().unwrap_or_default()
}
