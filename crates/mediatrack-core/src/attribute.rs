//! Tagged attribute values
//!
//! The backing store never infers types: every value it receives carries an
//! explicit tag. [`AttrValue`] is that tagged form, and [`encode`] turns any
//! JSON value reachable from a request body into it.
//!
//! Encoding rules, applied depth-first:
//!
//! - `null` and the sentinel string `"N/A"` become [`AttrValue::Null`]
//! - booleans become [`AttrValue::Bool`]
//! - numbers become [`AttrValue::Num`], kept as their decimal text
//! - objects become [`AttrValue::Map`]; an empty object stays an empty map
//! - anything else becomes [`AttrValue::Str`] via its textual form

use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::collections::BTreeMap;

/// Sentinel that upstream stages emit for "no value".
pub const NOT_AVAILABLE: &str = "N/A";

/// A document: attribute name to tagged value.
pub type AttrMap = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    /// Decimal text form, e.g. `"12.5"`.
    Num(String),
    Str(String),
    Map(AttrMap),
}

impl AttrValue {
    /// Empty nested map.
    pub fn empty_map() -> Self {
        AttrValue::Map(AttrMap::new())
    }

    /// Wire type tag, using the DynamoDB descriptor names.
    pub fn type_tag(&self) -> &'static str {
        match self {
            AttrValue::Null => "NULL",
            AttrValue::Bool(_) => "BOOL",
            AttrValue::Num(_) => "N",
            AttrValue::Str(_) => "S",
            AttrValue::Map(_) => "M",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<AttrMap> for AttrValue {
    fn from(value: AttrMap) -> Self {
        AttrValue::Map(value)
    }
}

/// Encode a JSON value into its tagged form. Pure and total.
pub fn encode(value: &JsonValue) -> AttrValue {
    match value {
        JsonValue::Null => AttrValue::Null,
        JsonValue::String(s) if s == NOT_AVAILABLE => AttrValue::Null,
        JsonValue::Bool(b) => AttrValue::Bool(*b),
        JsonValue::Number(n) => AttrValue::Num(n.to_string()),
        JsonValue::Object(fields) => AttrValue::Map(encode_object(fields)),
        JsonValue::String(s) => AttrValue::Str(s.clone()),
        JsonValue::Array(_) => AttrValue::Str(value.to_string()),
    }
}

/// Encode each field of a JSON object.
pub fn encode_object(fields: &JsonMap<String, JsonValue>) -> AttrMap {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

/// Decode a tagged value back into JSON.
///
/// Numeric text is read as `i64`, then `u64`, then `f64`; text that is none
/// of those (or a non-finite float) comes back as a JSON string so nothing is
/// dropped.
///
/// The number type is not preserved: DynamoDB normalizes numeric text, so a
/// stored `1.0` is returned as `"1"` and decodes to the integer `1`. The
/// memory backend keeps the text as written.
pub fn decode(value: &AttrValue) -> JsonValue {
    match value {
        AttrValue::Null => JsonValue::Null,
        AttrValue::Bool(b) => JsonValue::Bool(*b),
        AttrValue::Num(text) => decode_number(text),
        AttrValue::Str(s) => JsonValue::String(s.clone()),
        AttrValue::Map(fields) => JsonValue::Object(decode_map(fields)),
    }
}

/// Decode every field of a tagged document.
pub fn decode_map(fields: &AttrMap) -> JsonMap<String, JsonValue> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode(value)))
        .collect()
}

fn decode_number(text: &str) -> JsonValue {
    if let Ok(i) = text.parse::<i64>() {
        return JsonValue::Number(i.into());
    }
    if let Ok(u) = text.parse::<u64>() {
        return JsonValue::Number(u.into());
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(text.to_string()))
}
