//! Shareable export codes: units serialized to JSON with short keys, then base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::models::TeachingUnit;

const KEY_ALIASES: [(&str, &str); 11] = [
    ("id", "i"),
    ("name", "n"),
    ("coefficient", "c"),
    ("color", "o"),
    ("subjects", "s"),
    ("grades", "g"),
    ("value", "v"),
    ("type", "t"),
    ("min", "m"),
    ("max", "x"),
    ("isConfirmed", "f"),
];

/// Grade value tags are shortened too, so `"t":"e"` codes do not load in the
/// web calculator, which only aliases keys. Long tags still decode here.
const TAG_ALIASES: [(&str, &str); 2] = [("exact", "e"), ("range", "r")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Shorten,
    Expand,
}

impl Direction {
    fn lookup(self, table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
        table.iter().find_map(|&(long, short)| match self {
            Direction::Shorten if long == key => Some(short),
            Direction::Expand if short == key => Some(long),
            _ => None,
        })
    }

    /// Unknown keys pass through untouched.
    fn rename(self, key: String) -> String {
        self.lookup(&KEY_ALIASES, &key)
            .map(str::to_string)
            .unwrap_or(key)
    }

    fn type_key(self) -> &'static str {
        match self {
            Direction::Shorten => "t",
            Direction::Expand => "type",
        }
    }
}

fn rewrite(value: Value, direction: Direction) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite(item, direction))
                .collect(),
        ),
        Value::Object(fields) => {
            let mut renamed = Map::with_capacity(fields.len());
            for (key, field) in fields {
                let key = direction.rename(key);
                let field = match field {
                    Value::String(tag) if key == direction.type_key() => Value::String(
                        direction
                            .lookup(&TAG_ALIASES, &tag)
                            .map(str::to_string)
                            .unwrap_or(tag),
                    ),
                    other => rewrite(other, direction),
                };
                renamed.insert(key, field);
            }
            Value::Object(renamed)
        }
        scalar => scalar,
    }
}

pub fn shorten_keys(value: Value) -> Value {
    rewrite(value, Direction::Shorten)
}

pub fn expand_keys(value: Value) -> Value {
    rewrite(value, Direction::Expand)
}

pub fn encode(units: &[TeachingUnit]) -> Result<String, CodecError> {
    let compact = shorten_keys(serde_json::to_value(units)?);
    let json = serde_json::to_string(&compact)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Decodes and validates an export code. Nothing is returned unless the whole
/// payload is well formed, so callers can replace their snapshot atomically.
pub fn decode(code: &str) -> Result<Vec<TeachingUnit>, CodecError> {
    let bytes = STANDARD.decode(code.trim())?;
    let json = String::from_utf8(bytes)?;
    let value = expand_keys(serde_json::from_str(&json)?);
    validate(&value)?;
    Ok(serde_json::from_value(value)?)
}

pub fn validate(value: &Value) -> Result<(), CodecError> {
    let units = value
        .as_array()
        .ok_or_else(|| CodecError::Structure("expected a list of units".to_string()))?;

    for (index, unit) in units.iter().enumerate() {
        let non_empty = |field: &str| {
            unit.get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| !text.is_empty())
        };
        if !non_empty("id") || !non_empty("name") {
            return Err(CodecError::Structure(format!(
                "unit {index} is missing an id or a name"
            )));
        }
        if !unit.get("coefficient").is_some_and(Value::is_number) {
            return Err(CodecError::Structure(format!(
                "unit {index} has no numeric coefficient"
            )));
        }
    }

    Ok(())
}
