//! Normalization of function-call argument payloads.
//!
//! Models are inconsistent about how they fill the `arguments` slot. We have
//! seen three shapes for the same logical content:
//!
//! ```text
//! {"location": "New York, NY"}                 object
//! "{\"location\": \"New York, NY\"}"           JSON string holding an object
//! "{\"arguments\": [\"speaks Spanish\"]}"      JSON string holding a fact list
//! ```
//!
//! [`parse_arguments`] accepts all of them and yields one [`ToolArguments`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

/// Key under which fact lists are wrapped.
pub const FACT_LIST_KEY: &str = "arguments";

/// The payload could not be decoded in any supported shape.
#[derive(Debug, Clone, Error)]
#[error("could not decode tool arguments ({reason}): {raw}")]
pub struct ArgumentParseError {
    /// Payload as received.
    pub raw: String,
    pub reason: String,
}

impl ArgumentParseError {
    fn new(raw: &Value, reason: impl Into<String>) -> Self {
        let raw = match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            raw,
            reason: reason.into(),
        }
    }
}

/// The shapes an arguments payload arrives in.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentShape {
    /// A JSON object directly in the arguments slot.
    Object(Map<String, Value>),
    /// A JSON string whose contents decode to an object.
    EncodedObject(Map<String, Value>),
    /// A JSON string holding `{"arguments": [..]}` with only strings inside.
    EncodedList(Vec<String>),
}

impl ArgumentShape {
    /// Work out which shape `raw` has.
    ///
    /// A missing payload (`null`) is treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentParseError` if `raw` is neither an object nor a
    /// string that decodes to one.
    pub fn detect(raw: &Value) -> Result<Self, ArgumentParseError> {
        match raw {
            Value::Object(map) => Ok(Self::Object(map.clone())),
            Value::Null => Ok(Self::Object(Map::new())),
            Value::String(encoded) => {
                let decoded: Value = serde_json::from_str(encoded)
                    .map_err(|e| ArgumentParseError::new(raw, e.to_string()))?;
                match decoded {
                    Value::Object(map) => Ok(fact_list(&map)
                        .map_or_else(|| Self::EncodedObject(map), Self::EncodedList)),
                    other => Err(ArgumentParseError::new(
                        raw,
                        format!("expected an object, found {}", json_kind(&other)),
                    )),
                }
            }
            other => Err(ArgumentParseError::new(
                raw,
                format!("expected an object or string, found {}", json_kind(other)),
            )),
        }
    }

    /// Flatten into the common map form.
    #[must_use]
    pub fn into_arguments(self) -> ToolArguments {
        match self {
            Self::Object(map) | Self::EncodedObject(map) => ToolArguments::from_map(map),
            Self::EncodedList(items) => {
                let mut values = BTreeMap::new();
                values.insert(FACT_LIST_KEY.to_string(), ArgumentValue::List(items));
                ToolArguments { values }
            }
        }
    }
}

/// Decode an arguments payload in whatever shape it arrived.
///
/// # Errors
///
/// Returns `ArgumentParseError` carrying the raw payload if no shape fits.
pub fn parse_arguments(raw: &Value) -> Result<ToolArguments, ArgumentParseError> {
    ArgumentShape::detect(raw).map(ArgumentShape::into_arguments)
}

fn fact_list(map: &Map<String, Value>) -> Option<Vec<String>> {
    if map.len() != 1 {
        return None;
    }
    let Value::Array(items) = map.get(FACT_LIST_KEY)? else {
        return None;
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One normalized argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// An array made only of strings.
    List(Vec<String>),
    /// Anything else (nested objects, mixed arrays), kept as JSON.
    Structured(Value),
}

impl From<Value> for ArgumentValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Self::Structured(Value::Number(n)), Self::Number),
            Value::String(s) => Self::Text(s),
            Value::Array(items) if items.iter().all(Value::is_string) => Self::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Self::Structured(other),
        }
    }
}

impl From<&ArgumentValue> for Value {
    fn from(value: &ArgumentValue) -> Self {
        match value {
            ArgumentValue::Null => Self::Null,
            ArgumentValue::Bool(b) => Self::Bool(*b),
            ArgumentValue::Number(n) => number_value(*n),
            ArgumentValue::Text(s) => Self::String(s.clone()),
            ArgumentValue::List(items) => Self::from(items.clone()),
            ArgumentValue::Structured(v) => v.clone(),
        }
    }
}

/// Integral values stay integral so bound parameters compare as integers.
#[allow(clippy::cast_possible_truncation)]
fn number_value(n: f64) -> Value {
    if n.fract().abs() < f64::EPSILON && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Normalized arguments of one invocation.
///
/// Accessors never fail on a missing key: text reads as `""`, numbers fall
/// back to the caller's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: BTreeMap<String, ArgumentValue>,
}

impl ToolArguments {
    fn from_map(map: Map<String, Value>) -> Self {
        Self {
            values: map
                .into_iter()
                .map(|(key, value)| (key, ArgumentValue::from(value)))
                .collect(),
        }
    }

    /// Raw value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ArgumentValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Text value of a key, trimmed. Numbers and booleans are rendered.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(ArgumentValue::Text(s)) => s.trim().to_string(),
            Some(ArgumentValue::Number(n)) => n.to_string(),
            Some(ArgumentValue::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Text value of a key, or `None` when missing or blank.
    #[must_use]
    pub fn optional_text(&self, key: &str) -> Option<String> {
        Some(self.text(key)).filter(|s| !s.is_empty())
    }

    /// Numeric value of a key.
    ///
    /// JSON numbers are taken as is. Strings such as `"35"`, `" 35.5 "` or
    /// `"$40"` are parsed. Everything else, including non-finite values,
    /// yields `default`.
    #[must_use]
    pub fn number(&self, key: &str, default: f64) -> f64 {
        let parsed = match self.values.get(key) {
            Some(ArgumentValue::Number(n)) => Some(*n),
            Some(ArgumentValue::Text(s)) => parse_amount(s),
            _ => None,
        };
        parsed.filter(|n| n.is_finite()).unwrap_or(default)
    }

    /// List value of a key. A single non-blank string counts as a list of one.
    #[must_use]
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            Some(ArgumentValue::List(items)) => items.clone(),
            Some(ArgumentValue::Text(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// The fact list carried under [`FACT_LIST_KEY`].
    #[must_use]
    pub fn fact_list(&self) -> Vec<String> {
        self.string_list(FACT_LIST_KEY)
    }

    /// Raw JSON value of a key, `null` when missing.
    #[must_use]
    pub fn value(&self, key: &str) -> Value {
        self.values.get(key).map_or(Value::Null, Value::from)
    }

    /// Nested objects under a key, each normalized on its own.
    ///
    /// An array keeps only its object items; a single object counts as a list
    /// of one.
    #[must_use]
    pub fn records(&self, key: &str) -> Vec<Self> {
        match self.values.get(key) {
            Some(ArgumentValue::Structured(Value::Array(items))) => items
                .iter()
                .filter_map(Value::as_object)
                .map(|map| Self::from_map(map.clone()))
                .collect(),
            Some(ArgumentValue::Structured(Value::Object(map))) => {
                vec![Self::from_map(map.clone())]
            }
            _ => Vec::new(),
        }
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    trimmed.parse().ok()
}
