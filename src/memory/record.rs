//! Normalization of memory store responses into `MemoryRecord`s
//!
//! Memory stores answer with loosely-typed JSON: a bare list, a list wrapped
//! under `results` or `data`, or nothing at all. Entries may be objects with
//! any of several text fields, or bare scalars. `normalize` classifies the
//! response shape first (`StoreResponse`) and then coerces each entry on a
//! best-effort basis. It never fails: missing fields become `None`.

use serde::Serialize;
use serde_json::{Map, Value};

/// Candidate text fields of a mapping entry, in precedence order.
pub const TEXT_FIELDS: &[&str] = &["memory", "text", "content", "value"];

/// Candidate metadata fields, in precedence order.
pub const METADATA_FIELDS: &[&str] = &["metadata", "meta"];

/// Candidate identifier fields, in precedence order.
pub const ID_FIELDS: &[&str] = &["id", "_id"];

/// Keys that wrap the entry list, in precedence order.
const WRAPPER_KEYS: &[&str] = &["results", "data"];

/// One stored memory item in a stable in-process shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRecord {
    /// Store identifier, when the entry carried one
    pub id: Option<String>,
    /// Memory text (never empty)
    pub text: String,
    /// Relevance score, when the entry carried a numeric one
    pub score: Option<f64>,
    /// Free-form metadata
    pub metadata: Option<Map<String, Value>>,
    /// Original entry, unmodified
    #[serde(skip)]
    pub raw: Value,
}

impl MemoryRecord {
    /// Build a record from a single response entry.
    pub fn from_entry(entry: &Value) -> Self {
        match entry {
            Value::Object(fields) => {
                let text = first_present(fields, TEXT_FIELDS)
                    .map(value_to_text)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| entry.to_string());
                let score = fields.get("score").and_then(Value::as_f64);
                let metadata = METADATA_FIELDS
                    .iter()
                    .filter_map(|key| fields.get(*key))
                    .find_map(|v| v.as_object().filter(|m| !m.is_empty()))
                    .cloned();
                let id = first_present(fields, ID_FIELDS).map(value_to_text);

                Self {
                    id,
                    text,
                    score,
                    metadata,
                    raw: entry.clone(),
                }
            }
            scalar => Self {
                id: None,
                text: Some(value_to_text(scalar))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| scalar.to_string()),
                score: None,
                metadata: None,
                raw: entry.clone(),
            },
        }
    }

    /// Look up a metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

/// Shape of a raw store response.
#[derive(Debug, PartialEq)]
pub enum StoreResponse<'a> {
    /// Null, a falsy scalar (`false`, `0`, `""`), or a mapping without a
    /// known wrapper key
    Empty,
    /// Entries wrapped under `results` or `data`
    Wrapped(&'a [Value]),
    /// A bare list of entries
    Bare(&'a [Value]),
    /// A single entry where a list was expected
    Single(&'a Value),
}

impl<'a> StoreResponse<'a> {
    /// Classify a raw response.
    pub fn classify(raw: &'a Value) -> Self {
        match raw {
            Value::Array(items) => Self::Bare(items),
            Value::Object(fields) => {
                match WRAPPER_KEYS
                    .iter()
                    .filter_map(|key| fields.get(*key))
                    .find(|v| is_present(v))
                {
                    Some(Value::Array(items)) => Self::Wrapped(items),
                    Some(other) => Self::Single(other),
                    None => Self::Empty,
                }
            }
            scalar if is_present(scalar) => Self::Single(scalar),
            _ => Self::Empty,
        }
    }

    /// The logical entries of this response.
    pub fn entries(&self) -> &'a [Value] {
        match self {
            Self::Empty => &[],
            Self::Wrapped(items) | Self::Bare(items) => *items,
            Self::Single(entry) => std::slice::from_ref(*entry),
        }
    }
}

/// Normalize any store response into an ordered list of records.
///
/// The output has one record per logical entry; nothing is dropped.
pub fn normalize(raw: &Value) -> Vec<MemoryRecord> {
    StoreResponse::classify(raw)
        .entries()
        .iter()
        .map(MemoryRecord::from_entry)
        .collect()
}

/// Whether a JSON value counts as present (non-null and non-empty).
pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Render a JSON value as plain text: strings verbatim, everything else as JSON.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|v| is_present(v))
}
