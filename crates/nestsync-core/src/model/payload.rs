use serde::Serialize;
use serde_json::Value;

use super::attributes::Attributes;
use crate::errors::{Result, SyncError};

/// Ordered sequence of child attribute sets submitted for one association
///
/// One entry per child the caller wants to exist after the save. Entry order
/// is significant: it becomes the `position` of each child when the child
/// entity has such a column.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Payload {
    entries: Vec<Attributes>,
}

impl Payload {
    pub fn new(entries: Vec<Attributes>) -> Self {
        Self { entries }
    }

    /// Decode a payload from parsed request data
    ///
    /// Accepts either a JSON array of objects, or a form-style object whose
    /// keys are decimal indices (`{"0": {...}, "1": {...}}`), which is what
    /// indexed form fields decode to. Indexed entries are ordered numerically.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the value is neither shape, if an index
    /// key is not a non-negative integer, or if an entry is not an object.
    pub fn from_json(from: &str, value: Value) -> Result<Self> {
        let invalid = |reason: String| SyncError::InvalidPayload {
            from: from.to_string(),
            reason,
        };

        let raw_entries: Vec<Value> = match value {
            Value::Array(items) => items,
            Value::Object(map) => {
                let mut indexed = Vec::with_capacity(map.len());
                for (key, entry) in map {
                    let index: u64 = key
                        .trim()
                        .parse()
                        .map_err(|_| invalid(format!("key '{}' is not an index", key)))?;
                    indexed.push((index, entry));
                }
                indexed.sort_by_key(|(index, _)| *index);
                indexed.into_iter().map(|(_, entry)| entry).collect()
            }
            other => {
                return Err(invalid(format!(
                    "expected a list of attribute maps, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut entries = Vec::with_capacity(raw_entries.len());
        for (index, entry) in raw_entries.into_iter().enumerate() {
            match entry {
                Value::Object(map) => entries.push(Attributes::from(map)),
                // A null slot is an empty form row.
                Value::Null => entries.push(Attributes::new()),
                other => {
                    return Err(invalid(format!(
                        "entry {} is {}, expected an attribute map",
                        index,
                        json_kind(&other)
                    )))
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Attributes] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attributes> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries the reconciler will actually act on
    pub fn non_blank_len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_blank()).count()
    }
}

impl From<Vec<Attributes>> for Payload {
    fn from(entries: Vec<Attributes>) -> Self {
        Self { entries }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
