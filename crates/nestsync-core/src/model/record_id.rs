use serde::Serialize;
use serde_json::Value;

use crate::errors::{Result, SyncError};

/// Normalized record identifier
///
/// Submitted ids arrive from forms as strings, from JSON as numbers, and from
/// databases as integers. They are normalized before any comparison:
/// - integers and strings holding an integer become `Int`
/// - any other non-blank string becomes an opaque `Key` (e.g. a UUID)
///
/// `"7"`, `" 7 "` and `7` therefore identify the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Key(String),
}

impl RecordId {
    /// Normalize a submitted id value
    ///
    /// Returns `Ok(None)` when the value is blank (`null`, empty or
    /// whitespace-only string), which callers treat as "no id".
    ///
    /// # Errors
    ///
    /// Returns `InvalidId` for booleans, arrays, objects and numbers that are
    /// not integral.
    pub fn from_value(value: &Value) -> Result<Option<RecordId>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Self::parse(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Some(RecordId::Int(i)));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Some(RecordId::Int(f as i64)))
                    }
                    _ => Err(SyncError::InvalidId {
                        reason: format!("{} is not an integral id", n),
                    }),
                }
            }
            other => Err(SyncError::InvalidId {
                reason: format!("unsupported id value {}", other),
            }),
        }
    }

    /// Normalize a textual id; blank text yields `None`
    pub fn parse(text: &str) -> Option<RecordId> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<i64>() {
            Ok(i) => Some(RecordId::Int(i)),
            Err(_) => Some(RecordId::Key(trimmed.to_string())),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RecordId::Int(i) => Some(*i),
            RecordId::Key(_) => None,
        }
    }

    /// JSON representation used when the id is written into an attribute
    /// (foreign keys)
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(i) => Value::from(*i),
            RecordId::Key(k) => Value::String(k.clone()),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Key(k) => f.write_str(k),
        }
    }
}
