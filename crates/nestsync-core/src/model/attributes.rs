use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute map for one record
///
/// Keys are column names. Values are kept as JSON so that form input,
/// in-memory rows and SQLite rows share one representation. A `BTreeMap`
/// keeps column order stable for generated SQL and rendered output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Attributes {
    data: BTreeMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Overwrite this map's values with every entry of `other`
    pub fn merge(&mut self, other: &Attributes) {
        for (key, value) in &other.data {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// An attribute set is blank when it carries no meaningful value: no keys
    /// at all, or only blank values.
    pub fn is_blank(&self) -> bool {
        self.data.values().all(is_blank_value)
    }

    /// Whether the named attribute is missing or blank
    pub fn is_blank_at(&self, key: &str) -> bool {
        self.data.get(key).map_or(true, is_blank_value)
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.data.into_iter().collect())
    }
}

/// `null`, whitespace-only strings, and empty arrays/objects are blank.
/// Numbers and booleans (including `0` and `false`) never are.
pub fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

impl From<BTreeMap<String, Value>> for Attributes {
    fn from(data: BTreeMap<String, Value>) -> Self {
        Self { data }
    }
}

impl From<serde_json::Map<String, Value>> for Attributes {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            data: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
