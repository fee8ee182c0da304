//! JSON attribute values <-> SQLite values
//!
//! Scalars map directly; booleans become 0/1; arrays and objects are stored
//! as JSON text. Reading never fails: blobs come back hex-encoded.

use nestsync_core::RecordId;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

pub fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

pub fn id_to_sql(id: &RecordId) -> SqlValue {
    match id {
        RecordId::Int(i) => SqlValue::Integer(*i),
        RecordId::Key(k) => SqlValue::Text(k.clone()),
    }
}

/// `None` for NULL or blank ids
pub fn id_from_sql(value: ValueRef<'_>) -> Option<RecordId> {
    match value {
        ValueRef::Integer(i) => Some(RecordId::Int(i)),
        ValueRef::Text(bytes) => RecordId::parse(&String::from_utf8_lossy(bytes)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(to_sql(&json!(null)), SqlValue::Null);
        assert_eq!(to_sql(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql(&json!(7)), SqlValue::Integer(7));
        assert_eq!(to_sql(&json!(1.5)), SqlValue::Real(1.5));
        assert_eq!(to_sql(&json!("x")), SqlValue::Text("x".to_string()));
    }

    #[test]
    fn test_structured_values_are_json_text() {
        assert_eq!(
            to_sql(&json!({"a": [1, 2]})),
            SqlValue::Text("{\"a\":[1,2]}".to_string())
        );
    }

    #[test]
    fn test_read_back() {
        assert_eq!(from_sql(ValueRef::Integer(3)), json!(3));
        assert_eq!(from_sql(ValueRef::Text(b"hi")), json!("hi"));
        assert_eq!(from_sql(ValueRef::Blob(&[0xab])), json!("ab"));
        assert_eq!(from_sql(ValueRef::Null), Value::Null);
    }

    #[test]
    fn test_ids() {
        assert_eq!(id_from_sql(ValueRef::Integer(4)), Some(RecordId::Int(4)));
        assert_eq!(id_from_sql(ValueRef::Text(b"12")), Some(RecordId::Int(12)));
        assert_eq!(
            id_from_sql(ValueRef::Text(b"abc")),
            Some(RecordId::Key("abc".to_string()))
        );
        assert_eq!(id_from_sql(ValueRef::Null), None);
    }
}
