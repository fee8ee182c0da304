//! Transient payload holder for one parent save
//!
//! Submitted child payloads live here between form binding and the after-save
//! hook. The hook clears the form once it has run, so nothing survives the save.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::NestedConfig;
use crate::errors::{Result, SyncError};
use crate::model::Payload;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmittedForm {
    payloads: BTreeMap<String, Payload>,
}

impl SubmittedForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind parsed request data: an object mapping `from` names to payloads
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if `value` is not an object or any payload
    /// fails to decode.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(SyncError::InvalidPayload {
                from: String::new(),
                reason: "nested form data must be an object keyed by attribute name".to_string(),
            });
        };

        let mut form = Self::new();
        for (from, raw) in map {
            // Absent nested fields are sent as null by some encoders.
            if raw.is_null() {
                continue;
            }
            let payload = Payload::from_json(&from, raw)?;
            form.set(from, payload);
        }
        Ok(form)
    }

    /// Hold `payload` under the transient attribute `from`
    pub fn set(&mut self, from: impl Into<String>, payload: Payload) {
        self.payloads.insert(from.into(), payload);
    }

    /// Raw payload currently held under `from`
    pub fn raw(&self, from: &str) -> Option<&Payload> {
        self.payloads.get(from)
    }

    /// Raw payload for a declared association
    pub fn raw_for(&self, config: &NestedConfig) -> Option<&Payload> {
        self.raw(config.from_attribute())
    }

    /// Drop everything still held
    pub fn clear(&mut self) {
        self.payloads.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &String> {
        self.payloads.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_binds_each_attribute() {
        let form = SubmittedForm::from_json(json!({
            "_tasks": [{"name": "a"}],
            "_notes": {"0": {"body": "n"}},
            "_skipped": null,
        }))
        .unwrap();

        assert_eq!(form.raw("_tasks").unwrap().len(), 1);
        assert_eq!(form.raw("_notes").unwrap().len(), 1);
        assert!(form.raw("_skipped").is_none());
    }

    #[test]
    fn test_clear_drops_every_payload() {
        let mut form = SubmittedForm::new();
        form.set("_tasks", Payload::default());
        form.set("rows", Payload::default());
        form.clear();
        assert!(form.is_empty());
        assert!(form.raw("_tasks").is_none());
    }

    #[test]
    fn test_raw_for_uses_from_attribute() {
        let mut form = SubmittedForm::new();
        form.set("rows", Payload::default());
        let config = NestedConfig::new("tasks").from("rows");
        assert!(form.raw_for(&config).is_some());
        assert!(form.raw_for(&NestedConfig::new("tasks")).is_none());
    }

    #[test]
    fn test_non_object_form_is_rejected() {
        assert!(SubmittedForm::from_json(json!([1])).is_err());
    }
}
