//! Request payloads.

use crate::TypedValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// A mapping of field names to typed values or nested groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, PayloadValue>);

/// One payload entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Value(TypedValue),
    Group(Payload),
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PayloadValue> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PayloadValue)> {
        self.0.iter()
    }

    /// A top-level scalar rendered in wire form, ignoring empty values.
    pub fn scalar(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            PayloadValue::Value(v) => Some(v.to_string()).filter(|s| !s.is_empty()),
            PayloadValue::Group(_) => None,
        }
    }

    /// Flatten into form fields, nesting groups with bracket notation
    /// (`settings[color]=red`).
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            flatten_into(&mut pairs, key.clone(), value);
        }
        pairs
    }
}

fn flatten_into(pairs: &mut Vec<(String, String)>, name: String, value: &PayloadValue) {
    match value {
        PayloadValue::Value(v) => pairs.push((name, v.to_string())),
        PayloadValue::Group(group) => {
            for (key, nested) in &group.0 {
                flatten_into(pairs, format!("{name}[{key}]"), nested);
            }
        }
    }
}

impl FromIterator<(String, PayloadValue)> for Payload {
    fn from_iter<T: IntoIterator<Item = (String, PayloadValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<TypedValue> for PayloadValue {
    fn from(value: TypedValue) -> Self {
        Self::Value(value)
    }
}

impl From<Payload> for PayloadValue {
    fn from(group: Payload) -> Self {
        Self::Group(group)
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Value(TypedValue::Str(value.to_string()))
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::Value(TypedValue::Str(value))
    }
}
