//! Untyped field values collected from an input surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ConfigError;

/// A single raw value as typed by the user.
///
/// Deserializes untagged, so a JSON document such as
/// `{"ctx-size": 8192, "mlock": true, "api-key": ["a", "b"]}` maps directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<RawValue>),
}

impl RawValue {
    /// Scalar rendered as text. Lists have no scalar form.
    pub(crate) fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::List(_) => None,
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for RawValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u16> for RawValue {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for RawValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Raw field name → value mapping fed into [`super::ServerConfig::build`].
///
/// Names are normalized on insert: case-insensitive, `_` and `-` are
/// interchangeable and leading dashes are dropped, so `ctx_size`,
/// `CTX-SIZE` and `--ctx-size` all address the same field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, RawValue>")]
pub struct RawFields {
    values: BTreeMap<String, RawValue>,
}

impl RawFields {
    /// Create an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a field name.
    #[must_use]
    pub fn normalize_name(name: &str) -> String {
        name.trim()
            .trim_start_matches('-')
            .to_ascii_lowercase()
            .replace('_', "-")
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<RawValue>) {
        self.values.insert(Self::normalize_name(name), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        self.values.remove(&Self::normalize_name(name))
    }

    /// Look up a field by (un-normalized) name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(&Self::normalize_name(name))
    }

    /// Iterate over normalized names and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a `name=value` assignment (value kept as text).
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (name, value) = assignment.split_once('=').ok_or_else(|| {
            ConfigError::invalid(assignment, "expected an assignment of the form name=value")
        })?;
        if Self::normalize_name(name).is_empty() {
            return Err(ConfigError::invalid(assignment, "field name is empty"));
        }
        self.insert(name, value.trim());
        Ok(())
    }

    /// Parse a JSON object of fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::invalid("<json>", e.to_string()))
    }

    /// Overlay `other` on top of `self`; fields in `other` win.
    pub fn merge(&mut self, other: Self) {
        self.values.extend(other.values);
    }
}

impl From<BTreeMap<String, RawValue>> for RawFields {
    fn from(map: BTreeMap<String, RawValue>) -> Self {
        let mut fields = Self::new();
        for (name, value) in map {
            fields.insert(&name, value);
        }
        fields
    }
}
