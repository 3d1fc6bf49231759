//! Ordered field container representing one row

use std::cmp::Ordering;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::value::{write_quoted, Value};

/// An ordered mapping of unique field names to values.
///
/// Field order is preserved for output, but is not significant for
/// equality: `{"a": 1, "b": 2}` equals `{"b": 2, "a": 1}`.
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Adds a field at the end of the document.
    ///
    /// If the field already exists its value is replaced in place and the
    /// field keeps its position.
    pub fn add(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style variant of [`Document::add`]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value.into());
        self
    }

    /// Returns the value of a top-level field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterates fields in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in document order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a document from a JSON object. Returns `None` if `json` is not
    /// an object.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        json.as_object().map(Self::from_json_map)
    }

    /// Parses a JSON object from text
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let json: serde_json::Value = serde_json::from_str(s)?;
        Self::from_json(&json).ok_or_else(|| {
            <serde_json::Error as serde::de::Error>::custom("expected a JSON object")
        })
    }

    pub(crate) fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut doc = Self::with_capacity(map.len());
        for (name, value) in map {
            doc.add(name.clone(), Value::from_json(value));
        }
        doc
    }

    /// Converts to a JSON object, keeping field order
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }

    fn sorted_fields(&self) -> Vec<&(String, Value)> {
        let mut sorted: Vec<_> = self.fields.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
    }
}

impl Ord for Document {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sorted_fields().cmp(&other.sorted_fields())
    }
}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Document {}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write_quoted(f, name)?;
            write!(f, ": {}", value)?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for Document {
    fn from_iter<T: IntoIterator<Item = (N, Value)>>(iter: T) -> Self {
        let mut doc = Document::new();
        for (name, value) in iter {
            doc.add(name, value);
        }
        doc
    }
}
