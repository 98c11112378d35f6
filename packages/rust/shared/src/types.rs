//! Core data model: the result set that gets encoded to XML and the
//! shape the decoder hands back.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};

/// Tag of the document root element.
pub const ROOT_TAG: &str = "ResearchResults";

/// Tag used for every entry of a sequence-valued category.
pub const ITEM_TAG: &str = "Item";

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A single value with no internal structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// No value; written as an empty element.
    Absent,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    /// Text form written into the document, `None` for [`Scalar::Absent`].
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for Scalar {
    /// Non-finite floats have no text form and become [`Scalar::Absent`].
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or(Self::Absent)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Absent)
    }
}

// ---------------------------------------------------------------------------
// Entries and categories
// ---------------------------------------------------------------------------

/// Ordered field name → scalar mapping for one entry.
pub type Fields = IndexMap<String, Scalar>;

/// One element of a sequence-valued category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Fields(Fields),
    Value(Scalar),
}

/// Value stored under a category name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryValue {
    Entries(Vec<Entry>),
    Scalar(Scalar),
}

// ---------------------------------------------------------------------------
// ResultSet
// ---------------------------------------------------------------------------

/// Ordered mapping from category name to its value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(IndexMap<String, CategoryValue>);

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a result set from a JSON object. Key order is kept.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ResearchError::validation(format!("unsupported result set shape: {e}")))
    }

    /// Set a category, replacing any previous value in place.
    pub fn insert(&mut self, category: impl Into<String>, value: CategoryValue) {
        self.0.insert(category.into(), value);
    }

    /// Set a scalar-valued category.
    pub fn insert_scalar(&mut self, category: impl Into<String>, value: impl Into<Scalar>) {
        self.insert(category, CategoryValue::Scalar(value.into()));
    }

    /// Append a field-map entry to a category, creating it if needed.
    ///
    /// A category that currently holds a scalar is replaced by a sequence.
    pub fn push_fields(&mut self, category: impl Into<String>, fields: Fields) {
        self.push_entry(category, Entry::Fields(fields));
    }

    /// Append an entry to a category, creating it if needed.
    pub fn push_entry(&mut self, category: impl Into<String>, entry: Entry) {
        let slot = self
            .0
            .entry(category.into())
            .or_insert_with(|| CategoryValue::Entries(Vec::new()));
        match slot {
            CategoryValue::Entries(entries) => entries.push(entry),
            CategoryValue::Scalar(_) => *slot = CategoryValue::Entries(vec![entry]),
        }
    }

    pub fn get(&self, category: &str) -> Option<&CategoryValue> {
        self.0.get(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CategoryValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, CategoryValue)> for ResultSet {
    fn from_iter<I: IntoIterator<Item = (String, CategoryValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Decoded shape
// ---------------------------------------------------------------------------

/// One decoded item: field tag → direct text (`None` when the element had none).
pub type FieldMap = IndexMap<String, Option<String>>;

/// Decoder output: category tag → items in document order.
pub type DecodedResults = IndexMap<String, Vec<FieldMap>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_text_rules() {
        assert_eq!(Scalar::from("Issue 1").to_text().as_deref(), Some("Issue 1"));
        assert_eq!(Scalar::from(42_i64).to_text().as_deref(), Some("42"));
        assert_eq!(Scalar::from(2.5).to_text().as_deref(), Some("2.5"));
        assert_eq!(Scalar::from(true).to_text().as_deref(), Some("true"));
        assert_eq!(Scalar::Absent.to_text(), None);
        assert_eq!(Scalar::from(f64::NAN), Scalar::Absent);
        assert_eq!(Scalar::from(None::<String>), Scalar::Absent);
    }

    #[test]
    fn result_set_from_json_keeps_order() {
        let json = r#"{
            "zeta": [{"b": "1", "a": 2}],
            "alpha": "plain",
            "mid": ["x", null, false]
        }"#;
        let set = ResultSet::from_json_str(json).expect("parse");
        let keys: Vec<_> = set.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);

        let Some(CategoryValue::Entries(entries)) = set.get("zeta") else {
            panic!("zeta should be a sequence");
        };
        let Entry::Fields(fields) = &entries[0] else {
            panic!("expected field map");
        };
        let field_names: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(field_names, ["b", "a"]);
        assert_eq!(fields["a"], Scalar::from(2_i64));

        assert_eq!(
            set.get("alpha"),
            Some(&CategoryValue::Scalar(Scalar::from("plain")))
        );
        let Some(CategoryValue::Entries(mid)) = set.get("mid") else {
            panic!("mid should be a sequence");
        };
        assert_eq!(mid[1], Entry::Value(Scalar::Absent));
        assert_eq!(mid[2], Entry::Value(Scalar::Bool(false)));
    }

    #[test]
    fn result_set_rejects_nested_field_values() {
        let json = r#"{"cat": [{"field": {"nested": true}}]}"#;
        let err = ResultSet::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("unsupported result set shape"));
    }

    #[test]
    fn push_fields_appends_in_order() {
        let mut set = ResultSet::new();
        set.insert_scalar("note", "replaced");
        set.push_fields("note", Fields::from([("a".to_string(), Scalar::from("1"))]));
        set.push_fields("note", Fields::from([("a".to_string(), Scalar::from("2"))]));

        let Some(CategoryValue::Entries(entries)) = set.get("note") else {
            panic!("note should be a sequence");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn results_fixture_parses() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/research-results.json")
            .expect("read fixture");
        let set = ResultSet::from_json_str(&fixture).expect("deserialize fixture");
        assert_eq!(set.len(), 2);
        assert!(set.get("misconducts").is_some());
        assert!(set.get("technical_specifications").is_some());
    }
}
