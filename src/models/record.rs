//! The normalized output of one provider lookup.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names produced by the provider adapters
pub mod fields {
    pub const DOI: &str = "doi";
    pub const PMCID: &str = "pmcid";
    pub const JOURNAL: &str = "journal";
    pub const JOURNAL_TITLE: &str = "journal_title";
    pub const AUTHORS: &str = "authors";
    pub const PDF_URL: &str = "pdf_url";
    pub const URL: &str = "url";
    pub const LINKOUT: &str = "linkout";
    pub const OPEN_ACCESS: &str = "open_access";
    pub const KEYWORDS: &str = "keywords";
    pub const AFFILIATIONS: &str = "affiliations";
    pub const HANDLE: &str = "handle";
    pub const TITLE: &str = "title";
}

/// A publication author, optionally with an affiliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
        }
    }

    pub fn with_affiliation(name: impl Into<String>, affiliation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: Some(affiliation.into()),
        }
    }
}

/// Ordered field-name to value mapping returned by a lookup
///
/// A field is only present when the provider supplied it; an absent field is
/// not the same as an empty one. Field order follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialRecord {
    fields: Map<String, Value>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object; any other JSON value yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Set a field when the value is present
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Builder-style `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set the author list
    pub fn set_authors(&mut self, authors: Vec<Author>) {
        let authors = authors
            .into_iter()
            .map(|a| serde_json::to_value(a).unwrap_or(Value::Null))
            .collect::<Vec<_>>();
        self.fields.insert(fields::AUTHORS.to_string(), Value::Array(authors));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a field as a string slice
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a field as a list of strings, skipping non-string entries
    pub fn get_str_list(&self, key: &str) -> Option<Vec<&str>> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    /// Decode the `authors` field as `{name, affiliation?}` entries
    pub fn authors(&self) -> Option<Vec<Author>> {
        self.fields
            .get(fields::AUTHORS)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for PartialRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insertion_order_preserved() {
        let record = PartialRecord::new()
            .with(fields::URL, "https://example.org")
            .with(fields::DOI, "10.1/x")
            .with(fields::OPEN_ACCESS, true);

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["url", "doi", "open_access"]);
    }

    #[test]
    fn test_absent_is_not_empty() {
        let mut record = PartialRecord::new();
        record.insert_opt(fields::DOI, None::<String>);
        record.insert(fields::KEYWORDS, Vec::<String>::new());

        assert!(!record.contains(fields::DOI));
        assert_eq!(record.get_str_list(fields::KEYWORDS), Some(vec![]));
    }

    #[test]
    fn test_authors_round_trip() {
        let mut record = PartialRecord::new();
        record.set_authors(vec![
            Author::new("Jane Doe"),
            Author::with_affiliation("John Roe", "MIT"),
        ]);

        assert_eq!(
            record.get(fields::AUTHORS),
            Some(&json!([{"name": "Jane Doe"}, {"name": "John Roe", "affiliation": "MIT"}]))
        );
        let authors = record.authors().unwrap();
        assert_eq!(authors[1].affiliation.as_deref(), Some("MIT"));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(PartialRecord::from_json(json!([1, 2])).is_none());
        let record = PartialRecord::from_json(json!({"title": "T", "year": 2017})).unwrap();
        assert_eq!(record.get_str("title"), Some("T"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let record = PartialRecord::new().with(fields::PMCID, "PMC123");
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"pmcid":"PMC123"}"#);
    }
}
