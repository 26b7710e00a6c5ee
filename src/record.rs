//! Extraction results

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::value::Value;

/// Field values in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace; a replaced value keeps its position
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(n, v)| (n.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Raw and final values of one extraction pass
///
/// `raw` holds each field straight out of its pipeline, `final` holds
/// it after its override routine (identical to `raw` without one).
/// Both have exactly one entry per mapped field; `final` may also hold
/// fields added by the post-parse hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    #[serde(skip)]
    names: Vec<String>,
    raw: Fields,
    #[serde(rename = "final")]
    values: Fields,
}

impl Record {
    pub(crate) fn new(names: Vec<String>, raw: Fields, values: Fields) -> Self {
        Self { names, raw, values }
    }

    pub fn raw(&self) -> &Fields {
        &self.raw
    }

    /// Final values
    pub fn values(&self) -> &Fields {
        &self.values
    }

    /// Final value of one field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Mapped field names, in mapping order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn into_values(self) -> Fields {
        self.values
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "raw": self.raw.to_json(),
            "final": self.values.to_json(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_keep_order_on_replace() {
        let mut fields = Fields::new();
        fields.insert("b", Value::from("1"));
        fields.insert("a", Value::from("2"));
        assert_eq!(fields.insert("b", Value::from("3")), Some(Value::from("1")));

        let names: Vec<&str> = fields.names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(fields.get("b"), Some(&Value::from("3")));
    }

    #[test]
    fn test_record_json() {
        let mut raw = Fields::new();
        raw.insert("name", Value::from(" Bruno "));
        let mut values = Fields::new();
        values.insert("name", Value::from("Bruno"));
        values.insert("url", Value::from("http://x.org"));

        let record = Record::new(vec!["name".to_string()], raw, values);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, record.to_json());
        assert_eq!(json["raw"]["name"], " Bruno ");
        assert_eq!(json["final"]["url"], "http://x.org");

        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["name"]);
    }
}
