//! FILENAME: report-core/src/value.rs
//! PURPOSE: Scalar values and ordered rows produced by data sources.
//! CONTEXT: A `Row` is one record fetched from the repository (or produced by a
//! merge). Fields keep their insertion order, so a renamed field can sit ahead of
//! the original fields it was copied from. Values form a closed union; anything
//! the JSON side offers beyond scalars (arrays, objects) collapses to `Null`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field name used to tag rows with the data source they came from during a merge.
pub const SOURCE_FIELD: &str = "_source";

static NULL_VALUE: Value = Value::Null;

/// A single scalar held by a row field, a calculation or a request parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric reading of the value, if it has one.
    /// Text is parsed after trimming; booleans and null are not numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Coerces to a number the way aggregates want it: anything unparseable is 0.
    pub fn to_number_lossy(&self) -> f64 {
        match self {
            Value::Bool(true) => 1.0,
            other => other.as_number().unwrap_or(0.0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty() && s != "0",
        }
    }

    /// Text shown when the value is substituted into a string or written as plain text.
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_plain_number(*n),
            Value::Text(s) => s.clone(),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Null,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&json))
    }
}

fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integers print without a decimal point; fractions keep up to ten places.
fn format_plain_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{:.0}", n);
    }
    let formatted = format!("{:.10}", n);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

// ============================================================================
// ROW
// ============================================================================

/// One record: an ordered field -> value mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Row { fields: Vec::new() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(k, v);
        }
        row
    }

    /// Returns the field value, or None if the field is absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    /// Returns the field value, treating an absent field as `Null`.
    pub fn value(&self, field: &str) -> &Value {
        self.get(field).unwrap_or(&NULL_VALUE)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == field)
    }

    /// Sets a field. An existing field keeps its position; a new one is appended.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The data source a merged row came from.
    pub fn source(&self) -> Option<&str> {
        self.get(SOURCE_FIELD).and_then(Value::as_str)
    }

    /// Builds a row from a JSON object. Non-object input yields None.
    pub fn from_json(value: &serde_json::Value) -> Option<Row> {
        let object = value.as_object()?;
        Some(Row {
            fields: object
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect(),
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Row::from_json(&json).ok_or_else(|| serde::de::Error::custom("row must be a JSON object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_number_parses_numeric_text() {
        assert_eq!(Value::text(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(Value::text("10").as_number(), Some(10.0));
        assert_eq!(Value::text("abc").as_number(), None);
        assert_eq!(Value::text("").as_number(), None);
        assert_eq!(Value::text("NaN").as_number(), None);
        assert_eq!(Value::Bool(true).as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
    }

    #[test]
    fn test_lossy_coercion() {
        assert_eq!(Value::text("oops").to_number_lossy(), 0.0);
        assert_eq!(Value::Null.to_number_lossy(), 0.0);
        assert_eq!(Value::Bool(true).to_number_lossy(), 1.0);
        assert_eq!(Value::Number(4.25).to_number_lossy(), 4.25);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Number(75.0).display_string(), "75");
        assert_eq!(Value::Number(8.75).display_string(), "8.75");
        assert_eq!(Value::Number(-0.0).display_string(), "0");
        assert_eq!(Value::Null.display_string(), "");
        assert_eq!(Value::text("AB12 CDE").display_string(), "AB12 CDE");
    }

    #[test]
    fn test_row_insert_keeps_position() {
        let mut row = Row::from_pairs([("date", Value::text("2024-01-01")), ("cost", Value::from(10))]);
        row.insert("date", "2024-02-01");
        row.insert("litres", 40.0);

        let keys: Vec<&str> = row.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["date", "cost", "litres"]);
        assert_eq!(row.value("date"), &Value::text("2024-02-01"));
        assert_eq!(row.value("missing"), &Value::Null);
    }

    #[test]
    fn test_row_from_json() {
        let row = Row::from_json(&json!({"id": 1, "item": "Oil", "tags": [1, 2], "note": null})).unwrap();
        assert_eq!(row.value("id"), &Value::Number(1.0));
        assert_eq!(row.value("tags"), &Value::Null);
        assert!(row.contains("note"));
        assert!(Row::from_json(&json!([1, 2])).is_none());
    }
}
