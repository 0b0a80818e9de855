//! FILENAME: report-core/src/context.rs
//! PURPOSE: Per-request render state and `{{token}}` resolution.
//! CONTEXT: A `RenderContext` is built fresh for every report generation. It
//! holds the resolved data sources, the computed calculations and the request
//! parameters, and is passed by reference to every renderer. Nothing in it is
//! shared between requests.
//!
//! Resolution order for an expression: calculation name, then `source.field`
//! on the first row of a data source, then request parameter, then the
//! expression text itself. Null values never count as a match.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::value::{Row, Value};

/// Request parameters: name -> scalar.
pub type Params = BTreeMap<String, Value>;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("token pattern is a valid regex"));

#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    data: BTreeMap<String, Vec<Row>>,
    calculations: BTreeMap<String, Value>,
    params: Params,
}

impl RenderContext {
    pub fn new(params: Params) -> Self {
        RenderContext {
            data: BTreeMap::new(),
            calculations: BTreeMap::new(),
            params,
        }
    }

    // ========================================================================
    // DATA SOURCES
    // ========================================================================

    pub fn set_data(&mut self, name: impl Into<String>, rows: Vec<Row>) {
        self.data.insert(name.into(), rows);
    }

    /// Rows of a data source. Unknown sources are empty.
    pub fn data(&self, name: &str) -> &[Row] {
        self.data.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_data(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Mutable access for passes that rewrite a resolved source in place.
    pub fn data_mut(&mut self, name: &str) -> Option<&mut Vec<Row>> {
        self.data.get_mut(name)
    }

    pub fn data_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    // ========================================================================
    // CALCULATIONS & PARAMETERS
    // ========================================================================

    pub fn set_calculation(&mut self, name: impl Into<String>, value: Value) {
        self.calculations.insert(name.into(), value);
    }

    pub fn calculation(&self, name: &str) -> Option<&Value> {
        self.calculations.get(name)
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // ========================================================================
    // TOKEN RESOLUTION
    // ========================================================================

    /// Resolves one expression, with or without surrounding braces.
    /// Never fails: an unknown expression resolves to its own text.
    pub fn resolve(&self, expr: &str) -> Value {
        let key = expr.trim().trim_matches(|c| c == '{' || c == '}').trim();

        if let Some(value) = self.calculation(key).filter(|v| !v.is_null()) {
            return value.clone();
        }

        if let Some((source, field)) = key.split_once('.') {
            let first = self.data(source).first();
            if let Some(value) = first.and_then(|row| row.get(field)).filter(|v| !v.is_null()) {
                return value.clone();
            }
        }

        if let Some(value) = self.param(key).filter(|v| !v.is_null()) {
            return value.clone();
        }

        Value::Text(key.to_string())
    }

    /// Replaces every `{{...}}` in `text`. Text without tokens comes back unchanged.
    pub fn resolve_string(&self, text: &str) -> String {
        if !text.contains("{{") {
            return text.to_string();
        }
        TOKEN_RE
            .replace_all(text, |caps: &Captures| self.resolve(&caps[1]).display_string())
            .into_owned()
    }

    /// True when the whole string is a single token such as `{{total}}`.
    pub fn is_token(text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.starts_with("{{") && trimmed.ends_with("}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> RenderContext {
        let mut params = Params::new();
        params.insert("distanceLabel".to_string(), Value::text("Miles"));
        let mut ctx = RenderContext::new(params);
        ctx.set_calculation("totalCost", Value::Number(75.0));
        ctx.set_calculation("nothing", Value::Null);
        ctx.set_data(
            "vehicle",
            vec![
                Row::from_pairs([("registration", "AB12 CDE"), ("name", "Van")]),
                Row::from_pairs([("registration", "ZZ99 ZZZ"), ("name", "Car")]),
            ],
        );
        ctx
    }

    #[test]
    fn test_resolve_order() {
        let ctx = context();
        assert_eq!(ctx.resolve("{{ totalCost }}"), Value::Number(75.0));
        assert_eq!(ctx.resolve("vehicle.registration"), Value::text("AB12 CDE"));
        assert_eq!(ctx.resolve("{{distanceLabel}}"), Value::text("Miles"));
        assert_eq!(ctx.resolve("{{vehicle.colour}}"), Value::text("vehicle.colour"));
        assert_eq!(ctx.resolve("nothing"), Value::text("nothing"));
    }

    #[test]
    fn test_resolve_string_without_tokens_is_unchanged() {
        let ctx = context();
        assert_eq!(ctx.resolve_string("no tokens here"), "no tokens here");
    }

    #[test]
    fn test_resolve_string_substitutes_every_token() {
        let ctx = context();
        assert_eq!(
            ctx.resolve_string("{{vehicle.name}} costs {{totalCost}} ({{distanceLabel}})"),
            "Van costs 75 (Miles)"
        );
        assert_eq!(ctx.resolve_string("{{unknown}}!"), "unknown!");
    }

    #[test]
    fn test_missing_source_is_empty() {
        let ctx = context();
        assert!(ctx.data("fuelRecords").is_empty());
        assert!(!ctx.has_data("fuelRecords"));
        assert!(RenderContext::is_token(" {{total}} "));
        assert!(!RenderContext::is_token("Total"));
    }
}
