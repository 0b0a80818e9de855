//! FILENAME: report-template/src/schema.rs
//! PURPOSE: Wire shapes of a report template, exactly as authors write them.
//! CONTEXT: These structs only exist to be deserialized. Every field is optional
//! and lists are kept as raw JSON so each element can be parsed on its own;
//! `load.rs` turns them into the canonical model in `model.rs`.

use serde::Deserialize;
use serde_json::{Map, Value as Json};

use report_core::col_to_index;

/// A column given either as letters ("C") or as a 0-based index (2).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ColumnRef {
    Index(u32),
    Letter(String),
}

impl ColumnRef {
    pub(crate) fn to_index(&self) -> Option<u32> {
        match self {
            ColumnRef::Index(i) => Some(*i),
            ColumnRef::Letter(s) => col_to_index(s),
        }
    }
}

/// `fill` may be a bare color string or `{ "color": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawFill {
    Color(String),
    Object {
        #[serde(default)]
        color: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawFont {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub size: Option<f64>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawStyle {
    pub font: Option<RawFont>,
    pub fill: Option<RawFill>,
    pub border: Option<String>,
    pub alignment: Option<String>,
    pub wrap_text: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawSort {
    pub field: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawDataSource {
    pub entity: Option<String>,
    pub merge: Option<Vec<String>>,
    /// newField -> oldField, in declaration order.
    pub fields: Option<Map<String, Json>>,
    pub sort: Option<RawSort>,
    pub filter: Option<Map<String, Json>>,
    pub single: Option<bool>,
    pub derived: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawCalculation {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawColumn {
    pub col: Option<ColumnRef>,
    pub field: Option<String>,
    pub key: Option<String>,
    pub label: Option<String>,
    pub width: Option<f64>,
    pub format: Option<String>,
    pub style: Option<String>,
    pub alignment: Option<String>,
    pub aggregate: Option<String>,
    pub derived: Option<String>,
}

/// A static cell, a totals cell, a detail-panel field or a summary item.
/// The section type decides which keys matter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawCell {
    pub col: Option<ColumnRef>,
    pub value: Option<Json>,
    pub merge: Option<String>,
    pub style: Option<String>,
    pub label: Option<String>,
    pub format: Option<String>,
    pub field: Option<String>,
    pub calculation: Option<String>,
    pub bold: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawOverflow {
    pub columns: Vec<Json>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawSection {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub start_row: Option<u32>,
    pub row: Option<u32>,
    pub cells: Option<Vec<Json>>,
    pub source: Option<String>,
    pub columns: Option<Vec<Json>>,
    pub max_rows: Option<usize>,
    pub overflow: Option<RawOverflow>,
    pub sort: Option<RawSort>,
    pub fields: Option<Vec<Json>>,
    pub label_col: Option<ColumnRef>,
    pub value_col: Option<ColumnRef>,
    pub style: Option<String>,
    pub value_style: Option<String>,
    pub text: Option<String>,
    pub title: Option<String>,
    pub font_size: Option<f64>,
    pub spacing: Option<f64>,
    pub show_total: Option<bool>,
    pub items: Option<Vec<Json>>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawLayout {
    pub name: Option<String>,
    pub sections: Option<Vec<Json>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawSheet {
    pub name: Option<String>,
    pub source: Option<String>,
    pub columns: Vec<Json>,
    pub sort: Option<RawSort>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawPageSetup {
    pub orientation: Option<String>,
}
