//! FILENAME: report-core/src/sort.rs
//! PURPOSE: Stable, numeric-aware row sorting.
//! CONTEXT: Used when resolving data sources and again by legacy sheets that
//! declare their own sort. Each value is classed once as empty, numeric or
//! text, and the classes sort in that order. Numbers compare numerically and
//! text compares byte-wise on its display form. Missing fields are empty.

use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};

use crate::value::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive; anything other than `desc` is ascending.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            field: "date".to_string(),
            order: SortOrder::Asc,
        }
    }
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        SortSpec {
            field: field.into(),
            order,
        }
    }
}

/// Sort key of one field value. Ordering is total: class rank first, then
/// the value within its class.
#[derive(Debug, Clone)]
enum SortKey {
    Empty,
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(value: &Value) -> Self {
        if let Some(n) = value.as_number() {
            return SortKey::Number(n);
        }
        let text = value.display_string();
        if text.is_empty() {
            SortKey::Empty
        } else {
            SortKey::Text(text)
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Empty => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
            (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Compares two field values the way report sorting does.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    SortKey::of(a).cmp(&SortKey::of(b))
}

/// Sorts rows in place. Keys are computed once per row and the sort is
/// stable, so ties keep their incoming order.
pub fn sort_rows(rows: &mut [Row], spec: &SortSpec) {
    match spec.order {
        SortOrder::Asc => rows.sort_by_cached_key(|row| SortKey::of(row.value(&spec.field))),
        SortOrder::Desc => {
            rows.sort_by_cached_key(|row| Reverse(SortKey::of(row.value(&spec.field))))
        }
    }
}
