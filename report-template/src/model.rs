//! FILENAME: report-template/src/model.rs
//! PURPOSE: Canonical, fully-resolved template model.
//! CONTEXT: This is what the engine and both renderers see. Column letters are
//! already 0-based indices, merge ranges are parsed, style names are replaced by
//! the resolved `CellStyle`, and every default has been applied. Anything that
//! could not be understood at load time is either absent or `Section::Unknown`.

use std::collections::BTreeMap;

use report_core::{CellRange, CellStyle, Color, SortSpec, TextAlign, Value, ValueFormat};

// ============================================================================
// TEMPLATE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub name: Option<String>,
    pub title: Option<String>,
    pub filename: Option<String>,
    /// Declared data sources in declaration order.
    pub data_sources: Vec<(String, DataSourceConfig)>,
    /// Declared calculations in declaration order.
    pub calculations: Vec<(String, CalculationConfig)>,
    pub styles: BTreeMap<String, CellStyle>,
    /// 0-based column -> width in character units.
    pub column_widths: BTreeMap<u32, f64>,
    pub layout: Option<Layout>,
    pub sheets: Vec<LegacySheet>,
    pub pdf_layout: Option<Vec<Section>>,
    pub page_setup: PageSetup,
}

impl Template {
    pub fn data_source(&self, name: &str) -> Option<&DataSourceConfig> {
        self.data_sources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, config)| config)
    }

    pub fn calculation(&self, name: &str) -> Option<&CalculationConfig> {
        self.calculations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, config)| config)
    }

    pub fn style(&self, name: &str) -> Option<&CellStyle> {
        self.styles.get(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub name: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    Portrait,
    #[default]
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageSetup {
    pub orientation: Orientation,
}

/// The older template shape: one worksheet per entry, bound to one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacySheet {
    pub name: Option<String>,
    pub source: String,
    pub columns: Vec<ColumnDef>,
    pub sort: Option<SortSpec>,
}

// ============================================================================
// DATA SOURCES & CALCULATIONS
// ============================================================================

/// Per-row metrics a data source can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    FuelEconomy,
}

impl DerivedKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "fuelEconomy" | "fuel_economy" | "mpg" => Some(DerivedKind::FuelEconomy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSourceConfig {
    pub entity: Option<String>,
    /// Member sources, concatenated in this order.
    pub merge: Option<Vec<String>>,
    /// (newField, oldField) pairs in declaration order.
    pub fields: Vec<(String, String)>,
    pub sort: Option<SortSpec>,
    pub filter: BTreeMap<String, bool>,
    pub single: bool,
    pub derived: Option<DerivedKind>,
}

impl DataSourceConfig {
    /// Plain fetch of one entity type, used for undeclared merge members and sheet sources.
    pub fn for_entity(entity: impl Into<String>) -> Self {
        DataSourceConfig {
            entity: Some(entity.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationKind {
    Sum,
    /// Average of values that are present and positive.
    Avg,
    AvgPositive,
    /// Arithmetic mean over every row, missing values counting as 0.
    Mean,
    Count,
    Min,
    Max,
    First,
    Last,
    Unknown(String),
}

impl CalculationKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "sum" => CalculationKind::Sum,
            "avg" | "average" => CalculationKind::Avg,
            "avgPositive" | "avg_positive" => CalculationKind::AvgPositive,
            "mean" => CalculationKind::Mean,
            "count" => CalculationKind::Count,
            "min" => CalculationKind::Min,
            "max" => CalculationKind::Max,
            "first" => CalculationKind::First,
            "last" => CalculationKind::Last,
            other => CalculationKind::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationConfig {
    pub kind: CalculationKind,
    pub source: String,
    pub field: String,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        CalculationConfig {
            kind: CalculationKind::Sum,
            source: String::new(),
            field: "cost".to_string(),
        }
    }
}

// ============================================================================
// COLUMNS
// ============================================================================

/// Trailing-row aggregate of a grid column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Sum,
    Avg,
    Count,
}

impl AggregateKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "sum" => Some(AggregateKind::Sum),
            "avg" | "average" => Some(AggregateKind::Avg),
            "count" => Some(AggregateKind::Count),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDef {
    /// Target column. When absent the column's position in its list is used.
    pub col: Option<u32>,
    pub field: String,
    pub label: String,
    pub width: Option<f64>,
    pub format: ValueFormat,
    pub style: Option<CellStyle>,
    /// Explicit alignment. Absent means numeric right, text left.
    pub align: Option<TextAlign>,
    pub aggregate: Option<AggregateKind>,
}

impl ColumnDef {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        ColumnDef {
            field: field.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_col(mut self, col: u32) -> Self {
        self.col = Some(col);
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Last 1-based row a worksheet can hold.
pub const MAX_GRID_ROW: u32 = 1_048_576;

/// Row placement of a grid section, 1-based.
///
/// `start_row` pins the section and leaves the shared cursor where it was.
/// `row` only positions it; the cursor still moves past it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    pub start_row: Option<u32>,
    pub row: Option<u32>,
}

impl Placement {
    pub fn at_row(row: u32) -> Self {
        Placement {
            start_row: None,
            row: Some(row),
        }
    }

    pub fn pinned(start_row: u32) -> Self {
        Placement {
            start_row: Some(start_row),
            row: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.start_row.is_some()
    }

    /// Row the section starts on, given the current cursor.
    pub fn resolve(&self, cursor: u32) -> u32 {
        self.start_row.or(self.row).unwrap_or(cursor).max(1)
    }

    /// True when an explicit row lies past the last worksheet row.
    pub fn is_out_of_range(&self) -> bool {
        [self.start_row, self.row]
            .into_iter()
            .flatten()
            .any(|r| r > MAX_GRID_ROW)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticCell {
    pub col: u32,
    /// Text; `{{tokens}}` are resolved at render time.
    pub value: String,
    pub merge: Option<CellRange>,
    pub style: Option<CellStyle>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellsSection {
    pub placement: Placement,
    pub cells: Vec<StaticCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataGridSection {
    pub placement: Placement,
    pub source: String,
    pub columns: Vec<ColumnDef>,
    /// None means unlimited.
    pub max_rows: Option<usize>,
    /// Secondary column set that receives the records past `max_rows`.
    pub overflow: Option<Vec<ColumnDef>>,
    pub sort: Option<SortSpec>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TotalsCell {
    pub col: u32,
    pub value: Value,
    pub label: Option<String>,
    pub format: ValueFormat,
    pub style: Option<CellStyle>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TotalsSection {
    pub placement: Placement,
    pub cells: Vec<TotalsCell>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailField {
    pub label: String,
    pub field: String,
    /// When set, the value comes from this calculation instead of the source row.
    pub calculation: Option<String>,
    pub format: ValueFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailsSection {
    pub placement: Placement,
    pub source: String,
    pub fields: Vec<DetailField>,
    pub label_col: u32,
    pub value_col: u32,
    pub label_style: Option<CellStyle>,
    pub value_style: Option<CellStyle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleSection {
    pub text: String,
    pub font_size: f64,
    pub spacing: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSection {
    pub text: String,
    pub font_size: f64,
    pub spacing: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSection {
    pub title: Option<String>,
    pub source: String,
    pub columns: Vec<ColumnDef>,
    pub max_rows: Option<usize>,
    pub show_total: bool,
    pub spacing: f64,
    pub sort: Option<SortSpec>,
    /// Legacy sheets produce no table at all when their source has no rows.
    pub skip_when_empty: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryItem {
    pub label: String,
    pub value: Value,
    pub format: ValueFormat,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarySection {
    pub title: String,
    pub items: Vec<SummaryItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpacerSection {
    pub height: f64,
}

/// One layout unit. Grid-only and flow-only variants share the same list;
/// each renderer degrades the variants it has no native form for.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Cells(CellsSection),
    DataGrid(DataGridSection),
    Totals(TotalsSection),
    Details(DetailsSection),
    Title(TitleSection),
    Text(TextSection),
    Table(TableSection),
    Summary(SummarySection),
    Spacer(SpacerSection),
    /// Unrecognised `type`; renders nothing.
    Unknown(String),
}

impl Section {
    pub fn kind_name(&self) -> &str {
        match self {
            Section::Cells(_) => "cells",
            Section::DataGrid(_) => "dataGrid",
            Section::Totals(_) => "totals",
            Section::Details(_) => "vehicleDetails",
            Section::Title(_) => "title",
            Section::Text(_) => "text",
            Section::Table(_) => "table",
            Section::Summary(_) => "summary",
            Section::Spacer(_) => "spacer",
            Section::Unknown(kind) => kind,
        }
    }

    /// Grid placement, for the variants that have one.
    pub fn placement(&self) -> Placement {
        match self {
            Section::Cells(s) => s.placement,
            Section::DataGrid(s) => s.placement,
            Section::Totals(s) => s.placement,
            Section::Details(s) => s.placement,
            _ => Placement::default(),
        }
    }
}

/// One worksheet's worth of layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPage {
    /// Sheet name before token resolution.
    pub name: String,
    pub column_widths: BTreeMap<u32, f64>,
    pub sections: Vec<Section>,
}

/// Style applied to legacy header and total rows: bold on a solid fill.
pub fn banner_style(fill: Color) -> CellStyle {
    CellStyle::new().with_bold(true).with_fill(fill)
}
