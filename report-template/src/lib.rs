//! FILENAME: report-template/src/lib.rs
//! Report Template Module
//!
//! Loads report templates from JSON into a canonical, backend-agnostic model.
//! Loading is lenient: fragments that cannot be understood are dropped with a
//! warning instead of failing the whole template.

mod error;
mod load;
mod model;
mod normalize;
mod schema;

pub use error::TemplateError;
pub use model::{
    banner_style, AggregateKind, CalculationConfig, CalculationKind, CellsSection, ColumnDef,
    DataGridSection, DataSourceConfig, DerivedKind, DetailField, DetailsSection, Layout,
    LayoutPage, LegacySheet, Orientation, MAX_GRID_ROW, PageSetup, Placement, Section, SpacerSection,
    StaticCell, SummaryItem, SummarySection, TableSection, Template, TextSection, TitleSection,
    TotalsCell, TotalsSection,
};
