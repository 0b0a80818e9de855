//! FILENAME: report-core/src/lib.rs
//! PURPOSE: Shared model for the report engine.
//! CONTEXT: Values and rows, A1 addressing, number formatting, resolved styles,
//! unit conversion and the per-request render context. Every other crate in the
//! workspace builds on these types.

pub mod context;
pub mod coord;
pub mod number_format;
pub mod sort;
pub mod style;
pub mod units;
pub mod value;

pub use context::{Params, RenderContext};
pub use coord::{coord_to_a1, col_to_index, index_to_col, parse_a1, parse_range, CellCoord, CellRange};
pub use number_format::{
    currency_format_code, format_currency, format_integer, format_value, round_to, ValueFormat,
    NUMBER_FORMAT_CODE,
};
pub use sort::{compare_values, sort_rows, SortOrder, SortSpec};
pub use style::{BorderWeight, CellStyle, Color, TextAlign};
pub use units::{DistanceUnit, StandardUnits, UnitConverter};
pub use value::{Row, Value, SOURCE_FIELD};
