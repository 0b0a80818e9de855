//! FILENAME: report-render/src/grid/mod.rs
//! PURPOSE: Cell-addressed output: the backend capability and the renderer.
//! CONTEXT: `GridRenderer` walks layout sections and talks to a `GridBackend`.
//! Backend coordinates are 0-based (row, col); the renderer's row cursor is
//! 1-based like the row numbers template authors write.

mod renderer;
mod xlsx;

pub use renderer::GridRenderer;
pub use xlsx::XlsxGridBackend;

use report_core::{CellRange, CellStyle, Value};

use crate::error::RenderError;

/// Minimal primitives a sheet-like document has to offer.
pub trait GridBackend {
    /// Starts a new worksheet; later calls write into it.
    fn add_sheet(&mut self, name: &str) -> Result<(), RenderError>;

    fn set_column_width(&mut self, col: u32, width: f64) -> Result<(), RenderError>;

    /// Writes a scalar. A default `style` keeps whatever style the cell already has.
    fn write_cell(
        &mut self,
        row: u32,
        col: u32,
        value: &Value,
        style: &CellStyle,
    ) -> Result<(), RenderError>;

    /// Layers `style` over the cell's current style, creating a blank cell if needed.
    fn apply_style(&mut self, row: u32, col: u32, style: &CellStyle) -> Result<(), RenderError>;

    fn merge_range(&mut self, range: CellRange) -> Result<(), RenderError>;
}
