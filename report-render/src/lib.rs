//! FILENAME: report-render/src/lib.rs
//! Report Render Module
//!
//! Turns a loaded template plus a populated `RenderContext` into document
//! bytes: a workbook through the grid renderer, or a PDF through the flow
//! renderer.

pub mod config;
mod error;
pub mod flow;
pub mod grid;
pub mod recording;

pub use config::{FlowConfig, GridConfig};
pub use error::RenderError;
pub use flow::{FlowBackend, FlowRenderer, PdfFlowBackend};
pub use grid::{GridBackend, GridRenderer, XlsxGridBackend};

use report_core::RenderContext;
use report_template::Template;

pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_MIME_TYPE: &str = "application/pdf";

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Renders every grid page of the template into an .xlsx workbook.
pub fn render_xlsx(
    template: &Template,
    ctx: &RenderContext,
    config: &GridConfig,
) -> Result<Vec<u8>, RenderError> {
    let pages = template.grid_pages(config.header_fill_color());
    let mut backend = XlsxGridBackend::new(config.clone());
    GridRenderer::new(&mut backend, ctx, config).render_pages(&pages)?;
    backend.into_bytes()
}

/// Renders the template's flow sections into a PDF under `title`.
pub fn render_pdf(
    template: &Template,
    ctx: &RenderContext,
    config: &FlowConfig,
    title: &str,
) -> Result<Vec<u8>, RenderError> {
    let sections = template.flow_sections();
    let mut backend = PdfFlowBackend::new(template.page_setup.orientation);
    backend.set_title(ctx.resolve_string(title));
    {
        let mut renderer = FlowRenderer::new(&mut backend, ctx, config);
        renderer.begin(title)?;
        renderer.render_sections(&sections)?;
    }
    backend.into_bytes()
}
