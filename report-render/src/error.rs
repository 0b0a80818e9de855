//! FILENAME: report-render/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid worksheet name: {0}")]
    InvalidSheetName(String),

    #[error("No worksheet has been added yet")]
    NoSheet,

    #[error("PDF assembly error: {0}")]
    Pdf(String),
}
