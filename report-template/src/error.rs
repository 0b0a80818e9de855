//! FILENAME: report-template/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template root must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}
