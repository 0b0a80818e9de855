//! FILENAME: report-engine/src/error.rs

use thiserror::Error;

use report_render::RenderError;
use report_template::TemplateError;

/// Failure of the record store itself. An unknown entity is not an error.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Query for '{entity}' failed: {message}")]
    Query { entity: String, message: String },

    #[error("Invalid fixture data: {0}")]
    InvalidData(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
