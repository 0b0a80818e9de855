//! FILENAME: report-engine/src/lib.rs
//! Report Engine Module
//!
//! Generates a report from a template and a request: data sources are read
//! through a `Repository`, fuel-economy metrics and calculations are computed,
//! and the populated context is handed to the workbook or PDF renderer.
//!
//! ```ignore
//! let engine = ReportEngine::new(repository);
//! let output = engine.generate_json(template_json, &params, OutputFormat::from_name("pdf"))?;
//! std::fs::write(&output.filename, &output.content)?;
//! ```

pub mod calculation;
mod config;
pub mod datasource;
pub mod derived;
mod engine;
mod error;
pub mod repository;

pub use config::EngineConfig;
pub use engine::{
    sanitize_filename, OutputFormat, RenderedOutput, ReportEngine, DISTANCE_LABEL_PARAM,
    DISTANCE_UNIT_PARAM, ECONOMY_LABEL_PARAM,
};
pub use error::{ReportError, RepositoryError};
pub use repository::{EntityKind, EntityQuery, InMemoryRepository, Repository};

pub use report_core::{Params, Row, Value};
pub use report_template::Template;
