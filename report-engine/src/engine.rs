//! FILENAME: report-engine/src/engine.rs
//! PURPOSE: The `generate` entry point tying every stage together.
//! CONTEXT: One call builds a fresh `RenderContext`, fills it (data sources,
//! derived metrics, calculations), renders it, and drops it. Nothing carries
//! over between calls.

use log::{debug, info};

use report_core::{DistanceUnit, Params, RenderContext, StandardUnits, UnitConverter};
use report_render::{render_pdf, render_xlsx, PDF_MIME_TYPE, XLSX_MIME_TYPE};
use report_template::{DataSourceConfig, Template};

use crate::calculation::evaluate_all;
use crate::config::EngineConfig;
use crate::datasource::DataSourceResolver;
use crate::derived::{apply_fuel_economy, wants_fuel_economy};
use crate::error::ReportError;
use crate::repository::Repository;

pub const DISTANCE_UNIT_PARAM: &str = "distanceUnit";
pub const DISTANCE_LABEL_PARAM: &str = "distanceLabel";
pub const ECONOMY_LABEL_PARAM: &str = "economyLabel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Pdf,
}

impl OutputFormat {
    /// `pdf` selects the paginated document; anything else is a workbook.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("pdf") {
            OutputFormat::Pdf
        } else {
            OutputFormat::Xlsx
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => XLSX_MIME_TYPE,
            OutputFormat::Pdf => PDF_MIME_TYPE,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    pub content: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

pub struct ReportEngine<R: Repository> {
    repository: R,
    config: EngineConfig,
}

impl<R: Repository> ReportEngine<R> {
    pub fn new(repository: R) -> Self {
        Self::with_config(repository, EngineConfig::default())
    }

    pub fn with_config(repository: R, config: EngineConfig) -> Self {
        ReportEngine { repository, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses template text and generates it.
    pub fn generate_json(
        &self,
        template: &str,
        params: &Params,
        format: OutputFormat,
    ) -> Result<RenderedOutput, ReportError> {
        let template = Template::from_json_str(template)?;
        self.generate(&template, params, format)
    }

    pub fn generate(
        &self,
        template: &Template,
        params: &Params,
        format: OutputFormat,
    ) -> Result<RenderedOutput, ReportError> {
        let ctx = self.build_context(template, params)?;

        let title = template
            .title
            .as_deref()
            .or(template.name.as_deref())
            .unwrap_or("Report");

        let content = match format {
            OutputFormat::Xlsx => render_xlsx(template, &ctx, &self.config.grid)?,
            OutputFormat::Pdf => render_pdf(template, &ctx, &self.config.flow, title)?,
        };

        let filename = output_filename(template, &ctx, format);
        info!(
            "generated {:?} report '{}' ({} bytes)",
            format,
            filename,
            content.len()
        );

        Ok(RenderedOutput {
            content,
            mime_type: format.mime_type().to_string(),
            filename,
        })
    }

    /// Everything a renderer reads: params with unit labels, resolved sources
    /// with derived metrics applied, and calculation values.
    pub fn build_context(
        &self,
        template: &Template,
        params: &Params,
    ) -> Result<RenderContext, ReportError> {
        let units = StandardUnits::new(self.distance_unit(params));

        let mut ctx = RenderContext::new(params.clone());
        ctx.set_param(DISTANCE_UNIT_PARAM, units.unit().as_str());
        ctx.set_param(DISTANCE_LABEL_PARAM, units.distance_label());
        ctx.set_param(ECONOMY_LABEL_PARAM, units.economy_label());

        DataSourceResolver::new(&self.repository, template, params).resolve_all(&mut ctx)?;
        apply_derived_metrics(template, &mut ctx, &units);
        evaluate_all(template, &mut ctx);
        Ok(ctx)
    }

    fn distance_unit(&self, params: &Params) -> DistanceUnit {
        params
            .get(DISTANCE_UNIT_PARAM)
            .filter(|v| !v.is_null())
            .map(|v| DistanceUnit::from_param(&v.display_string()))
            .unwrap_or(self.config.default_distance_unit)
    }
}

fn apply_derived_metrics(template: &Template, ctx: &mut RenderContext, units: &dyn UnitConverter) {
    let mut series: Vec<&str> = template
        .data_sources
        .iter()
        .filter(|(name, config)| wants_fuel_economy(name, config))
        .map(|(name, _)| name.as_str())
        .collect();

    for source in template.legacy_sources() {
        if template.data_source(source).is_none()
            && wants_fuel_economy(source, &DataSourceConfig::for_entity(source))
        {
            series.push(source);
        }
    }

    for name in series {
        if let Some(rows) = ctx.data_mut(name) {
            apply_fuel_economy(rows, units);
            debug!("fuel economy computed for '{}' ({} rows)", name, rows.len());
        }
    }
}

/// Template filename (else name, else "report") with tokens resolved, unsafe
/// characters replaced, and the format's extension appended.
fn output_filename(template: &Template, ctx: &RenderContext, format: OutputFormat) -> String {
    let base = template
        .filename
        .as_deref()
        .or(template.name.as_deref())
        .unwrap_or("report");
    format!("{}.{}", sanitize_filename(&ctx.resolve_string(base)), format.extension())
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
