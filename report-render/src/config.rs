//! FILENAME: report-render/src/config.rs
//! PURPOSE: Backend settings with the defaults reports have always used.
//! CONTEXT: Loaded as part of the engine configuration; every field has a
//! default so a partial config file is fine.

use serde::{Deserialize, Serialize};

use report_core::Color;

const DEFAULT_HEADER_FILL: Color = Color::new(178, 178, 178);

fn color_or_default(hex: &str) -> Color {
    Color::from_hex(hex).unwrap_or(DEFAULT_HEADER_FILL)
}

/// Spreadsheet output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    /// Workbook-wide font.
    pub font_name: String,
    pub font_size: f64,
    pub currency_symbol: String,
    /// Fill for legacy header rows and aggregate total rows, as hex.
    pub header_fill: String,
    /// Worksheet names are cut to this many characters.
    pub max_sheet_name_len: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            font_name: "Liberation Serif".to_string(),
            font_size: 9.0,
            currency_symbol: "£".to_string(),
            header_fill: "#B2B2B2".to_string(),
            max_sheet_name_len: 31,
        }
    }
}

impl GridConfig {
    pub fn header_fill_color(&self) -> Color {
        color_or_default(&self.header_fill)
    }
}

/// Paginated output settings. Lengths are millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowConfig {
    pub margin: f64,
    /// Content may not extend closer than this to the bottom edge.
    pub break_margin: f64,
    /// Height of one wrapped line in a table data row.
    pub base_line_height: f64,
    pub header_row_height: f64,
    pub default_column_width: f64,
    pub currency_symbol: String,
    pub header_fill: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            margin: 10.0,
            break_margin: 10.0,
            base_line_height: 5.0,
            header_row_height: 6.0,
            default_column_width: 30.0,
            currency_symbol: "£".to_string(),
            header_fill: "#B2B2B2".to_string(),
        }
    }
}

impl FlowConfig {
    pub fn header_fill_color(&self) -> Color {
        color_or_default(&self.header_fill)
    }
}
