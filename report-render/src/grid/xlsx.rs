//! FILENAME: report-render/src/grid/xlsx.rs
//! PURPOSE: `GridBackend` that produces an .xlsx workbook in memory.
//! CONTEXT: Cells, merges and widths are buffered per sheet so styles can be
//! layered onto cells after they are written; `into_bytes` replays the buffer
//! through rust_xlsxwriter. Every format carries the workbook font.

use std::collections::BTreeMap;

use log::warn;
use rust_xlsxwriter::{
    Color as XlsxColor, Format, FormatAlign, FormatBorder, FormatPattern, Workbook, XlsxError,
};

use report_core::{BorderWeight, CellRange, CellStyle, TextAlign, Value};

use super::GridBackend;
use crate::config::GridConfig;
use crate::error::RenderError;

/// Hard worksheet-name limit of the file format.
const SHEET_NAME_LIMIT: usize = 31;

#[derive(Debug, Clone)]
struct BufferedCell {
    value: Value,
    style: CellStyle,
}

#[derive(Debug, Clone)]
struct SheetBuffer {
    name: String,
    column_widths: BTreeMap<u32, f64>,
    cells: BTreeMap<(u32, u32), BufferedCell>,
    merges: Vec<CellRange>,
}

pub struct XlsxGridBackend {
    config: GridConfig,
    sheets: Vec<SheetBuffer>,
}

impl XlsxGridBackend {
    pub fn new(config: GridConfig) -> Self {
        XlsxGridBackend {
            config,
            sheets: Vec::new(),
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    fn current(&mut self) -> Result<&mut SheetBuffer, RenderError> {
        self.sheets.last_mut().ok_or(RenderError::NoSheet)
    }

    /// Strips characters worksheet names may not contain, truncates, and makes
    /// the name unique within the workbook (case-insensitively).
    fn unique_sheet_name(&self, raw: &str) -> String {
        let max_len = self.config.max_sheet_name_len.clamp(1, SHEET_NAME_LIMIT);
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
            .collect();
        let mut base: String = cleaned.trim().trim_matches('\'').chars().take(max_len).collect();
        base = base.trim().trim_end_matches('\'').to_string();
        if base.is_empty() {
            base = format!("Sheet{}", self.sheets.len() + 1);
        }

        let taken = |name: &str| {
            self.sheets
                .iter()
                .any(|s| s.name.to_lowercase() == name.to_lowercase())
        };
        if !taken(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let suffix = format!(" ({})", n);
            let keep = max_len.saturating_sub(suffix.chars().count());
            let candidate: String = base.chars().take(keep).collect::<String>() + &suffix;
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Builds the workbook and returns the file bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();

        if self.sheets.is_empty() {
            workbook.add_worksheet().set_name("Report")?;
        }

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(|_| RenderError::InvalidSheetName(sheet.name.clone()))?;

            for (col, width) in &sheet.column_widths {
                worksheet.set_column_width(col16(*col)?, *width)?;
            }

            // Merges first: merge_range writes the anchor, real values overwrite it below.
            for range in &sheet.merges {
                let anchor = sheet
                    .cells
                    .get(&(range.first_row, range.first_col))
                    .map(|c| c.style.clone())
                    .unwrap_or_default();
                worksheet.merge_range(
                    range.first_row,
                    col16(range.first_col)?,
                    range.last_row,
                    col16(range.last_col)?,
                    "",
                    &self.format_for(&anchor),
                )?;
            }

            for ((row, col), cell) in &sheet.cells {
                let format = self.format_for(&cell.style);
                let col = col16(*col)?;
                match &cell.value {
                    Value::Null => {
                        worksheet.write_blank(*row, col, &format)?;
                    }
                    Value::Bool(b) => {
                        worksheet.write_boolean_with_format(*row, col, *b, &format)?;
                    }
                    Value::Number(n) => {
                        worksheet.write_number_with_format(*row, col, *n, &format)?;
                    }
                    Value::Text(s) => {
                        worksheet.write_string_with_format(*row, col, s, &format)?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn format_for(&self, style: &CellStyle) -> Format {
        let mut format = Format::new()
            .set_font_name(&self.config.font_name)
            .set_font_size(style.font_size.unwrap_or(self.config.font_size));

        if style.is_bold() {
            format = format.set_bold();
        }
        if style.italic == Some(true) {
            format = format.set_italic();
        }
        if let Some(color) = style.font_color {
            format = format.set_font_color(XlsxColor::RGB(color.to_rgb_u32()));
        }
        if let Some(fill) = style.fill {
            format = format
                .set_pattern(FormatPattern::Solid)
                .set_background_color(XlsxColor::RGB(fill.to_rgb_u32()));
        }
        if let Some(border) = style.border {
            format = format.set_border(match border {
                BorderWeight::Thin => FormatBorder::Thin,
                BorderWeight::Medium => FormatBorder::Medium,
            });
        }
        if let Some(align) = style.align {
            format = format.set_align(match align {
                TextAlign::Left => FormatAlign::Left,
                TextAlign::Center => FormatAlign::Center,
                TextAlign::Right => FormatAlign::Right,
            });
        }
        if style.wrap_text == Some(true) {
            format = format.set_text_wrap();
        }
        if let Some(code) = &style.number_format {
            format = format.set_num_format(code);
        }
        format
    }
}

fn col16(col: u32) -> Result<u16, RenderError> {
    u16::try_from(col).map_err(|_| RenderError::Xlsx(XlsxError::RowColumnLimitError))
}

fn overlaps(a: &CellRange, b: &CellRange) -> bool {
    a.first_row <= b.last_row
        && b.first_row <= a.last_row
        && a.first_col <= b.last_col
        && b.first_col <= a.last_col
}

impl GridBackend for XlsxGridBackend {
    fn add_sheet(&mut self, name: &str) -> Result<(), RenderError> {
        let name = self.unique_sheet_name(name);
        self.sheets.push(SheetBuffer {
            name,
            column_widths: BTreeMap::new(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
        });
        Ok(())
    }

    fn set_column_width(&mut self, col: u32, width: f64) -> Result<(), RenderError> {
        self.current()?.column_widths.insert(col, width);
        Ok(())
    }

    fn write_cell(
        &mut self,
        row: u32,
        col: u32,
        value: &Value,
        style: &CellStyle,
    ) -> Result<(), RenderError> {
        let sheet = self.current()?;
        // A merge anchor keeps the style it was given before the value arrived.
        let style = match sheet.cells.get(&(row, col)) {
            Some(existing) if style.is_default() => existing.style.clone(),
            _ => style.clone(),
        };
        sheet.cells.insert(
            (row, col),
            BufferedCell {
                value: value.clone(),
                style,
            },
        );
        Ok(())
    }

    fn apply_style(&mut self, row: u32, col: u32, style: &CellStyle) -> Result<(), RenderError> {
        let sheet = self.current()?;
        let cell = sheet.cells.entry((row, col)).or_insert_with(|| BufferedCell {
            value: Value::Null,
            style: CellStyle::default(),
        });
        cell.style = cell.style.overlay(style);
        Ok(())
    }

    fn merge_range(&mut self, range: CellRange) -> Result<(), RenderError> {
        if range.is_single_cell() {
            return Ok(());
        }
        let sheet = self.current()?;
        if let Some(existing) = sheet.merges.iter().find(|m| overlaps(m, &range)) {
            warn!(
                "Skipping merge {:?} on sheet '{}': overlaps {:?}",
                range, sheet.name, existing
            );
            return Ok(());
        }
        sheet.merges.push(range);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use report_core::parse_range;
    use std::io::Cursor;

    fn read_back(bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
        open_workbook_from_rs(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_writes_typed_cells() {
        let mut backend = XlsxGridBackend::new(GridConfig::default());
        backend.add_sheet("Costs").unwrap();
        backend
            .write_cell(0, 0, &Value::text("Item"), &CellStyle::new().with_bold(true))
            .unwrap();
        backend
            .write_cell(1, 1, &Value::Number(1234.5), &CellStyle::new().with_number_format("£#,##0.00"))
            .unwrap();
        backend.set_column_width(0, 20.0).unwrap();

        let mut workbook = read_back(backend.into_bytes().unwrap());
        let range = workbook.worksheet_range("Costs").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Item".to_string())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(1234.5)));
    }

    #[test]
    fn test_sheet_names_are_cleaned_and_unique() {
        let mut backend = XlsxGridBackend::new(GridConfig::default());
        backend.add_sheet("Fuel [2024]: a/b").unwrap();
        backend.add_sheet("fuel 2024 ab").unwrap();
        backend.add_sheet("A very long worksheet name that overflows").unwrap();
        backend.add_sheet("").unwrap();

        assert_eq!(
            backend.sheet_names(),
            vec!["Fuel 2024 ab", "fuel 2024 ab (2)", "A very long worksheet name that", "Sheet4"]
        );
        let workbook = read_back(backend.into_bytes().unwrap());
        assert_eq!(workbook.sheet_names().len(), 4);
    }

    #[test]
    fn test_overlapping_merge_is_skipped() {
        let mut backend = XlsxGridBackend::new(GridConfig::default());
        backend.add_sheet("Report").unwrap();
        backend.merge_range(parse_range("A1:F1").unwrap()).unwrap();
        backend.merge_range(parse_range("C1:D2").unwrap()).unwrap();
        backend.merge_range(parse_range("A3").unwrap()).unwrap();
        backend.write_cell(0, 0, &Value::text("Title"), &CellStyle::default()).unwrap();

        assert_eq!(backend.sheets[0].merges.len(), 1);
        let mut workbook = read_back(backend.into_bytes().unwrap());
        let range = workbook.worksheet_range("Report").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Title".to_string())));
    }

    #[test]
    fn test_apply_style_before_write_keeps_style() {
        let mut backend = XlsxGridBackend::new(GridConfig::default());
        assert!(matches!(
            backend.write_cell(0, 0, &Value::Null, &CellStyle::default()),
            Err(RenderError::NoSheet)
        ));
        backend.add_sheet("Report").unwrap();
        backend.apply_style(2, 0, &CellStyle::new().with_bold(true)).unwrap();
        backend.write_cell(2, 0, &Value::text("Total"), &CellStyle::default()).unwrap();
        assert_eq!(backend.sheets[0].cells[&(2, 0)].style.bold, Some(true));
    }

    #[test]
    fn test_empty_workbook_still_has_a_sheet() {
        let backend = XlsxGridBackend::new(GridConfig::default());
        let workbook = read_back(backend.into_bytes().unwrap());
        assert_eq!(workbook.sheet_names(), vec!["Report".to_string()]);
    }
}
