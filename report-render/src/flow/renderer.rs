//! FILENAME: report-render/src/flow/renderer.rs
//! PURPOSE: Lays sections out top to bottom through a `FlowBackend`.
//! CONTEXT: The renderer tracks the vertical position on the current page and
//! starts a new page whenever the next block would cross the bottom break
//! margin. Table rows are measured before they are drawn: every cell in a row
//! gets the height of the row's tallest wrapped cell.

use std::borrow::Cow;

use log::debug;

use report_core::{
    format_currency, format_integer, sort_rows, RenderContext, Row, SortSpec, TextAlign, Value,
    ValueFormat,
};
use report_template::{
    ColumnDef, DataGridSection, DetailsSection, Section, StaticCell, SummaryItem, SummarySection,
    TableSection, TextSection, TotalsCell,
};

use super::{FlowBackend, Font, Frame};
use crate::config::FlowConfig;
use crate::error::RenderError;

const DOCUMENT_TITLE_SIZE: f64 = 14.0;
const DOCUMENT_TITLE_HEIGHT: f64 = 10.0;
const DOCUMENT_TITLE_GAP: f64 = 5.0;

const HEADING_HEIGHT: f64 = 8.0;
const TEXT_LINE_HEIGHT: f64 = 6.0;

const TABLE_TITLE_SIZE: f64 = 11.0;
const TABLE_HEADER_SIZE: f64 = 8.0;
const TABLE_ROW_SIZE: f64 = 8.0;
const TABLE_SPACING: f64 = 5.0;
/// Horizontal and vertical inset of text inside a table cell.
const CELL_PADDING: f64 = 1.0;
const NOTE_SIZE: f64 = 7.0;
const NOTE_HEIGHT: f64 = 5.0;
const TOTAL_SIZE: f64 = 9.0;
const TOTAL_HEIGHT: f64 = 6.0;

const SUMMARY_TITLE_SIZE: f64 = 11.0;
const SUMMARY_ITEM_SIZE: f64 = 9.0;
const SUMMARY_LABEL_WIDTH: f64 = 60.0;
const SUMMARY_VALUE_WIDTH: f64 = 40.0;
const SUMMARY_ROW_HEIGHT: f64 = 6.0;

/// The parts of a table section the layout needs, borrowed from either a
/// `table` or a degraded `dataGrid`.
struct TableView<'s> {
    title: Option<&'s str>,
    source: &'s str,
    columns: &'s [ColumnDef],
    max_rows: Option<usize>,
    show_total: bool,
    spacing: f64,
    sort: Option<&'s SortSpec>,
    skip_when_empty: bool,
}

impl<'s> From<&'s TableSection> for TableView<'s> {
    fn from(table: &'s TableSection) -> Self {
        TableView {
            title: table.title.as_deref(),
            source: &table.source,
            columns: &table.columns,
            max_rows: table.max_rows,
            show_total: table.show_total,
            spacing: table.spacing,
            sort: table.sort.as_ref(),
            skip_when_empty: table.skip_when_empty,
        }
    }
}

impl<'s> From<&'s DataGridSection> for TableView<'s> {
    fn from(grid: &'s DataGridSection) -> Self {
        TableView {
            title: None,
            source: &grid.source,
            columns: &grid.columns,
            max_rows: grid.max_rows,
            show_total: grid.columns.iter().any(|c| c.aggregate.is_some()),
            spacing: TABLE_SPACING,
            sort: grid.sort.as_ref(),
            skip_when_empty: false,
        }
    }
}

pub struct FlowRenderer<'a, B: FlowBackend> {
    backend: &'a mut B,
    ctx: &'a RenderContext,
    config: &'a FlowConfig,
    page_width: f64,
    page_height: f64,
    y: f64,
    started: bool,
}

impl<'a, B: FlowBackend> FlowRenderer<'a, B> {
    pub fn new(backend: &'a mut B, ctx: &'a RenderContext, config: &'a FlowConfig) -> Self {
        let (page_width, page_height) = backend.page_size();
        FlowRenderer {
            backend,
            ctx,
            config,
            page_width,
            page_height,
            y: config.margin,
            started: false,
        }
    }

    /// Current vertical position on the page.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Opens the first page with the centred document title.
    pub fn begin(&mut self, title: &str) -> Result<(), RenderError> {
        self.start_page()?;
        let text = self.ctx.resolve_string(title);
        let frame = Frame::new(
            self.config.margin,
            self.y,
            self.printable_width(),
            DOCUMENT_TITLE_HEIGHT,
        );
        self.backend
            .draw_text(&text, frame, TextAlign::Center, Font::bold(DOCUMENT_TITLE_SIZE))?;
        self.y += DOCUMENT_TITLE_HEIGHT + DOCUMENT_TITLE_GAP;
        Ok(())
    }

    pub fn render_sections(&mut self, sections: &[Section]) -> Result<(), RenderError> {
        if !self.started {
            self.start_page()?;
        }
        for section in sections {
            self.render_section(section)?;
            debug!("Rendered {} section (y = {:.1} mm)", section.kind_name(), self.y);
        }
        Ok(())
    }

    pub fn render_section(&mut self, section: &Section) -> Result<(), RenderError> {
        match section {
            Section::Title(title) => {
                let text = self.ctx.resolve_string(&title.text);
                self.heading(&text, Font::bold(title.font_size))?;
                self.y += title.spacing;
                Ok(())
            }
            Section::Text(text) => self.render_text(text),
            Section::Table(table) => self.render_table(TableView::from(table)),
            Section::Summary(summary) => self.render_summary(summary),
            Section::Spacer(spacer) => {
                self.y += spacer.height;
                Ok(())
            }
            Section::DataGrid(grid) => self.render_table(TableView::from(grid)),
            Section::Details(details) => {
                let summary = self.details_as_summary(details);
                self.render_summary(&summary)
            }
            Section::Totals(totals) => {
                let line = self.totals_line(&totals.cells);
                self.single_line(&line, Font::bold(TOTAL_SIZE))
            }
            Section::Cells(cells) => {
                let line = self.cells_line(&cells.cells);
                self.single_line(&line, Font::regular(SUMMARY_ITEM_SIZE))
            }
            Section::Unknown(kind) => {
                debug!("Skipping section of unknown type '{}'", kind);
                Ok(())
            }
        }
    }

    // ========================================================================
    // PAGE STATE
    // ========================================================================

    fn start_page(&mut self) -> Result<(), RenderError> {
        self.backend.new_page()?;
        self.y = self.config.margin;
        self.started = true;
        Ok(())
    }

    fn printable_width(&self) -> f64 {
        (self.page_width - 2.0 * self.config.margin).max(0.0)
    }

    /// Breaks the page when a block of `height` would not fit above the bottom
    /// margin. A block taller than a whole page is drawn where it is.
    fn ensure_space(&mut self, height: f64) -> Result<(), RenderError> {
        let limit = self.page_height - self.config.break_margin;
        if self.y + height > limit && self.y > self.config.margin {
            self.start_page()?;
        }
        Ok(())
    }

    fn heading(&mut self, text: &str, font: Font) -> Result<(), RenderError> {
        self.ensure_space(HEADING_HEIGHT)?;
        let frame = Frame::new(self.config.margin, self.y, self.printable_width(), HEADING_HEIGHT);
        self.backend.draw_text(text, frame, TextAlign::Left, font)?;
        self.y += HEADING_HEIGHT;
        Ok(())
    }

    fn single_line(&mut self, text: &str, font: Font) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        self.ensure_space(TEXT_LINE_HEIGHT)?;
        let frame = Frame::new(self.config.margin, self.y, self.printable_width(), TEXT_LINE_HEIGHT);
        self.backend.draw_text(text, frame, TextAlign::Left, font)?;
        self.y += TEXT_LINE_HEIGHT;
        Ok(())
    }

    // ========================================================================
    // SECTIONS
    // ========================================================================

    fn render_text(&mut self, section: &TextSection) -> Result<(), RenderError> {
        let text = self.ctx.resolve_string(&section.text);
        let font = Font::regular(section.font_size);
        let width = self.printable_width();
        for line in self.backend.wrap_text(&text, width, font) {
            self.ensure_space(TEXT_LINE_HEIGHT)?;
            let frame = Frame::new(self.config.margin, self.y, width, TEXT_LINE_HEIGHT);
            self.backend.draw_text(&line, frame, TextAlign::Left, font)?;
            self.y += TEXT_LINE_HEIGHT;
        }
        self.y += section.spacing;
        Ok(())
    }

    fn render_table(&mut self, table: TableView<'_>) -> Result<(), RenderError> {
        let rows = self.sorted_rows(table.source, table.sort);
        if table.skip_when_empty && rows.is_empty() {
            debug!("Skipping table over empty source '{}'", table.source);
            return Ok(());
        }

        if let Some(title) = table.title {
            let text = self.ctx.resolve_string(title);
            self.heading(&text, Font::bold(TABLE_TITLE_SIZE))?;
        }

        let widths: Vec<f64> = table
            .columns
            .iter()
            .map(|c| c.width.unwrap_or(self.config.default_column_width))
            .collect();
        self.table_header(table.columns, &widths)?;

        let limit = table.max_rows.unwrap_or(usize::MAX);
        for record in rows.iter().take(limit) {
            self.table_row(record, table.columns, &widths)?;
        }

        if rows.len() > limit {
            self.ensure_space(NOTE_HEIGHT)?;
            let note = format!("... and {} more items", rows.len() - limit);
            let frame = Frame::new(self.config.margin, self.y, self.printable_width(), NOTE_HEIGHT);
            self.backend
                .draw_text(&note, frame, TextAlign::Left, Font::italic(NOTE_SIZE))?;
            self.y += NOTE_HEIGHT;
        }

        if table.show_total {
            self.table_total(&rows, table.columns, &widths)?;
        }

        self.y += table.spacing;
        Ok(())
    }

    fn table_header(&mut self, columns: &[ColumnDef], widths: &[f64]) -> Result<(), RenderError> {
        let height = self.config.header_row_height;
        self.ensure_space(height)?;
        let fill = self.config.header_fill_color();
        let mut x = self.config.margin;
        for (column, width) in columns.iter().zip(widths) {
            let frame = Frame::new(x, self.y, *width, height);
            self.backend.draw_rect(frame, Some(fill), true)?;
            self.backend.draw_text(
                &column.label,
                frame.inset(CELL_PADDING / 2.0),
                TextAlign::Center,
                Font::bold(TABLE_HEADER_SIZE),
            )?;
            x += width;
        }
        self.y += height;
        Ok(())
    }

    /// Measures every cell, then draws the whole row at the tallest height.
    fn table_row(&mut self, record: &Row, columns: &[ColumnDef], widths: &[f64]) -> Result<(), RenderError> {
        let font = Font::regular(TABLE_ROW_SIZE);
        let line_height = self.config.base_line_height;

        let cells: Vec<(Vec<String>, TextAlign)> = columns
            .iter()
            .zip(widths)
            .map(|(column, width)| {
                let (text, align) = self.cell_text(record.value(&column.field), column);
                let inner = (width - 2.0 * CELL_PADDING).max(0.0);
                (self.backend.wrap_text(&text, inner, font), align)
            })
            .collect();

        let max_lines = cells.iter().map(|(lines, _)| lines.len()).max().unwrap_or(1).max(1);
        let row_height = max_lines as f64 * line_height;
        self.ensure_space(row_height)?;

        let mut x = self.config.margin;
        for ((lines, align), width) in cells.iter().zip(widths) {
            self.backend
                .draw_rect(Frame::new(x, self.y, *width, row_height), None, true)?;
            for (i, line) in lines.iter().enumerate() {
                let frame = Frame::new(
                    x + CELL_PADDING,
                    self.y + i as f64 * line_height,
                    (width - 2.0 * CELL_PADDING).max(0.0),
                    line_height,
                );
                self.backend.draw_text(line, frame, *align, font)?;
            }
            x += width;
        }
        self.y += row_height;
        Ok(())
    }

    /// Bold row: `Total:` across all but the last column, then the currency
    /// sum of the last column's field over every record, shown or not.
    fn table_total(&mut self, rows: &[Row], columns: &[ColumnDef], widths: &[f64]) -> Result<(), RenderError> {
        let Some((last, leading)) = widths.split_last() else {
            return Ok(());
        };
        let field = columns
            .last()
            .map(|c| c.field.as_str())
            .filter(|f| !f.is_empty())
            .unwrap_or("cost");
        let total: f64 = rows.iter().map(|r| r.value(field).to_number_lossy()).sum();

        self.ensure_space(TOTAL_HEIGHT)?;
        let font = Font::bold(TOTAL_SIZE);
        let fill = Some(self.config.header_fill_color());
        let label_width: f64 = leading.iter().sum();
        let mut x = self.config.margin;

        if label_width > 0.0 {
            let frame = Frame::new(x, self.y, label_width, TOTAL_HEIGHT);
            self.backend.draw_rect(frame, fill, true)?;
            self.backend
                .draw_text("Total:", frame.inset(CELL_PADDING / 2.0), TextAlign::Right, font)?;
            x += label_width;
        }
        let frame = Frame::new(x, self.y, *last, TOTAL_HEIGHT);
        self.backend.draw_rect(frame, fill, true)?;
        self.backend.draw_text(
            &format_currency(total, &self.config.currency_symbol),
            frame.inset(CELL_PADDING / 2.0),
            TextAlign::Right,
            font,
        )?;
        self.y += TOTAL_HEIGHT;
        Ok(())
    }

    fn render_summary(&mut self, summary: &SummarySection) -> Result<(), RenderError> {
        if !summary.title.is_empty() {
            let title = self.ctx.resolve_string(&summary.title);
            self.heading(&title, Font::bold(SUMMARY_TITLE_SIZE))?;
        }

        for item in &summary.items {
            self.ensure_space(SUMMARY_ROW_HEIGHT)?;
            let font = if item.bold {
                Font::bold(SUMMARY_ITEM_SIZE)
            } else {
                Font::regular(SUMMARY_ITEM_SIZE)
            };
            let label = self.ctx.resolve_string(&item.label);
            let value = self.summary_value(item);

            let label_frame = Frame::new(self.config.margin, self.y, SUMMARY_LABEL_WIDTH, SUMMARY_ROW_HEIGHT);
            let value_frame = Frame::new(
                self.config.margin + SUMMARY_LABEL_WIDTH,
                self.y,
                SUMMARY_VALUE_WIDTH,
                SUMMARY_ROW_HEIGHT,
            );
            self.backend.draw_text(&label, label_frame, TextAlign::Left, font)?;
            self.backend.draw_text(&value, value_frame, TextAlign::Right, font)?;
            self.y += SUMMARY_ROW_HEIGHT;
        }
        Ok(())
    }

    // ========================================================================
    // FORMATTING
    // ========================================================================

    fn sorted_rows(&self, source: &str, sort: Option<&SortSpec>) -> Cow<'a, [Row]> {
        let ctx: &'a RenderContext = self.ctx;
        let rows = ctx.data(source);
        match sort {
            Some(spec) => {
                let mut sorted = rows.to_vec();
                sort_rows(&mut sorted, spec);
                Cow::Owned(sorted)
            }
            None => Cow::Borrowed(rows),
        }
    }

    /// Display text and alignment of one table cell.
    fn cell_text(&self, raw: &Value, column: &ColumnDef) -> (String, TextAlign) {
        let symbol = &self.config.currency_symbol;
        match column.format {
            ValueFormat::Currency => (format_currency(raw.to_number_lossy(), symbol), TextAlign::Right),
            ValueFormat::Number => (format_integer(raw.to_number_lossy()), TextAlign::Right),
            ValueFormat::Plain => (
                raw.display_string(),
                column
                    .align
                    .unwrap_or_else(|| TextAlign::auto(raw.as_number().is_some())),
            ),
        }
    }

    /// Resolves a `{{token}}` value, then formats it when it is numeric.
    fn formatted(&self, value: &Value, format: ValueFormat) -> String {
        let value = match value {
            Value::Text(text) if text.trim_start().starts_with("{{") => self.ctx.resolve(text),
            other => other.clone(),
        };
        match (format, value.as_number()) {
            (ValueFormat::Currency, Some(n)) => format_currency(n, &self.config.currency_symbol),
            (ValueFormat::Number, Some(n)) => format_integer(n),
            _ => value.display_string(),
        }
    }

    fn summary_value(&self, item: &SummaryItem) -> String {
        self.formatted(&item.value, item.format)
    }

    fn details_as_summary(&self, details: &DetailsSection) -> SummarySection {
        let record = self.ctx.data(&details.source).first();
        let items = details
            .fields
            .iter()
            .map(|field| {
                let value = match &field.calculation {
                    Some(name) => self.ctx.calculation(name).cloned().unwrap_or_default(),
                    None => record.map(|r| r.value(&field.field).clone()).unwrap_or_default(),
                };
                SummaryItem {
                    label: field.label.clone(),
                    value,
                    format: field.format,
                    bold: false,
                }
            })
            .collect();
        SummarySection {
            title: String::new(),
            items,
        }
    }

    fn totals_line(&self, cells: &[TotalsCell]) -> String {
        cells
            .iter()
            .map(|cell| match &cell.label {
                Some(label) => self.ctx.resolve_string(label),
                None => self.formatted(&cell.value, cell.format),
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("   ")
    }

    fn cells_line(&self, cells: &[StaticCell]) -> String {
        cells
            .iter()
            .map(|cell| self.ctx.resolve_string(&cell.value))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("   ")
    }
}
