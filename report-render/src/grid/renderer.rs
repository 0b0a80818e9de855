//! FILENAME: report-render/src/grid/renderer.rs
//! PURPOSE: Walks layout pages and writes them through a `GridBackend`.
//! CONTEXT: Each page owns a 1-based row cursor that starts at 1. A section is
//! placed at its explicit row if it has one, else at the cursor. Afterwards the
//! cursor moves to one past the section's last row, except for sections pinned
//! with `startRow`, which leave it where it was so that two blocks can share a
//! row range side by side.

use std::borrow::Cow;

use log::{debug, warn};

use report_core::{
    currency_format_code, format_currency, round_to, sort_rows, CellStyle, RenderContext, Row,
    SortSpec, Value, ValueFormat, NUMBER_FORMAT_CODE,
};
use report_template::{
    banner_style, AggregateKind, ColumnDef, DataGridSection, DetailsSection, LayoutPage, Section,
    StaticCell, SummarySection, TableSection, TotalsCell, MAX_GRID_ROW,
};

use super::GridBackend;
use crate::config::GridConfig;
use crate::error::RenderError;

pub struct GridRenderer<'a, B: GridBackend> {
    backend: &'a mut B,
    ctx: &'a RenderContext,
    config: &'a GridConfig,
}

impl<'a, B: GridBackend> GridRenderer<'a, B> {
    pub fn new(backend: &'a mut B, ctx: &'a RenderContext, config: &'a GridConfig) -> Self {
        GridRenderer {
            backend,
            ctx,
            config,
        }
    }

    pub fn render_pages(&mut self, pages: &[LayoutPage]) -> Result<(), RenderError> {
        for page in pages {
            self.render_page(page)?;
        }
        Ok(())
    }

    /// Renders one page into a new sheet. Returns the final cursor.
    pub fn render_page(&mut self, page: &LayoutPage) -> Result<u32, RenderError> {
        let name = self.ctx.resolve_string(&page.name);
        self.backend.add_sheet(&name)?;
        for (col, width) in &page.column_widths {
            self.backend.set_column_width(*col, *width)?;
        }

        let mut cursor = 1;
        for section in &page.sections {
            cursor = self.render_section(section, cursor)?;
        }
        debug!("Rendered sheet '{}' ({} sections)", name, page.sections.len());
        Ok(cursor)
    }

    /// Renders one section and returns the cursor for the next one.
    pub fn render_section(&mut self, section: &Section, cursor: u32) -> Result<u32, RenderError> {
        let placement = section.placement();
        let row = placement.resolve(cursor);
        if row > MAX_GRID_ROW {
            warn!(
                "Skipping {} section at row {}: past the last worksheet row",
                section.kind_name(),
                row
            );
            return Ok(cursor);
        }

        let end = match section {
            Section::Cells(cells) => {
                self.render_cells(&cells.cells, row)?;
                row.saturating_add(1)
            }
            Section::DataGrid(grid) => self.render_data_grid(grid, row)?,
            Section::Totals(totals) => {
                self.render_totals(&totals.cells, row)?;
                row.saturating_add(1)
            }
            Section::Details(details) => self.render_details(details, row)?,
            Section::Title(title) => {
                let style = CellStyle::new()
                    .with_bold(true)
                    .with_font_size(title.font_size);
                self.put(row, 0, &Value::text(self.ctx.resolve_string(&title.text)), &style)?;
                row.saturating_add(1)
            }
            Section::Text(text) => {
                let style = CellStyle::new().with_font_size(text.font_size);
                self.put(row, 0, &Value::text(self.ctx.resolve_string(&text.text)), &style)?;
                row.saturating_add(1)
            }
            Section::Table(table) => self.render_table(table, row)?,
            Section::Summary(summary) => self.render_summary(summary, row)?,
            Section::Spacer(_) => row.saturating_add(1),
            Section::Unknown(kind) => {
                debug!("Skipping section of unknown type '{}'", kind);
                return Ok(cursor);
            }
        };

        debug!(
            "Rendered {} section at row {} (next row {})",
            section.kind_name(),
            row,
            end
        );
        Ok(if placement.is_pinned() { cursor } else { end })
    }

    // ========================================================================
    // SECTIONS
    // ========================================================================

    fn render_cells(&mut self, cells: &[StaticCell], row: u32) -> Result<(), RenderError> {
        for cell in cells {
            let text = self.ctx.resolve_string(&cell.value);
            let style = cell.style.clone().unwrap_or_default();
            self.put(row, cell.col, &auto_typed(&text), &style)?;

            if let Some(range) = cell.merge.filter(|r| r.last_row < MAX_GRID_ROW) {
                self.backend.merge_range(range)?;
                if !style.is_default() {
                    for r in range.first_row..=range.last_row {
                        for c in range.first_col..=range.last_col {
                            self.backend.apply_style(r, c, &style)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes one row per record. Returns the row after the grid.
    fn render_data_grid(&mut self, grid: &DataGridSection, start: u32) -> Result<u32, RenderError> {
        let rows = self.sorted_rows(&grid.source, grid.sort.as_ref());
        let split = grid.max_rows.unwrap_or(usize::MAX).min(rows.len());
        let (main, rest) = rows.split_at(split);

        let overflow: &[Row] = match &grid.overflow {
            Some(_) => rest,
            None => {
                if !rest.is_empty() {
                    debug!(
                        "dataGrid '{}' truncated: {} records past maxRows",
                        grid.source,
                        rest.len()
                    );
                }
                &[]
            }
        };

        let mut totals = ColumnTotals::new(&grid.columns);
        let height = main.len().max(overflow.len());

        for i in 0..height {
            let row = offset(start, i);
            if let Some(record) = main.get(i) {
                self.write_record(record, &grid.columns, row, Some(&mut totals))?;
            }
            if let (Some(record), Some(columns)) = (overflow.get(i), &grid.overflow) {
                self.write_record(record, columns, row, None)?;
            }
        }

        let mut end = offset(start, height);
        if !totals.is_empty() {
            self.write_total_row(&grid.columns, &totals, end)?;
            end = end.saturating_add(1);
        }
        Ok(end)
    }

    fn render_totals(&mut self, cells: &[TotalsCell], row: u32) -> Result<(), RenderError> {
        for cell in cells {
            let base = cell.style.clone().unwrap_or_default();

            if let Some(label) = &cell.label {
                self.put(row, cell.col, &Value::text(self.ctx.resolve_string(label)), &base)?;
                continue;
            }

            let value = match &cell.value {
                Value::Text(text) if text.trim_start().starts_with("{{") => self.ctx.resolve(text),
                other => other.clone(),
            };
            let (written, style) = self.formatted_if_numeric(&value, cell.format);
            self.put(row, cell.col, &written, &base.overlay(&style))?;
        }
        Ok(())
    }

    /// Label/value pairs down two fixed columns. Returns the row after the panel.
    fn render_details(&mut self, details: &DetailsSection, start: u32) -> Result<u32, RenderError> {
        let record = self.ctx.data(&details.source).first();
        let label_style = details.label_style.clone().unwrap_or_default();
        let value_style = details.value_style.clone().unwrap_or_default();

        for (i, field) in details.fields.iter().enumerate() {
            let row = offset(start, i);
            let raw = match &field.calculation {
                Some(name) => self.ctx.calculation(name).cloned().unwrap_or_default(),
                None => record.map(|r| r.value(&field.field).clone()).unwrap_or_default(),
            };
            // Currency is rendered as text here, not through a number format.
            let value = match field.format {
                ValueFormat::Currency if !raw.is_null() => Value::text(format_currency(
                    raw.to_number_lossy(),
                    &self.config.currency_symbol,
                )),
                _ => plain_value(&raw),
            };

            self.put(row, details.label_col, &Value::text(&field.label), &label_style)?;
            self.put(row, details.value_col, &value, &value_style)?;
        }
        Ok(offset(start, details.fields.len()))
    }

    /// Flow table laid out as rows: optional title, header, records, total.
    fn render_table(&mut self, table: &TableSection, start: u32) -> Result<u32, RenderError> {
        let rows = self.sorted_rows(&table.source, table.sort.as_ref());
        if table.skip_when_empty && rows.is_empty() {
            return Ok(start);
        }

        let banner = banner_style(self.config.header_fill_color());
        let mut row = start;

        if let Some(title) = &table.title {
            let text = Value::text(self.ctx.resolve_string(title));
            self.put(row, 0, &text, &CellStyle::new().with_bold(true))?;
            row = row.saturating_add(1);
        }

        for (i, column) in table.columns.iter().enumerate() {
            self.put(row, column_index(column, i), &Value::text(&column.label), &banner)?;
        }
        row = row.saturating_add(1);

        let limit = table.max_rows.unwrap_or(usize::MAX);
        for record in rows.iter().take(limit) {
            self.write_record(record, &table.columns, row, None)?;
            row = row.saturating_add(1);
        }
        if rows.len() > limit {
            let note = Value::text(format!("... and {} more items", rows.len() - limit));
            self.put(row, 0, &note, &CellStyle::new().with_italic(true))?;
            row = row.saturating_add(1);
        }

        if table.show_total {
            if let Some((i, last)) = table.columns.iter().enumerate().last() {
                let sum: f64 = rows.iter().map(|r| r.value(&last.field).to_number_lossy()).sum();
                let code = currency_format_code(&self.config.currency_symbol);
                self.put(row, 0, &Value::text("Total"), &banner)?;
                self.put(
                    row,
                    column_index(last, i),
                    &Value::Number(round_to(sum, 2)),
                    &banner.clone().with_number_format(code),
                )?;
                row = row.saturating_add(1);
            }
        }
        Ok(row)
    }

    fn render_summary(&mut self, summary: &SummarySection, start: u32) -> Result<u32, RenderError> {
        let mut row = start;
        if !summary.title.is_empty() {
            let title = Value::text(self.ctx.resolve_string(&summary.title));
            self.put(row, 0, &title, &CellStyle::new().with_bold(true))?;
            row = row.saturating_add(1);
        }
        for item in &summary.items {
            let emphasis = if item.bold {
                CellStyle::new().with_bold(true)
            } else {
                CellStyle::new()
            };
            let value = match &item.value {
                Value::Text(text) if text.trim_start().starts_with("{{") => self.ctx.resolve(text),
                other => other.clone(),
            };
            let (written, style) = self.formatted_if_numeric(&value, item.format);
            self.put(row, 0, &Value::text(self.ctx.resolve_string(&item.label)), &emphasis)?;
            self.put(row, 1, &written, &emphasis.overlay(&style))?;
            row = row.saturating_add(1);
        }
        Ok(row)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Writes at a 1-based row. Rows past the sheet are dropped.
    fn put(&mut self, row: u32, col: u32, value: &Value, style: &CellStyle) -> Result<(), RenderError> {
        if row > MAX_GRID_ROW {
            return Ok(());
        }
        self.backend.write_cell(row.saturating_sub(1), col, value, style)
    }

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

    fn write_record(
        &mut self,
        record: &Row,
        columns: &[ColumnDef],
        row: u32,
        mut totals: Option<&mut ColumnTotals>,
    ) -> Result<(), RenderError> {
        for (i, column) in columns.iter().enumerate() {
            let raw = record.value(&column.field);
            let (value, style) = self.column_cell(raw, column);
            self.put(row, column_index(column, i), &value, &style)?;
            if let Some(totals) = totals.as_deref_mut() {
                totals.record(i, column.format, raw);
            }
        }
        Ok(())
    }

    /// Value and style for one grid cell under the column's format.
    fn column_cell(&self, raw: &Value, column: &ColumnDef) -> (Value, CellStyle) {
        let (value, mut style) = match column.format {
            ValueFormat::Currency => (
                Value::Number(raw.to_number_lossy()),
                CellStyle::new().with_number_format(currency_format_code(&self.config.currency_symbol)),
            ),
            ValueFormat::Number => (
                Value::Number(round_to(raw.to_number_lossy(), 0)),
                CellStyle::new().with_number_format(NUMBER_FORMAT_CODE),
            ),
            ValueFormat::Plain => (plain_value(raw), CellStyle::new()),
        };
        if let Some(column_style) = &column.style {
            style = style.overlay(column_style);
        }
        if let Some(align) = column.align {
            style.align = Some(align);
        }
        (value, style)
    }

    /// Applies a numeric format only when the value really is a number.
    fn formatted_if_numeric(&self, value: &Value, format: ValueFormat) -> (Value, CellStyle) {
        match (format, value.as_number()) {
            (ValueFormat::Currency, Some(n)) => (
                Value::Number(n),
                CellStyle::new().with_number_format(currency_format_code(&self.config.currency_symbol)),
            ),
            (ValueFormat::Number, Some(n)) => (
                Value::Number(round_to(n, 0)),
                CellStyle::new().with_number_format(NUMBER_FORMAT_CODE),
            ),
            _ => (plain_value(value), CellStyle::new()),
        }
    }

    fn write_total_row(
        &mut self,
        columns: &[ColumnDef],
        totals: &ColumnTotals,
        row: u32,
    ) -> Result<(), RenderError> {
        let indices: Vec<u32> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| column_index(c, i))
            .collect();
        let (Some(&first), Some(&last)) = (indices.iter().min(), indices.iter().max()) else {
            return Ok(());
        };
        let banner = banner_style(self.config.header_fill_color());

        self.put(row, first, &Value::text("Total"), &banner)?;
        for (i, column) in columns.iter().enumerate() {
            let Some(result) = totals.result(i) else {
                continue;
            };
            let code = match column.format {
                ValueFormat::Currency => currency_format_code(&self.config.currency_symbol),
                _ => NUMBER_FORMAT_CODE.to_string(),
            };
            let style = banner.clone().with_number_format(code);
            self.put(row, indices[i], &Value::Number(result), &style)?;
        }
        if row <= MAX_GRID_ROW {
            for col in first..=last {
                self.backend.apply_style(row.saturating_sub(1), col, &banner)?;
            }
        }
        Ok(())
    }
}

/// Row `n` places below `start`, saturating at the top of the row range.
fn offset(start: u32, n: usize) -> u32 {
    start.saturating_add(u32::try_from(n).unwrap_or(u32::MAX))
}

/// Column position: explicit `col`, else the column's index in its list.
fn column_index(column: &ColumnDef, position: usize) -> u32 {
    column.col.unwrap_or(position as u32)
}

/// A raw record value as a plain cell. Text that reads as a number is written
/// as a number, except codes with leading zeros or an explicit plus sign.
fn plain_value(raw: &Value) -> Value {
    match raw {
        Value::Text(text) => auto_typed(text),
        other => other.clone(),
    }
}

fn auto_typed(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    let trimmed = text.trim();
    let digits = trimmed.trim_start_matches('-');
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if trimmed == text && !leading_zero && !trimmed.starts_with('+') {
        if let Some(n) = Value::text(trimmed).as_number() {
            return Value::Number(n);
        }
    }
    Value::text(text)
}

/// Values collected per aggregate column while a grid is written.
struct ColumnTotals {
    slots: Vec<Option<(AggregateKind, Vec<f64>)>>,
}

impl ColumnTotals {
    fn new(columns: &[ColumnDef]) -> Self {
        ColumnTotals {
            slots: columns
                .iter()
                .map(|c| c.aggregate.map(|kind| (kind, Vec::new())))
                .collect(),
        }
    }

    fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    fn record(&mut self, index: usize, format: ValueFormat, raw: &Value) {
        if let Some(Some((_, values))) = self.slots.get_mut(index) {
            match format {
                ValueFormat::Currency => values.push(raw.to_number_lossy()),
                _ => {
                    if let Some(n) = raw.as_number() {
                        values.push(n);
                    }
                }
            }
        }
    }

    fn result(&self, index: usize) -> Option<f64> {
        let (kind, values) = self.slots.get(index)?.as_ref()?;
        let sum: f64 = values.iter().sum();
        Some(match kind {
            AggregateKind::Sum => sum,
            AggregateKind::Avg if values.is_empty() => 0.0,
            AggregateKind::Avg => sum / values.len() as f64,
            AggregateKind::Count => values.len() as f64,
        })
    }
}
