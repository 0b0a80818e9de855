//! FILENAME: report-render/src/recording.rs
//! PURPOSE: In-memory backends that record every primitive call.
//! CONTEXT: Used by tests across the workspace to assert layout decisions
//! (cursor movement, row heights, page breaks) without decoding binary output.

use std::collections::BTreeMap;

use report_core::{parse_a1, CellRange, CellStyle, Color, TextAlign, Value};

use crate::error::RenderError;
use crate::flow::{FlowBackend, Font, Frame};
use crate::grid::GridBackend;

// ============================================================================
// GRID
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedSheet {
    pub name: String,
    pub column_widths: BTreeMap<u32, f64>,
    /// 0-based (row, col) -> value and style.
    pub cells: BTreeMap<(u32, u32), (Value, CellStyle)>,
    pub merges: Vec<CellRange>,
}

impl RecordedSheet {
    pub fn value(&self, a1: &str) -> Option<&Value> {
        let coord = parse_a1(a1)?;
        self.cells.get(&coord).map(|(value, _)| value)
    }

    /// Display text of a cell, empty when the cell was never written.
    pub fn text(&self, a1: &str) -> String {
        self.value(a1).map(Value::display_string).unwrap_or_default()
    }

    pub fn style(&self, a1: &str) -> Option<&CellStyle> {
        let coord = parse_a1(a1)?;
        self.cells.get(&coord).map(|(_, style)| style)
    }

    /// Highest 0-based row that holds a cell.
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().map(|(row, _)| *row).max()
    }
}

#[derive(Debug, Default)]
pub struct RecordingGrid {
    pub sheets: Vec<RecordedSheet>,
}

impl RecordingGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&RecordedSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn current(&mut self) -> Result<&mut RecordedSheet, RenderError> {
        self.sheets.last_mut().ok_or(RenderError::NoSheet)
    }
}

impl GridBackend for RecordingGrid {
    fn add_sheet(&mut self, name: &str) -> Result<(), RenderError> {
        self.sheets.push(RecordedSheet {
            name: name.to_string(),
            ..Default::default()
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
        let style = match sheet.cells.get(&(row, col)) {
            Some((_, existing)) if style.is_default() => existing.clone(),
            _ => style.clone(),
        };
        sheet.cells.insert((row, col), (value.clone(), style));
        Ok(())
    }

    fn apply_style(&mut self, row: u32, col: u32, style: &CellStyle) -> Result<(), RenderError> {
        let cell = self
            .current()?
            .cells
            .entry((row, col))
            .or_insert_with(|| (Value::Null, CellStyle::default()));
        cell.1 = cell.1.overlay(style);
        Ok(())
    }

    fn merge_range(&mut self, range: CellRange) -> Result<(), RenderError> {
        self.current()?.merges.push(range);
        Ok(())
    }
}

// ============================================================================
// FLOW
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FlowOp {
    NewPage,
    Text {
        page: usize,
        text: String,
        frame: Frame,
        align: TextAlign,
        font: Font,
    },
    Rect {
        page: usize,
        frame: Frame,
        fill: Option<Color>,
        stroke: bool,
    },
}

/// Flow backend with fixed-pitch metrics: every character is `char_width` wide.
#[derive(Debug)]
pub struct RecordingFlow {
    pub page_width: f64,
    pub page_height: f64,
    pub char_width: f64,
    pub ops: Vec<FlowOp>,
    pages: usize,
}

impl RecordingFlow {
    pub fn new(page_width: f64, page_height: f64) -> Self {
        RecordingFlow {
            page_width,
            page_height,
            char_width: 2.0,
            ops: Vec::new(),
            pages: 0,
        }
    }

    pub fn with_char_width(mut self, char_width: f64) -> Self {
        self.char_width = char_width;
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Every text op as (page, text, frame).
    pub fn texts(&self) -> Vec<(usize, &str, Frame)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FlowOp::Text {
                    page, text, frame, ..
                } => Some((*page, text.as_str(), *frame)),
                _ => None,
            })
            .collect()
    }

    /// Every rectangle as (page, frame).
    pub fn rects(&self) -> Vec<(usize, Frame)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FlowOp::Rect { page, frame, .. } => Some((*page, *frame)),
                _ => None,
            })
            .collect()
    }

    /// First text op whose text equals `text`.
    pub fn find_text(&self, text: &str) -> Option<&FlowOp> {
        self.ops
            .iter()
            .find(|op| matches!(op, FlowOp::Text { text: t, .. } if t == text))
    }
}

impl FlowBackend for RecordingFlow {
    fn page_size(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }

    fn new_page(&mut self) -> Result<(), RenderError> {
        self.pages += 1;
        self.ops.push(FlowOp::NewPage);
        Ok(())
    }

    fn text_width(&self, text: &str, _font: Font) -> f64 {
        text.chars().count() as f64 * self.char_width
    }

    fn draw_text(
        &mut self,
        text: &str,
        frame: Frame,
        align: TextAlign,
        font: Font,
    ) -> Result<(), RenderError> {
        self.ops.push(FlowOp::Text {
            page: self.pages,
            text: text.to_string(),
            frame,
            align,
            font,
        });
        Ok(())
    }

    fn draw_rect(&mut self, frame: Frame, fill: Option<Color>, stroke: bool) -> Result<(), RenderError> {
        self.ops.push(FlowOp::Rect {
            page: self.pages,
            frame,
            fill,
            stroke,
        });
        Ok(())
    }
}
