//! FILENAME: report-render/src/flow/mod.rs
//! PURPOSE: Paginated output: the backend capability and the renderer.
//! CONTEXT: Coordinates are millimetres from the top-left corner of the page.
//! The renderer owns the vertical position and decides page breaks; a backend
//! only draws and measures.

mod metrics;
mod pdf;
mod renderer;

pub use pdf::PdfFlowBackend;
pub use renderer::FlowRenderer;

use report_core::{Color, TextAlign};

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// Font face and size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub style: FontStyle,
    pub size: f64,
}

impl Font {
    pub const fn regular(size: f64) -> Self {
        Font { style: FontStyle::Regular, size }
    }

    pub const fn bold(size: f64) -> Self {
        Font { style: FontStyle::Bold, size }
    }

    pub const fn italic(size: f64) -> Self {
        Font { style: FontStyle::Italic, size }
    }
}

/// An axis-aligned box on the page, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Frame { x, y, width, height }
    }

    /// The same box shrunk by `by` on every side.
    pub fn inset(&self, by: f64) -> Frame {
        Frame {
            x: self.x + by,
            y: self.y + by,
            width: (self.width - 2.0 * by).max(0.0),
            height: (self.height - 2.0 * by).max(0.0),
        }
    }
}

/// Minimal primitives a paginated document has to offer.
pub trait FlowBackend {
    /// Page width and height.
    fn page_size(&self) -> (f64, f64);

    fn new_page(&mut self) -> Result<(), RenderError>;

    /// Width of `text` set in `font`.
    fn text_width(&self, text: &str, font: Font) -> f64;

    /// Draws one line of text, vertically centred in `frame` and aligned horizontally.
    fn draw_text(
        &mut self,
        text: &str,
        frame: Frame,
        align: TextAlign,
        font: Font,
    ) -> Result<(), RenderError>;

    fn draw_rect(&mut self, frame: Frame, fill: Option<Color>, stroke: bool)
        -> Result<(), RenderError>;

    /// Breaks text into lines no wider than `width`.
    fn wrap_text(&self, text: &str, width: f64, font: Font) -> Vec<String> {
        wrap_lines(text, width, |s| self.text_width(s, font))
    }

    /// Number of lines `text` needs at `width`. Always at least one.
    fn line_count(&self, text: &str, width: f64, font: Font) -> usize {
        self.wrap_text(text, width, font).len().max(1)
    }
}

/// Greedy word wrap. Explicit newlines always break; a word wider than the
/// line is split between characters.
pub fn wrap_lines(text: &str, width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if measure(&candidate) <= width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if measure(word) <= width {
                line = word.to_string();
                continue;
            }
            for ch in word.chars() {
                line.push(ch);
                if measure(&line) > width && line.chars().count() > 1 {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(ch);
                }
            }
        }
        lines.push(line);
    }
    lines
}
