//! FILENAME: report-core/src/style.rs
//! PURPOSE: Resolved cell style shared by the template model and both backends.
//! CONTEXT: Templates declare named styles; by the time a renderer sees them they
//! are plain `CellStyle` values. Every field is optional so styles can be layered
//! (column style over header style over backend defaults) with `overlay`.

use serde::{Deserialize, Serialize};

/// Horizontal alignment. Absent alignment means numbers right, text left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Some(TextAlign::Left),
            "center" | "centre" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            _ => None,
        }
    }

    /// Default alignment for a value: numeric right, everything else left.
    pub fn auto(numeric: bool) -> Self {
        if numeric {
            TextAlign::Right
        } else {
            TextAlign::Left
        }
    }
}

/// Border line weight drawn around all four edges of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderWeight {
    Thin,
    Medium,
}

impl BorderWeight {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "thin" => Some(BorderWeight::Thin),
            "medium" | "thick" => Some(BorderWeight::Medium),
            _ => None,
        }
    }
}

/// RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub const fn black() -> Self {
        Color::new(0, 0, 0)
    }

    /// Parse from hex string ("#FF0000", "FF0000", or "FFFF0000" with a leading alpha byte).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let hex = match hex.len() {
            6 => hex,
            8 => hex.get(2..)?,
            _ => return None,
        };
        let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
        let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
        let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
        Some(Color::new(r, g, b))
    }

    /// Packed 0xRRGGBB, the form the spreadsheet writer takes.
    pub fn to_rgb_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// A cell style. `None` means "inherit / backend default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub font_size: Option<f64>,
    pub font_color: Option<Color>,
    pub fill: Option<Color>,
    pub border: Option<BorderWeight>,
    pub align: Option<TextAlign>,
    pub wrap_text: Option<bool>,
    /// Spreadsheet number format code, e.g. `£#,##0.00`.
    pub number_format: Option<String>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_border(mut self, border: BorderWeight) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = Some(align);
        self
    }

    pub fn with_number_format(mut self, code: impl Into<String>) -> Self {
        self.number_format = Some(code.into());
        self
    }

    /// Returns `self` with every field that `top` sets replaced by `top`'s value.
    pub fn overlay(&self, top: &CellStyle) -> CellStyle {
        CellStyle {
            bold: top.bold.or(self.bold),
            italic: top.italic.or(self.italic),
            font_size: top.font_size.or(self.font_size),
            font_color: top.font_color.or(self.font_color),
            fill: top.fill.or(self.fill),
            border: top.border.or(self.border),
            align: top.align.or(self.align),
            wrap_text: top.wrap_text.or(self.wrap_text),
            number_format: top
                .number_format
                .clone()
                .or_else(|| self.number_format.clone()),
        }
    }

    pub fn is_bold(&self) -> bool {
        self.bold.unwrap_or(false)
    }

    pub fn is_default(&self) -> bool {
        *self == CellStyle::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#B2B2B2"), Some(Color::new(178, 178, 178)));
        assert_eq!(Color::from_hex("FFFF0000"), Some(Color::new(255, 0, 0)));
        assert_eq!(Color::from_hex("red"), None);
        assert_eq!(Color::new(0x12, 0x34, 0x56).to_rgb_u32(), 0x123456);
    }

    #[test]
    fn test_overlay_prefers_top() {
        let base = CellStyle::new()
            .with_bold(true)
            .with_fill(Color::new(178, 178, 178))
            .with_number_format("#,##0");
        let top = CellStyle::new().with_bold(false).with_align(TextAlign::Right);

        let merged = base.overlay(&top);
        assert_eq!(merged.bold, Some(false));
        assert_eq!(merged.align, Some(TextAlign::Right));
        assert_eq!(merged.fill, Some(Color::new(178, 178, 178)));
        assert_eq!(merged.number_format.as_deref(), Some("#,##0"));
    }

    #[test]
    fn test_alignment_names() {
        assert_eq!(TextAlign::from_name("Centre"), Some(TextAlign::Center));
        assert_eq!(TextAlign::from_name("justify"), None);
        assert_eq!(TextAlign::auto(true), TextAlign::Right);
        assert_eq!(BorderWeight::from_name("medium"), Some(BorderWeight::Medium));
    }
}
