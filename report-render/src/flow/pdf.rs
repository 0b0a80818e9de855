//! FILENAME: report-render/src/flow/pdf.rs
//! PURPOSE: `FlowBackend` that assembles a PDF document in memory.
//! CONTEXT: One content stream per page, built as the renderer draws and
//! deflated on `into_bytes`. Text uses the three non-embedded Helvetica faces
//! with WinAnsi encoding, so there is nothing to subset or embed.

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use report_core::{Color, TextAlign};
use report_template::Orientation;

use super::metrics::{encode_win_ansi, text_width_pt};
use super::{FlowBackend, Font, FontStyle, Frame};
use crate::error::RenderError;

const A4_SHORT_MM: f64 = 210.0;
const A4_LONG_MM: f64 = 297.0;
const PT_PER_MM: f64 = 72.0 / 25.4;
const LINE_WIDTH_MM: f64 = 0.2;
/// Half the cap height of Helvetica, as a fraction of the font size.
const BASELINE_SHIFT: f64 = 0.35;

/// Resource name and base font of every face a page may use.
const FACES: [(&[u8], &str); 3] = [
    (b"F1", "Helvetica"),
    (b"F2", "Helvetica-Bold"),
    (b"F3", "Helvetica-Oblique"),
];

fn resource_name(style: FontStyle) -> &'static [u8] {
    match style {
        FontStyle::Regular => b"F1",
        FontStyle::Bold => b"F2",
        FontStyle::Italic => b"F3",
    }
}

fn pt(mm: f64) -> f32 {
    (mm * PT_PER_MM) as f32
}

pub struct PdfFlowBackend {
    page_width: f64,
    page_height: f64,
    pages: Vec<Content>,
    title: Option<String>,
}

impl PdfFlowBackend {
    /// An A4 document in the given orientation.
    pub fn new(orientation: Orientation) -> Self {
        let (width, height) = match orientation {
            Orientation::Portrait => (A4_SHORT_MM, A4_LONG_MM),
            Orientation::Landscape => (A4_LONG_MM, A4_SHORT_MM),
        };
        Self::with_page_size(width, height)
    }

    pub fn with_page_size(width: f64, height: f64) -> Self {
        PdfFlowBackend {
            page_width: width,
            page_height: height,
            pages: Vec::new(),
            title: None,
        }
    }

    /// Document title written to the info dictionary.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current(&mut self) -> Result<&mut Content, RenderError> {
        self.pages
            .last_mut()
            .ok_or_else(|| RenderError::Pdf("no page has been started".to_string()))
    }

    /// Converts a top-down millimetre y coordinate to PDF user space.
    fn flip_y(&self, y_mm: f64) -> f32 {
        pt(self.page_height - y_mm)
    }

    /// Assembles the document. An untouched backend yields a single blank page.
    pub fn into_bytes(self) -> Result<Vec<u8>, RenderError> {
        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let font_ids: Vec<(&[u8], Ref)> = FACES
            .iter()
            .map(|(resource, base)| {
                let id = alloc();
                pdf.type1_font(id)
                    .base_font(Name(base.as_bytes()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                (*resource, id)
            })
            .collect();

        let contents = if self.pages.is_empty() {
            vec![Content::new()]
        } else {
            self.pages
        };
        let page_ids: Vec<Ref> = contents.iter().map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = contents.iter().map(|_| alloc()).collect();

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        let media_box = Rect::new(0.0, 0.0, pt(self.page_width), pt(self.page_height));
        for (i, content) in contents.into_iter().enumerate() {
            let raw = content.finish();
            let compressed = compress_to_vec_zlib(raw.as_slice(), 6);
            pdf.stream(content_ids[i], &compressed)
                .filter(Filter::FlateDecode);

            let mut page = pdf.page(page_ids[i]);
            page.media_box(media_box)
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            for (resource, id) in &font_ids {
                fonts.pair(Name(*resource), *id);
            }
        }

        if let Some(title) = &self.title {
            let info_id = alloc();
            pdf.document_info(info_id).title(TextStr(title.as_str()));
        }

        Ok(pdf.finish())
    }
}

impl FlowBackend for PdfFlowBackend {
    fn page_size(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }

    fn new_page(&mut self) -> Result<(), RenderError> {
        let mut content = Content::new();
        content.set_line_width(pt(LINE_WIDTH_MM));
        self.pages.push(content);
        Ok(())
    }

    fn text_width(&self, text: &str, font: Font) -> f64 {
        text_width_pt(text, font.style, font.size) / PT_PER_MM
    }

    fn draw_text(
        &mut self,
        text: &str,
        frame: Frame,
        align: TextAlign,
        font: Font,
    ) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        let width = self.text_width(text, font);
        let x = match align {
            TextAlign::Left => frame.x,
            TextAlign::Center => frame.x + (frame.width - width) / 2.0,
            TextAlign::Right => frame.x + frame.width - width,
        };
        let size_mm = font.size / PT_PER_MM;
        let baseline = self.flip_y(frame.y + frame.height / 2.0 + size_mm * BASELINE_SHIFT);
        let bytes = encode_win_ansi(text);

        let content = self.current()?;
        content
            .set_fill_gray(0.0)
            .begin_text()
            .set_font(Name(resource_name(font.style)), font.size as f32)
            .next_line(pt(x), baseline)
            .show(Str(&bytes))
            .end_text();
        Ok(())
    }

    fn draw_rect(&mut self, frame: Frame, fill: Option<Color>, stroke: bool) -> Result<(), RenderError> {
        let bottom = self.flip_y(frame.y + frame.height);
        let content = self.current()?;
        content.save_state();
        if let Some(color) = fill {
            content.set_fill_rgb(
                f32::from(color.r) / 255.0,
                f32::from(color.g) / 255.0,
                f32::from(color.b) / 255.0,
            );
        }
        content.rect(pt(frame.x), bottom, pt(frame.width), pt(frame.height));
        match (fill.is_some(), stroke) {
            (true, true) => content.fill_nonzero_and_stroke(),
            (true, false) => content.fill_nonzero(),
            (false, true) => content.stroke(),
            (false, false) => content.end_path(),
        };
        content.restore_state();
        Ok(())
    }
}
