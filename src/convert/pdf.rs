//! Minimal text-only PDF writer on top of `lopdf`.
//!
//! Text is set in the standard Type1 fonts with `WinAnsiEncoding`, so every
//! character is reduced to one byte of that encoding before it is written.
//! Characters the encoding cannot represent become `?`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

use crate::config::DocumentConfig;
use crate::error::{FileConError, Result};

/// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;

/// Replacement byte for characters outside the page encoding
const REPLACEMENT: u8 = b'?';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfFont {
    Regular,
    Bold,
    Monospace,
}

impl PdfFont {
    fn resource_name(&self) -> &'static str {
        match self {
            PdfFont::Regular => "F1",
            PdfFont::Bold => "F2",
            PdfFont::Monospace => "F3",
        }
    }

    fn base_font(&self) -> &'static str {
        match self {
            PdfFont::Regular => "Helvetica",
            PdfFont::Bold => "Helvetica-Bold",
            PdfFont::Monospace => "Courier",
        }
    }

    /// Average glyph advance as a fraction of the font size
    fn average_width(&self) -> f32 {
        match self {
            PdfFont::Regular => 0.5,
            PdfFont::Bold => 0.55,
            PdfFont::Monospace => 0.6,
        }
    }
}

/// One paragraph-like run of text sharing a font and size
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub font: PdfFont,
    /// Size relative to the body font size
    pub scale: f32,
}

impl TextBlock {
    pub fn body<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            font: PdfFont::Regular,
            scale: 1.0,
        }
    }

    pub fn heading<S: Into<String>>(text: S, scale: f32) -> Self {
        Self {
            text: text.into(),
            font: PdfFont::Bold,
            scale,
        }
    }

    pub fn code<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            font: PdfFont::Monospace,
            scale: 0.9,
        }
    }

    pub fn blank() -> Self {
        Self::body("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub margin: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::from(&DocumentConfig::default())
    }
}

impl From<&DocumentConfig> for PageLayout {
    fn from(config: &DocumentConfig) -> Self {
        Self {
            font_size: config.font_size.max(1.0),
            line_height: config.line_height.max(config.font_size.max(1.0)),
            margin: config.margin.clamp(0.0, PAGE_WIDTH / 4.0),
        }
    }
}

/// A positioned line of already-encoded text
struct PlacedLine {
    bytes: Vec<u8>,
    font: PdfFont,
    size: f32,
    y: f32,
}

/// Encode `text` as WinAnsi bytes, replacing unrepresentable characters
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u8,
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => REPLACEMENT,
        })
        .collect()
}

/// Split `text` into lines of at most `max_chars` characters, breaking on
/// whitespace and hard-splitting words longer than a line
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { word.len() + 1 };
        if current_len + needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lay `blocks` out on A4 pages, returning the lines of each page
fn paginate(blocks: &[TextBlock], layout: &PageLayout) -> Vec<Vec<PlacedLine>> {
    let usable_width = PAGE_WIDTH - 2.0 * layout.margin;
    let top = PAGE_HEIGHT - layout.margin;
    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut y = top;

    for block in blocks {
        let size = layout.font_size * block.scale;
        let advance = layout.line_height * block.scale;
        let max_chars = (usable_width / (size * block.font.average_width())).floor() as usize;
        let text = block.text.replace('\t', "    ");

        for line in wrap_text(&text, max_chars) {
            if y - advance < layout.margin {
                pages.push(Vec::new());
                y = top;
            }
            y -= advance;
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    bytes: encode_win_ansi(&line),
                    font: block.font,
                    size,
                    y,
                });
            }
        }
    }

    pages
}

fn page_content(lines: &[PlacedLine], layout: &PageLayout) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    for line in lines.iter().filter(|line| !line.bytes.is_empty()) {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![line.font.resource_name().into(), line.size.into()],
        ));
        operations.push(Operation::new("Td", vec![layout.margin.into(), line.y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.bytes.clone())]));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Render `blocks` into a PDF at `output_path`
pub fn write_pdf(blocks: &[TextBlock], layout: &PageLayout, output_path: &Path) -> Result<usize> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for font in [PdfFont::Regular, PdfFont::Bold, PdfFont::Monospace] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let pages = paginate(blocks, layout);
    let mut kids = Vec::with_capacity(pages.len());
    for lines in &pages {
        let content = page_content(lines, layout)
            .encode()
            .map_err(|e| FileConError::Document(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), (PAGE_WIDTH as i64).into(), (PAGE_HEIGHT as i64).into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(output_path)
        .map_err(|e| FileConError::Document(format!("Failed to write PDF: {}", e)))?;

    Ok(page_count)
}
