use async_trait::async_trait;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

use super::pdf::{write_pdf, PageLayout, TextBlock};
use super::{dotted_extension, ensure_input, run_blocking, Converter, StagedOutput};
use crate::category::MediaCategory;
use crate::error::{FileConError, Result};
use crate::options::ConversionOptions;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").unwrap());
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([-*_])(\s*[-*_]){2,}\s*$").unwrap());
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static STRONG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\*\*|__)(.+?)(\*\*|__)").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\s][^*]*)\*").unwrap());
// Intraword underscores (snake_case) are not emphasis
static UNDERSCORE_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_([^_\s](?:[^_]*[^_\s])?)_\b").unwrap());
static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

static DOCX_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>").unwrap());
static DOCX_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>|<w:br\s*/>").unwrap());

const HEADING_SCALES: [f32; 6] = [2.0, 1.5, 1.3, 1.15, 1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceKind {
    Text,
    Markdown,
    Docx,
}

/// Text, Markdown and Word documents to PDF
pub struct DocumentConverter {
    layout: PageLayout,
}

impl DocumentConverter {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new(PageLayout::default())
    }
}

#[async_trait]
impl Converter for DocumentConverter {
    fn category(&self) -> MediaCategory {
        MediaCategory::Documents
    }

    async fn convert(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &ConversionOptions,
    ) -> Result<()> {
        ensure_input(input_path)?;

        let source = dotted_extension(input_path);
        let target = options.target_format(MediaCategory::Documents);
        let kind = match (source.as_str(), target.as_str()) {
            (".txt", "pdf") => SourceKind::Text,
            (".md", "pdf") => SourceKind::Markdown,
            (".docx", "pdf") => SourceKind::Docx,
            _ => {
                return Err(FileConError::UnsupportedConversion {
                    from: source,
                    to: target,
                })
            }
        };

        let layout = self.layout;
        let staged = StagedOutput::new(input_path, output_path)?;
        let input: PathBuf = input_path.to_path_buf();
        let staging: PathBuf = staged.path().to_path_buf();
        let pages = run_blocking(move || {
            let blocks = match kind {
                SourceKind::Text => text_blocks(&std::fs::read_to_string(&input)?),
                SourceKind::Markdown => markdown_blocks(&std::fs::read_to_string(&input)?),
                SourceKind::Docx => docx_blocks(&input)?,
            };
            write_pdf(&blocks, &layout, &staging)
        })
        .await?;
        staged.commit()?;

        info!("Wrote {} page(s) to {}", pages, output_path.display());
        Ok(())
    }
}

/// One body block per source line
fn text_blocks(content: &str) -> Vec<TextBlock> {
    content.lines().map(TextBlock::body).collect()
}

/// Block-level Markdown: headings, lists, rules, fenced code and paragraphs.
/// Inline markup is reduced to its text.
fn markdown_blocks(content: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut in_code = false;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
            continue;
        }
        if in_code {
            blocks.push(TextBlock::code(line));
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            let level = caps[1].len();
            blocks.push(TextBlock::heading(strip_inline(&caps[2]), HEADING_SCALES[level - 1]));
        } else if RULE.is_match(line) {
            blocks.push(TextBlock::blank());
        } else if let Some(caps) = BULLET.captures(line) {
            let indent = " ".repeat(caps[1].len());
            blocks.push(TextBlock::body(format!("{}\u{2022} {}", indent, strip_inline(&caps[2]))));
        } else if let Some(quote) = line.trim_start().strip_prefix('>') {
            blocks.push(TextBlock::body(strip_inline(quote.trim_start())));
        } else {
            blocks.push(TextBlock::body(strip_inline(line)));
        }
    }

    blocks
}

fn strip_inline(text: &str) -> String {
    let text = IMAGE.replace_all(text, "$1");
    let text = LINK.replace_all(&text, "$1 ($2)");
    let text = STRONG.replace_all(&text, "$2");
    let text = EMPHASIS.replace_all(&text, "$1");
    let text = UNDERSCORE_EMPHASIS.replace_all(&text, "$1");
    CODE_SPAN.replace_all(&text, "$1").into_owned()
}

/// Paragraph text of `word/document.xml`
fn docx_blocks(path: &Path) -> Result<Vec<TextBlock>> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| FileConError::Document(format!("Not a Word document: {}", e)))?
        .read_to_string(&mut xml)?;

    Ok(docx_paragraphs(&xml).into_iter().map(TextBlock::body).collect())
}

fn docx_paragraphs(xml: &str) -> Vec<String> {
    DOCX_PARAGRAPH
        .captures_iter(xml)
        .map(|paragraph| {
            let body = paragraph.get(1).map(|m| m.as_str()).unwrap_or("");
            let mut text = String::new();
            for run in DOCX_RUN.captures_iter(body) {
                match run.get(1) {
                    Some(t) => text.push_str(&unescape_xml(t.as_str())),
                    None if run[0].starts_with("<w:tab") => text.push('\t'),
                    None => text.push(' '),
                }
            }
            text
        })
        .collect()
}

fn unescape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };

        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16).ok())
                .unwrap_or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    out
}
