//! Markdown brief to PDF rendering.
//!
//! Only the handful of constructs a brief uses are recognised: headings,
//! a `Generated:` line, bullets, paragraphs with inline `**bold**`, blank
//! lines and dash-only horizontal rules. Text is set in the standard
//! Helvetica faces with WinAnsi encoding.

use crate::error::{EvrikaError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN_LEFT: f32 = 50.0;
const MARGIN_RIGHT: f32 = 50.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 60.0;
const MAX_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
const BASE_LINE_HEIGHT: f32 = 14.0;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// Advance width of one character in thousandths of the font size.
    fn char_width(self, c: char) -> u16 {
        let table = match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match c {
            ' '..='~' => table[c as usize - 32],
            '–' => 556,
            '—' | '…' => 1000,
            '“' | '”' => if self == Font::Bold { 500 } else { 333 },
            '‘' | '’' => if self == Font::Bold { 278 } else { 222 },
            '•' => 350,
            _ => 556,
        }
    }

    fn text_width(self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c) as f32).sum::<f32>() * size / 1000.0
    }
}

/// Encode text for a WinAnsi simple font; unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '–' => 0x96,
            '—' => 0x97,
            '“' => 0x93,
            '”' => 0x94,
            '‘' => 0x91,
            '’' => 0x92,
            '…' => 0x85,
            '•' => 0x95,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn line_height(size: f32) -> f32 {
    (size * 1.4).trunc()
}

fn is_rule(line: &str) -> bool {
    line.chars().count() >= 3 && line.chars().all(|c| matches!(c, '-' | '–' | '—'))
}

/// Page-by-page layout state.
struct Layout {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // pages is never empty
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
        if self.y < MARGIN_BOTTOM {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN_TOP;
        }
    }

    fn text_at(&mut self, x: f32, text: &str, font: Font, size: f32) {
        let y = self.y;
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource_name().as_bytes().to_vec()), Object::Real(size)],
        ));
        ops.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    /// Draw one line, switching to bold between `**` markers.
    fn draw_line(&mut self, line: &str, font: Font, size: f32, inline_bold: bool) {
        if !inline_bold || !line.contains("**") {
            self.text_at(MARGIN_LEFT, line, font, size);
            return;
        }

        let mut x = MARGIN_LEFT;
        let mut bold = false;
        for part in line.split("**") {
            if !part.is_empty() {
                let face = if bold { Font::Bold } else { font };
                self.text_at(x, part, face, size);
                x += face.text_width(part, size);
            }
            bold = !bold;
        }
    }

    /// Word-wrap `text` between the margins, then leave `space_after`.
    fn draw_wrapped(&mut self, text: &str, font: Font, size: f32, space_after: f32, inline_bold: bool) {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return;
        }

        let step = line_height(size);
        let mut line = String::new();

        for word in words {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };

            if font.text_width(&candidate, size) <= MAX_WIDTH || line.is_empty() {
                line = candidate;
            } else {
                self.draw_line(&line, font, size, inline_bold);
                self.advance(step);
                line = word.to_string();
            }
        }

        if !line.is_empty() {
            self.draw_line(&line, font, size, inline_bold);
            self.advance(step);
        }

        self.y -= space_after;
    }

    fn rule(&mut self) {
        self.advance(BASE_LINE_HEIGHT * 0.5);
        let y = self.y;
        let ops = self.ops();
        ops.push(Operation::new("w", vec![Object::Real(0.75)]));
        ops.push(Operation::new("m", vec![Object::Real(MARGIN_LEFT), Object::Real(y)]));
        ops.push(Operation::new(
            "l",
            vec![Object::Real(PAGE_WIDTH - MARGIN_RIGHT), Object::Real(y)],
        ));
        ops.push(Operation::new("S", vec![]));
        self.advance(BASE_LINE_HEIGHT);
    }
}

fn layout(markdown: &str) -> Layout {
    let mut layout = Layout::new();
    let mut title_done = false;

    for raw_line in markdown.split('\n') {
        let stripped = raw_line.trim();

        if stripped.is_empty() {
            layout.advance(BASE_LINE_HEIGHT * 0.75);
            continue;
        }

        if is_rule(stripped) {
            layout.rule();
            continue;
        }

        if stripped.starts_with('#') {
            let heading = stripped.trim_start_matches('#').trim();
            if !title_done {
                layout.draw_wrapped(heading, Font::Bold, 18.0, BASE_LINE_HEIGHT, false);
                title_done = true;
            } else {
                layout.advance(BASE_LINE_HEIGHT * 1.25);
                layout.draw_wrapped(heading, Font::Bold, 14.0, BASE_LINE_HEIGHT * 0.75, false);
            }
            continue;
        }

        if stripped.starts_with("Generated:") {
            layout.draw_wrapped(raw_line, Font::Regular, 10.0, BASE_LINE_HEIGHT, false);
            continue;
        }

        let space_after = if stripped.starts_with("- ") { 0.3 } else { 0.5 };
        layout.draw_wrapped(raw_line, Font::Regular, 12.0, BASE_LINE_HEIGHT * space_after, true);
    }

    layout
}

fn font_object(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Render a Markdown brief into PDF bytes.
pub fn render_pdf(markdown: &str) -> Result<Vec<u8>> {
    let layout = layout(markdown);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = font_object(&mut doc, "Helvetica");
    let bold = font_object(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for operations in layout.pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| EvrikaError::Pdf(format!("Failed to encode page: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| EvrikaError::Pdf(format!("Failed to write document: {}", e)))?;

    debug!("Rendered {} page(s), {} bytes", page_count, bytes.len());
    Ok(bytes)
}

/// Final component of a requested file name, if it has one.
///
/// Directory parts are dropped so the file always lands in the output dir.
pub fn pdf_file_name(filename: &str) -> Option<String> {
    Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
}

/// Render a brief and write it to `dir/<file name of filename>`.
pub fn save_brief_pdf(markdown: &str, dir: &Path, filename: &str) -> Result<PathBuf> {
    let name = pdf_file_name(filename).ok_or_else(|| {
        EvrikaError::InvalidInput(format!("Not a usable PDF file name: {:?}", filename))
    })?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, render_pdf(markdown)?)?;
    info!("Saved brief PDF to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Evrika Brief - Test (Speaker)\n\nGenerated: 2024-01-01 10:00\n\n\
                          ## The Main Idea\n\nA **bold** claim – with “quotes”.\n\n---\n\n\
                          - first bullet\n- second bullet\n";

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render_pdf(SAMPLE).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_text_breaks_pages() {
        let paragraph = "word ".repeat(400);
        let markdown = format!("# Title\n\n{}", vec![paragraph; 6].join("\n\n"));

        let bytes = render_pdf(&markdown).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn test_empty_markdown_still_renders() {
        let bytes = render_pdf("").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_rule_detection() {
        assert!(is_rule("---"));
        assert!(is_rule("—–-"));
        assert!(!is_rule("--"));
        assert!(!is_rule("- a"));
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("a–b"), vec![b'a', 0x96, b'b']);
        assert_eq!(encode_win_ansi("é"), vec![0xE9]);
        assert_eq!(encode_win_ansi("漢"), vec![b'?']);
    }

    #[test]
    fn test_text_width() {
        // "Hi" in Helvetica: 722 + 222
        assert!((Font::Regular.text_width("Hi", 10.0) - 9.44).abs() < 1e-4);
        assert!(Font::Bold.text_width("Hi", 10.0) > Font::Regular.text_width("Hi", 10.0));
    }

    #[test]
    fn test_save_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_brief_pdf(SAMPLE, dir.path(), "brief.pdf").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_stays_inside_dir() {
        let root = tempfile::tempdir().unwrap();
        let briefs = root.path().join("briefs");

        let path = save_brief_pdf(SAMPLE, &briefs, "../escape.pdf").unwrap();
        assert_eq!(path, briefs.join("escape.pdf"));
        assert!(!root.path().join("escape.pdf").exists());

        let outside = root.path().join("abs.pdf");
        let path = save_brief_pdf(SAMPLE, &briefs, outside.to_str().unwrap()).unwrap();
        assert_eq!(path, briefs.join("abs.pdf"));
        assert!(!outside.exists());
    }

    #[test]
    fn test_unusable_file_names() {
        assert_eq!(pdf_file_name("a/b/c.pdf").as_deref(), Some("c.pdf"));
        assert_eq!(pdf_file_name(".."), None);
        assert_eq!(pdf_file_name("/"), None);
        assert_eq!(pdf_file_name("   "), None);

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            save_brief_pdf(SAMPLE, dir.path(), ".."),
            Err(EvrikaError::InvalidInput(_))
        ));
    }
}
