//! Generated text pages: name banners and summary tables
//!
//! Pages are A4 portrait and drawn with the standard Helvetica fonts, so
//! nothing has to be embedded.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::pdf::classify::{Rect, A4_POINTS};

const BANNER_FONT_SIZE: f32 = 32.0;
const TITLE_FONT_SIZE: f32 = 24.0;
const BODY_FONT_SIZE: f32 = 12.0;
const MARGIN: f32 = 60.0;
const ROW_HEIGHT: f32 = 18.0;

/// Font objects shared by all generated pages of one document
#[derive(Debug, Clone, Copy)]
pub struct StandardFonts {
    regular: ObjectId,
    bold: ObjectId,
}

impl StandardFonts {
    /// Add Helvetica and Helvetica-Bold (two of the 14 standard PDF fonts)
    pub fn add_to(doc: &mut Document) -> Self {
        let font = |base: &[u8]| {
            let mut font = Dictionary::new();
            font.set("Type", Object::Name(b"Font".to_vec()));
            font.set("Subtype", Object::Name(b"Type1".to_vec()));
            font.set("BaseFont", Object::Name(base.to_vec()));
            font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
            font
        };
        let regular = doc.add_object(Object::Dictionary(font(b"Helvetica")));
        let bold = doc.add_object(Object::Dictionary(font(b"Helvetica-Bold")));
        Self { regular, bold }
    }

    fn resources(&self) -> Dictionary {
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(self.regular));
        fonts.set("F2", Object::Reference(self.bold));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        resources
    }
}

/// Add an A4 page drawing `content` and return the page dictionary
///
/// The caller sets `/Parent` when it links the page into a page tree.
pub fn text_page(doc: &mut Document, fonts: &StandardFonts, content: String) -> Dictionary {
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let (width, height) = A4_POINTS;
    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("MediaBox", Rect { x0: 0.0, y0: 0.0, x1: width, y1: height }.to_object());
    page.set("Resources", Object::Dictionary(fonts.resources()));
    page.set("Contents", Object::Reference(content_id));
    page
}

/// Content stream for a page with one large centred line
pub fn banner_content(text: &str) -> String {
    let (width, height) = A4_POINTS;
    let mut content = String::from("0 g\n");
    push_text(&mut content, "F2", BANNER_FONT_SIZE, centred_x(text, BANNER_FONT_SIZE, width), height / 2.0, text);
    content
}

/// Content streams for a titled two-column table, split across as many pages
/// as the rows need
///
/// `notes` are printed after the last row.
pub fn table_content(
    title: &str,
    header: (&str, &str),
    rows: &[(String, String)],
    notes: &[String],
) -> Vec<String> {
    let (width, height) = A4_POINTS;
    let top = height - MARGIN - TITLE_FONT_SIZE - 2.0 * ROW_HEIGHT;
    let rows_per_page = ((top - MARGIN) / ROW_HEIGHT).floor().max(1.0) as usize;
    let second_column = width - MARGIN - 120.0;

    let mut pages = Vec::new();
    let mut chunks: Vec<&[(String, String)]> = rows.chunks(rows_per_page).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }
    let last = chunks.len() - 1;

    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut content = String::from("0 g\n");
        push_text(&mut content, "F2", TITLE_FONT_SIZE, centred_x(title, TITLE_FONT_SIZE, width), height - MARGIN - TITLE_FONT_SIZE, title);

        let mut y = top;
        push_text(&mut content, "F2", BODY_FONT_SIZE, MARGIN, y, header.0);
        push_text(&mut content, "F2", BODY_FONT_SIZE, second_column, y, header.1);
        // Rule under the header
        content.push_str(&format!("0.5 w {} {} m {} {} l S\n", MARGIN, y - 4.0, width - MARGIN, y - 4.0));

        for (left, right) in chunk {
            y -= ROW_HEIGHT;
            push_text(&mut content, "F1", BODY_FONT_SIZE, MARGIN, y, left);
            push_text(&mut content, "F1", BODY_FONT_SIZE, second_column, y, right);
        }

        if i == last {
            y -= ROW_HEIGHT;
            for note in notes {
                for line in wrap(note, width - 2.0 * MARGIN, BODY_FONT_SIZE) {
                    y -= ROW_HEIGHT;
                    push_text(&mut content, "F2", BODY_FONT_SIZE, MARGIN, y, &line);
                }
            }
        }
        pages.push(content);
    }

    pages
}

fn push_text(content: &mut String, font: &str, size: f32, x: f32, y: f32, text: &str) {
    content.push_str("BT\n");
    content.push_str(&format!("/{} {} Tf\n", font, size));
    content.push_str(&format!("1 0 0 1 {:.2} {:.2} Tm\n", x, y));
    content.push_str(&format!("({}) Tj\n", escape_pdf_string(text)));
    content.push_str("ET\n");
}

fn centred_x(text: &str, size: f32, page_width: f32) -> f32 {
    ((page_width - estimate_text_width(text, size)) / 2.0).max(MARGIN / 2.0)
}

/// Greedy word wrap using the width estimate
fn wrap(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if !current.is_empty() && estimate_text_width(&candidate, size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escape special characters in PDF strings and map text to WinAnsi
///
/// Latin-1 characters (umlauts, accents) are written as octal escapes;
/// anything outside that range becomes `?`.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\r' | '\n' => out.push(' '),
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

/// Estimate text width for Helvetica
fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    // Average Helvetica glyph is a little over half an em
    text.chars().count() as f32 * font_size * 0.55
}
