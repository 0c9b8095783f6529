//! PDF layout source built on `lopdf`.
//!
//! Walks each page's content stream and reports one [`TextFragment`] per
//! text-showing operator, positioned with the text matrix combined with the
//! current transformation matrix. Strings are decoded through the encoding of
//! the font selected by `Tf`; without a usable font encoding they fall back to
//! UTF-16BE when they carry a BOM and byte-per-char otherwise.
//!
//! Glyph widths are estimated rather than read from the font, so the text
//! matrix advance after a show operator is approximate. It is only used to
//! tell consecutive runs on one line apart.

use super::layout::{PageLayout, TextFragment};
use crate::{AttachmentSearchError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Encoding, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `TJ` adjustments at or below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f64 = -200.0;

/// Advance per shown character, in ems.
const ESTIMATED_GLYPH_WIDTH: f64 = 0.5;

/// Source of page layouts for a document on disk.
pub trait LayoutSource: Send + Sync {
    /// Load every page of the document at `path`.
    fn load_pages(&self, path: &Path) -> Result<Vec<PageLayout>>;
}

/// Reads page layouts out of PDF content streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLayoutSource;

impl LayoutSource for PdfLayoutSource {
    fn load_pages(&self, path: &Path) -> Result<Vec<PageLayout>> {
        let document = Document::load(path).map_err(|e| {
            AttachmentSearchError::extraction(path.display().to_string(), e.to_string())
        })?;
        Ok(layout_pages(&document))
    }
}

/// Extract the fragments of every page of a loaded document.
///
/// A page whose content cannot be decoded is reported with no fragments.
pub fn layout_pages(document: &Document) -> Vec<PageLayout> {
    document
        .get_pages()
        .into_iter()
        .map(|(number, page_id)| {
            let fonts = PageFonts::load(document, page_id);
            let fragments = document
                .get_page_content(page_id)
                .and_then(|data| Content::decode(&data))
                .map(|content| fragments_from_operations(&content.operations, &fonts))
                .unwrap_or_else(|e| {
                    warn!("Skipping unreadable page {}: {}", number, e);
                    Vec::new()
                });
            debug!("Page {}: {} text fragments", number, fragments.len());
            PageLayout::new(number, fragments)
        })
        .collect()
}

/// Text encodings of the fonts in a page's resources, keyed by resource name.
#[derive(Default)]
pub struct PageFonts<'a> {
    encodings: BTreeMap<Vec<u8>, Encoding<'a>>,
}

impl<'a> PageFonts<'a> {
    /// Resolve the encoding of every font the page can select.
    ///
    /// Fonts whose encoding cannot be resolved are left out and their strings
    /// use the fallback decoder.
    pub fn load(document: &'a Document, page_id: ObjectId) -> Self {
        let fonts = match document.get_page_fonts(page_id) {
            Ok(fonts) => fonts,
            Err(e) => {
                debug!("No fonts for page {:?}: {}", page_id, e);
                return Self::default();
            }
        };

        let encodings = fonts
            .into_iter()
            .filter(|(_, font)| font.type_is(b"Font"))
            .filter_map(|(name, font)| match font.get_font_encoding(document) {
                Ok(encoding) => Some((name, encoding)),
                Err(e) => {
                    debug!(
                        "Font {} has no usable encoding: {}",
                        String::from_utf8_lossy(&name),
                        e
                    );
                    None
                }
            })
            .collect();

        Self { encodings }
    }

    fn decode(&self, font: Option<&[u8]>, bytes: &[u8]) -> String {
        font.and_then(|name| self.encodings.get(name))
            .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
            .unwrap_or_else(|| decode_pdf_string(bytes))
    }
}

fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f64; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(out)
}

/// Decode a PDF string operand without font information.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Text drawn by one show operator and its advance in ems.
struct ShownText {
    text: String,
    advance: f64,
}

/// Graphics state saved by `q`.
#[derive(Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
}

/// Text and graphics state needed to position text runs.
struct TextState {
    graphics: GraphicsState,
    saved: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    leading: f64,
}

impl TextState {
    fn new() -> Self {
        Self {
            graphics: GraphicsState {
                ctm: IDENTITY,
                font: None,
                font_size: 1.0,
            },
            saved: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn shown_text(&self, operand: &Object, fonts: &PageFonts) -> ShownText {
        let font = self.graphics.font.as_deref();
        let mut shown = ShownText {
            text: String::new(),
            advance: 0.0,
        };
        let push = |shown: &mut ShownText, bytes: &[u8]| {
            let decoded = fonts.decode(font, bytes);
            shown.advance += decoded.chars().count() as f64 * ESTIMATED_GLYPH_WIDTH;
            shown.text.push_str(&decoded);
        };

        match operand {
            Object::String(bytes, _) => push(&mut shown, bytes),
            Object::Array(items) => {
                for item in items {
                    match item {
                        Object::String(bytes, _) => push(&mut shown, bytes),
                        other => {
                            let Some(adjust) = number(other) else {
                                continue;
                            };
                            shown.advance -= adjust / 1000.0;
                            if adjust <= TJ_SPACE_THRESHOLD
                                && !shown.text.is_empty()
                                && !shown.text.ends_with(' ')
                            {
                                shown.text.push(' ');
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        shown
    }

    /// Emit the fragment for a show operator and move past it.
    fn show(&mut self, operand: &Object, fonts: &PageFonts) -> Option<TextFragment> {
        let shown = self.shown_text(operand, fonts);
        let fragment = (!shown.text.is_empty()).then(|| {
            TextFragment::from_transform(
                shown.text,
                multiply(&self.text_matrix, &self.graphics.ctm),
            )
        });
        let tx = shown.advance * self.graphics.font_size;
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
        fragment
    }
}

/// Interpret the positioning and text-showing operators of a content stream.
pub fn fragments_from_operations(operations: &[Operation], fonts: &PageFonts) -> Vec<TextFragment> {
    let mut state = TextState::new();
    let mut fragments = Vec::new();

    for op in operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => state.saved.push(state.graphics.clone()),
            "Q" => {
                if let Some(graphics) = state.saved.pop() {
                    state.graphics = graphics;
                }
            }
            "cm" => {
                if let Some(m) = numbers::<6>(operands) {
                    state.graphics.ctm = multiply(&m, &state.graphics.ctm);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    state.graphics.font = Some(name.to_vec());
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    state.graphics.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
            }
            "TL" => {
                if let Some([leading]) = numbers::<1>(operands) {
                    state.leading = leading;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    state.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    state.leading = -ty;
                    state.move_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "Tj" | "TJ" => {
                if let Some(operand) = operands.first() {
                    fragments.extend(state.show(operand, fonts));
                }
            }
            "'" => {
                state.next_line();
                if let Some(operand) = operands.first() {
                    fragments.extend(state.show(operand, fonts));
                }
            }
            "\"" => {
                state.next_line();
                if let Some(operand) = operands.get(2) {
                    fragments.extend(state.show(operand, fonts));
                }
            }
            _ => {}
        }
    }

    fragments
}
