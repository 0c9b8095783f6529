//! Reading-order text reconstruction from positioned text fragments.
//!
//! The input is what a page-based layout engine reports: per page, the text
//! runs in content-stream order, each with the position it was drawn at. Line
//! breaks and word gaps are inferred from how the position moves between
//! consecutive runs:
//!
//! - the line axis going backwards starts a new line (`\r\n`);
//! - otherwise, a change on the word axis inserts a single space, unless the
//!   previous run ends in a lone letter (initials, drop caps, running heads).
//!
//! Multi-column layouts, rotated text and right-to-left scripts are not
//! reconstructed correctly.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Separator emitted when the cursor moves back along the line axis.
pub const LINE_BREAK: &str = "\r\n";
/// Appended after every page.
pub const PAGE_BREAK: &str = "\n\n";

/// A lone letter, or text whose last word is a lone letter.
static SINGLE_LETTER_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s?[a-zA-Z])$|^(.+\s[a-zA-Z])$").unwrap());

/// One positioned text run.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    /// Line axis: a smaller value than the previous run means a new line.
    pub x: f64,
    /// Word axis: a different value than the previous run means a word gap.
    pub y: f64,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }

    /// Build a fragment from a PDF text rendering matrix `[a b c d e f]`.
    ///
    /// The vertical translation `f` is the line axis and the horizontal
    /// translation `e` the word axis. PDF user space grows upwards, so a run
    /// drawn further down the page compares as smaller and breaks the line.
    pub fn from_transform(text: impl Into<String>, transform: [f64; 6]) -> Self {
        Self::new(text, transform[5], transform[4])
    }
}

/// The fragments of one page, numbered from 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub number: u32,
    pub fragments: Vec<TextFragment>,
}

impl PageLayout {
    pub fn new(number: u32, fragments: Vec<TextFragment>) -> Self {
        Self { number, fragments }
    }
}

fn separator(last: &TextFragment, current: &TextFragment) -> Option<&'static str> {
    if last.text.ends_with(' ') {
        return None;
    }
    if current.x < last.x {
        Some(LINE_BREAK)
    } else if current.y != last.y && !SINGLE_LETTER_TAIL.is_match(&last.text) {
        Some(" ")
    } else {
        None
    }
}

/// Reconstruct the text of a single page, including the trailing page break.
pub fn reconstruct_page(fragments: &[TextFragment]) -> String {
    let mut text = String::new();
    let mut last: Option<&TextFragment> = None;

    for fragment in fragments {
        if let Some(sep) = last.and_then(|last| separator(last, fragment)) {
            text.push_str(sep);
        }
        text.push_str(&fragment.text);
        last = Some(fragment);
    }

    text.push_str(PAGE_BREAK);
    text
}

/// Collects page texts that may finish in any order.
///
/// Slots are indexed by page number; the document is only assembled once
/// every page has reported.
#[derive(Debug)]
pub struct PageAssembler {
    pages: Vec<Option<String>>,
    completed: usize,
}

impl PageAssembler {
    pub fn new(total_pages: usize) -> Self {
        Self {
            pages: vec![None; total_pages],
            completed: 0,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Store the text of a page (1-based). Returns `true` once all pages are in.
    ///
    /// Reporting the same page twice keeps the latest text and counts once;
    /// out-of-range page numbers are ignored.
    pub fn complete(&mut self, page_number: u32, text: String) -> bool {
        let slot = (page_number as usize)
            .checked_sub(1)
            .and_then(|index| self.pages.get_mut(index));

        match slot {
            Some(slot) => {
                if slot.is_none() {
                    self.completed += 1;
                }
                *slot = Some(text);
            }
            None => warn!(
                "Ignoring page {} of a {}-page document",
                page_number,
                self.pages.len()
            ),
        }

        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.pages.len()
    }

    /// Concatenate in page order. `None` until every page has completed.
    pub fn finish(self) -> Option<String> {
        if !self.is_complete() {
            return None;
        }
        Some(self.pages.into_iter().flatten().collect())
    }
}

/// Reconstruct a whole document from its pages, in page-number order.
///
/// The page count is taken from the highest page number present; numbers
/// that never show up contribute no text.
pub fn reconstruct_text(pages: &[PageLayout]) -> String {
    let total = pages.iter().map(|p| p.number as usize).max().unwrap_or(0);
    let mut assembler = PageAssembler::new(total);

    for page in pages {
        assembler.complete(page.number, reconstruct_page(&page.fragments));
    }

    let mut missing = Vec::new();
    for (index, slot) in assembler.pages.iter().enumerate() {
        if slot.is_none() {
            missing.push(index as u32 + 1);
        }
    }
    for number in missing {
        assembler.complete(number, String::new());
    }

    assembler.finish().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x: f64, y: f64) -> TextFragment {
        TextFragment::new(text, x, y)
    }

    #[test]
    fn test_cursor_moving_back_breaks_line() {
        let text = reconstruct_page(&[frag("Hello", 700.0, 72.0), frag("World", 680.0, 72.0)]);
        assert_eq!(text, "Hello\r\nWorld\n\n");
    }

    #[test]
    fn test_word_axis_change_inserts_space() {
        let text = reconstruct_page(&[frag("Hello", 700.0, 72.0), frag("World", 700.0, 110.0)]);
        assert_eq!(text, "Hello World\n\n");
    }

    #[test]
    fn test_same_position_concatenates() {
        let text = reconstruct_page(&[frag("Hel", 700.0, 72.0), frag("lo", 700.0, 72.0)]);
        assert_eq!(text, "Hello\n\n");
    }

    #[test]
    fn test_trailing_space_suppresses_separator() {
        let text = reconstruct_page(&[frag("Hello ", 700.0, 72.0), frag("World", 680.0, 90.0)]);
        assert_eq!(text, "Hello World\n\n");
    }

    #[test]
    fn test_single_letter_suppresses_space() {
        let text = reconstruct_page(&[frag("J", 700.0, 72.0), frag("ohn", 700.0, 80.0)]);
        assert_eq!(text, "John\n\n");

        let text = reconstruct_page(&[frag(" A", 700.0, 72.0), frag("pple", 700.0, 80.0)]);
        assert_eq!(text, " Apple\n\n");

        let text = reconstruct_page(&[frag("Chapter A", 700.0, 72.0), frag("bc", 700.0, 80.0)]);
        assert_eq!(text, "Chapter Abc\n\n");
    }

    #[test]
    fn test_single_letter_still_breaks_line() {
        let text = reconstruct_page(&[frag("A", 700.0, 72.0), frag("B", 690.0, 72.0)]);
        assert_eq!(text, "A\r\nB\n\n");
    }

    #[test]
    fn test_single_digit_is_not_a_letter() {
        let text = reconstruct_page(&[frag("7", 700.0, 72.0), frag("items", 700.0, 80.0)]);
        assert_eq!(text, "7 items\n\n");
    }

    #[test]
    fn test_empty_previous_fragment_still_separates() {
        let text = reconstruct_page(&[frag("", 700.0, 72.0), frag("x", 700.0, 80.0)]);
        assert_eq!(text, " x\n\n");
    }

    #[test]
    fn test_empty_page_is_just_page_break() {
        assert_eq!(reconstruct_page(&[]), "\n\n");
    }

    #[test]
    fn test_from_transform_reads_translation() {
        let fragment = TextFragment::from_transform("t", [12.0, 0.0, 0.0, 12.0, 72.0, 700.0]);
        assert_eq!(fragment.x, 700.0);
        assert_eq!(fragment.y, 72.0);
    }

    #[test]
    fn test_assembler_orders_out_of_order_pages() {
        let mut assembler = PageAssembler::new(3);
        assert!(!assembler.complete(2, "two".into()));
        assert!(!assembler.complete(3, "three".into()));
        assert!(assembler.complete(1, "one".into()));
        assert_eq!(assembler.finish().unwrap(), "onetwothree");
    }

    #[test]
    fn test_assembler_not_finished_until_all_pages() {
        let mut assembler = PageAssembler::new(2);
        assembler.complete(2, "two".into());
        assembler.complete(2, "again".into());
        assert!(!assembler.is_complete());
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn test_assembler_ignores_out_of_range_pages() {
        let mut assembler = PageAssembler::new(1);
        assert!(!assembler.complete(0, "zero".into()));
        assert!(!assembler.complete(5, "five".into()));
        assert!(assembler.complete(1, "one".into()));
        assert_eq!(assembler.finish().unwrap(), "one");
    }

    #[test]
    fn test_reconstruct_text_uses_page_numbers() {
        let pages = vec![
            PageLayout::new(2, vec![frag("second", 700.0, 72.0)]),
            PageLayout::new(1, vec![frag("first", 700.0, 72.0)]),
        ];
        assert_eq!(reconstruct_text(&pages), "first\n\nsecond\n\n");
    }

    #[test]
    fn test_reconstruct_text_empty_document() {
        assert_eq!(reconstruct_text(&[]), "");
    }
}
