//! Text extraction for indexable attachments.
//!
//! Extraction is split into a [`LayoutSource`] that turns a file into
//! positioned text fragments and the pure reconstruction in [`layout`].

pub mod layout;
pub mod pdf;

pub use layout::{
    reconstruct_page, reconstruct_text, PageAssembler, PageLayout, TextFragment, LINE_BREAK,
    PAGE_BREAK,
};
pub use pdf::{LayoutSource, PdfLayoutSource};

use crate::Result;
use std::path::Path;

/// Extracts the plain text of one attachment file.
///
/// Implementations are blocking; the indexer calls them from
/// `spawn_blocking`.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Layout-aware extractor: loads pages from a [`LayoutSource`] and rebuilds
/// reading-order text.
#[derive(Debug, Clone, Default)]
pub struct LayoutTextExtractor<S = PdfLayoutSource> {
    source: S,
}

impl<S: LayoutSource> LayoutTextExtractor<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: LayoutSource> TextExtractor for LayoutTextExtractor<S> {
    fn extract(&self, path: &Path) -> Result<String> {
        let pages = self.source.load_pages(path)?;
        Ok(reconstruct_text(&pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPages(Vec<PageLayout>);

    impl LayoutSource for FixedPages {
        fn load_pages(&self, _path: &Path) -> Result<Vec<PageLayout>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_layout_extractor_reconstructs_pages() {
        let extractor = LayoutTextExtractor::new(FixedPages(vec![
            PageLayout::new(2, vec![TextFragment::new("Appendix", 700.0, 72.0)]),
            PageLayout::new(
                1,
                vec![
                    TextFragment::new("Annual", 700.0, 72.0),
                    TextFragment::new("report", 700.0, 120.0),
                ],
            ),
        ]));

        let text = extractor.extract(Path::new("ignored.pdf")).unwrap();
        assert_eq!(text, "Annual report\n\nAppendix\n\n");
    }
}
