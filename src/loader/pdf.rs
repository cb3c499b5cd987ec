//! PDF text extraction.

use crate::error::{LexwiseError, Result};
use lopdf::Document;
use std::path::Path;
use tracing::warn;

/// Extract the text of every page, in page order, as one string.
///
/// A page whose text cannot be decoded is skipped rather than failing the
/// whole file; scanned pages simply contribute nothing.
pub(super) fn extract_text(path: &Path) -> Result<String> {
    let doc = Document::load(path).map_err(|e| {
        LexwiseError::Loader(format!("Failed to parse PDF {}: {}", path.display(), e))
    })?;

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        match doc.extract_text(&[page_number]) {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    pages.push(text.to_string());
                }
            }
            Err(e) => warn!(
                "Could not extract text from page {} of {}: {}",
                page_number,
                path.display(),
                e
            ),
        }
    }

    Ok(pages.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let err = extract_text(&path).unwrap_err();
        assert!(err.to_string().contains("broken.pdf"));
    }
}
