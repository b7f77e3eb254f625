//! PDF text extraction

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("The file at {} was not found.", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to extract text from {}: {message}", .path.display())]
    Pdf { path: PathBuf, message: String },
}

/// Anything that can turn a file into plain text.
pub trait TextExtractor: Send + Sync {
    /// Concatenated text of the whole document; empty if it has none.
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Extracts page text with pdf_oxide.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }

        let pdf_error = |e: pdf_oxide::Error| ExtractError::Pdf {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let doc = pdf_oxide::PdfDocument::open(path).map_err(pdf_error)?;
        let page_count = doc.page_count().map_err(pdf_error)?;
        debug!(path = %path.display(), pages = page_count, "opened PDF");

        let mut pages = Vec::with_capacity(page_count);
        for index in 0..page_count {
            match doc.extract_text(index) {
                Ok(text) if !text.trim().is_empty() => pages.push(text),
                Ok(_) => debug!(page = index + 1, "page has no text"),
                Err(e) => warn!(page = index + 1, error = %e, "skipping unreadable page"),
            }
        }

        Ok(join_pages(&pages))
    }
}

/// Join page texts with newlines and trim the result.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let err = PdfExtractor::new().extract(&path).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(ref p) if p == &path));
        assert!(err.to_string().ends_with("missing.pdf was not found."));
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        let err = PdfExtractor::new().extract(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf { .. }));
    }

    #[test]
    fn test_join_pages() {
        assert_eq!(join_pages(&["  Page one.", "", "Page two.\n"]), "Page one.\nPage two.");
        assert_eq!(join_pages::<&str>(&[]), "");
    }
}
