//! Error types for the exam sorter library

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the exam sorter library
///
/// Only conditions that abort a run are represented here. A page without a
/// readable QR label is not an error: the locator returns `None` and the
/// assignment records the page as missing.
#[derive(Error, Debug)]
pub enum Error {
    /// No writable scratch location, or the rasterizer backend is unavailable
    #[error("Environment error: {0}")]
    Environment(String),

    /// A source file could not be opened, parsed or rendered as a PDF
    #[error("Cannot read {}: {source}", .path.display())]
    Ingest {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// The output archive could not be written
    #[error("Cannot write archive {}: {source}", .path.display())]
    Packaging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scan options failed validation
    #[error("Invalid scan options: {0}")]
    InvalidOptions(String),

    /// A page could not be rasterized
    #[error("Render error on page {page}: {message}")]
    Render { page: usize, message: String },

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive format error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Manifest serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    pub(crate) fn ingest(path: &Path, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Ingest { path: path.to_path_buf(), source: source.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_names_file() {
        let source = lopdf::Document::load_mem(b"not a pdf").unwrap_err();
        let err = Error::ingest(Path::new("scans/batch1.pdf"), source);
        assert!(err.to_string().contains("scans/batch1.pdf"));
    }

    #[test]
    fn test_render_error_mentions_page() {
        let err = Error::Render { page: 7, message: "bitmap allocation failed".to_string() };
        assert_eq!(err.to_string(), "Render error on page 7: bitmap allocation failed");
    }
}
