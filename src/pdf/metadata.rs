//! Per-page inspection of a PDF file

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use crate::pdf::classify::{page_geometry, SizeClass};

/// Size information for one page
#[derive(Debug, Clone)]
pub struct PageInfo {
    /// 1-based page number
    pub number: usize,
    /// Displayed width in points
    pub width: f32,
    /// Displayed height in points
    pub height: f32,
    pub rotate: i64,
    pub size: SizeClass,
}

/// Document-level information
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    /// Document title (if present)
    pub title: Option<String>,
    pub pages: Vec<PageInfo>,
}

impl DocumentInfo {
    /// Number of pages of each size class, as (A4, A3, other)
    pub fn size_counts(&self) -> (usize, usize, usize) {
        self.pages.iter().fold((0, 0, 0), |(a4, a3, other), page| match page.size {
            SizeClass::A4 => (a4 + 1, a3, other),
            SizeClass::A3 => (a4, a3 + 1, other),
            SizeClass::Other => (a4, a3, other + 1),
        })
    }
}

/// Classify every page of a PDF file
pub fn describe_pages(path: &Path, tolerance: f32) -> Result<DocumentInfo> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path).map_err(|source| Error::ingest(path, source))?;

    let page_ids = doc.get_pages();
    if page_ids.is_empty() {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let mut pages = Vec::with_capacity(page_ids.len());
    for (i, page_id) in page_ids.into_values().enumerate() {
        let geometry = page_geometry(&doc, page_id)?;
        let (width, height) = geometry.displayed_size();
        pages.push(PageInfo {
            number: i + 1,
            width,
            height,
            rotate: geometry.rotate,
            size: geometry.size_class(tolerance),
        });
    }

    Ok(DocumentInfo { title: document_title(&doc), pages })
}

/// Title from the Info dictionary, if any
fn document_title(doc: &Document) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_dictionary(info_id).ok()?;
    match info.get(b"Title").ok()? {
        Object::String(bytes, _) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}
