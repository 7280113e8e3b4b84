//! Page rasterization
//!
//! The QR locator only needs greyscale bitmaps, so rendering sits behind the
//! `Rasterizer` / `PageRaster` traits. The production backend is pdfium.

use std::path::Path;
use image::GrayImage;
use pdfium_render::prelude::*;
use crate::error::{Error, Result};

/// Opens documents for rendering
pub trait Rasterizer {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn PageRaster + 'a>>;
}

/// Renders pages of one open document
pub trait PageRaster {
    fn page_count(&self) -> usize;

    /// Render page `index` (zero-based) scaled by `zoom`
    fn rasterize(&self, index: usize, zoom: f32) -> Result<GrayImage>;
}

/// pdfium-backed rasterizer
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind the pdfium library, looking next to the executable first
    pub fn bind() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Error::Environment(format!("Failed to bind pdfium library: {}", e)))?;
        Ok(Self { pdfium: Pdfium::new(bindings) })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn PageRaster + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| Error::ingest(path, format!("pdfium could not open the file: {}", e)))?;
        Ok(Box::new(PdfiumPages { document }))
    }
}

struct PdfiumPages<'a> {
    document: PdfDocument<'a>,
}

impl PageRaster for PdfiumPages<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn rasterize(&self, index: usize, zoom: f32) -> Result<GrayImage> {
        let render_error = |message: String| Error::Render { page: index + 1, message };

        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| render_error(e.to_string()))?;

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(zoom)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_error(e.to_string()))?;

        Ok(bitmap.as_image().to_luma8())
    }
}
