//! Exam Sorter Library
//!
//! Reconstructs one PDF per student from scanned exam PDFs, using printed QR
//! labels as the link between pages and students. This library provides
//! functionality to:
//! - Merge scanned PDFs into one page sequence
//! - Classify pages as A4, A3 or other
//! - Read the QR label on each page, tolerating small rotations
//! - Assign unlabeled back sides of two-sided scans to the preceding student
//! - Cut A3 double sheets into A4 halves in reading order
//! - Write per-student PDFs, a summary, a preview and a ZIP archive
//!
//! # Example
//!
//! ```no_run
//! use exam_sorter::{run_scan, PdfiumRasterizer, ScanOptions, ScanRequest, TracingEvents};
//! use std::path::PathBuf;
//!
//! let options = ScanOptions {
//!     split_a3: true,
//!     two_page_scan: true,
//!     ..Default::default()
//! };
//! let request = ScanRequest::new(vec![PathBuf::from("scans.pdf")], "results.zip")
//!     .with_options(options);
//!
//! let rasterizer = PdfiumRasterizer::bind().expect("pdfium not available");
//! let outcome = run_scan(&request, &rasterizer, &TracingEvents::new()).expect("Scan failed");
//! println!("{} students, {} unassigned pages", outcome.summary.len(), outcome.missing.len());
//! ```

pub mod assemble;
pub mod error;
pub mod events;
pub mod options;
pub mod package;
pub mod pdf;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod workspace;

// Re-export commonly used items
pub use error::{Error, Result};
pub use events::{ScanEvents, TracingEvents};
pub use options::ScanOptions;
pub use pipeline::{run_scan, OwnerOutcome, ScanOutcome, ScanRequest};
pub use scan::{OwnerKey, PageRaster, PdfiumRasterizer, Rasterizer};
