//! PDF manipulation module

pub mod banner;
pub mod classify;
pub mod compose;
pub mod merge;
pub mod metadata;
pub mod split;

// Re-export commonly used items
pub use classify::{classify, PageGeometry, Rect, SizeClass};
pub use compose::{compose, write_document, PlannedPage};
pub use merge::SourceDocument;
pub use metadata::{describe_pages, DocumentInfo, PageInfo};
pub use split::{folded_reading_order, half_bounds, is_splittable_pair, Half};
