//! Reading labels off scanned pages and assigning pages to owners

pub mod assign;
pub mod qr;
pub mod raster;

use rayon::prelude::*;
use crate::error::{Error, Result};
use crate::events::{PhaseProgress, ScanEvents};
use crate::options::ScanOptions;
use crate::pdf::SourceDocument;

pub use assign::{assign, group_by_owner, Assignment, OwnerPages, PageObservation, PageRecord, Side, Status};
pub use qr::{locate, OwnerKey, QrHit};
pub use raster::{PageRaster, PdfiumRasterizer, Rasterizer};

/// Classify and look for a label on every page of `source`
///
/// pdfium is not thread-safe, so pages are rendered one at a time in batches
/// of `options.workers`; each batch is then decoded on the pool. The result
/// is indexed by page and complete before it is returned.
pub(crate) fn observe_pages(
    source: &SourceDocument,
    raster: &dyn PageRaster,
    options: &ScanOptions,
    pool: &rayon::ThreadPool,
    events: &dyn ScanEvents,
    progress: &PhaseProgress<'_>,
) -> Result<Vec<PageObservation>> {
    let total = source.page_count();
    if raster.page_count() != total {
        return Err(Error::General(format!(
            "Renderer sees {} pages but the merged document has {}",
            raster.page_count(),
            total
        )));
    }

    let angles = options.rotation_angles();
    let mut observations = Vec::with_capacity(total);
    let batch_size = options.workers.max(1);

    for batch_start in (0..total).step_by(batch_size) {
        let batch_end = (batch_start + batch_size).min(total);

        let mut batch = Vec::with_capacity(batch_end - batch_start);
        for index in batch_start..batch_end {
            let size = source.geometry(index)?.size_class(options.size_tolerance);
            // A page that cannot be rendered is treated like a page without a label
            let image = match raster.rasterize(index, options.zoom) {
                Ok(image) => Some(image),
                Err(e) => {
                    events.error(&format!("{}; page treated as unlabeled", e));
                    None
                }
            };
            batch.push((index, size, image));
        }

        let decoded: Vec<PageObservation> = pool.install(|| {
            batch
                .par_iter()
                .map(|(index, size, image)| PageObservation {
                    size: *size,
                    qr: image.as_ref().and_then(|image| locate(image, &angles, *index, events)),
                })
                .collect()
        });

        observations.extend(decoded);
        progress.report(batch_end, total);
    }

    Ok(observations)
}
