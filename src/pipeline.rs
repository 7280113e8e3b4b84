//! End-to-end scan run
//!
//! Phases run in a fixed order: acquire scratch space, merge, locate labels,
//! assign, assemble, report, package. Only the locate and assemble phases use
//! the worker pool; assignment is a single sequential pass.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use crate::assemble::assemble_owners;
use crate::error::{Error, Result};
use crate::events::{PhaseProgress, ScanEvents};
use crate::options::ScanOptions;
use crate::package::write_archive;
use crate::pdf::SourceDocument;
use crate::report::{archive_path, order_owners, summary_rows, write_reports, RunContext, SummaryRow};
use crate::scan::assign::assign_pages;
use crate::scan::{group_by_owner, observe_pages, OwnerKey, PageRecord, Rasterizer};
use crate::workspace::Workspace;

const LOCATE_END: f32 = 0.85;
const ASSIGN_END: f32 = 0.9;
const ASSEMBLE_END: f32 = 0.98;

/// Everything needed for one run
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Scanned PDFs, merged in this order
    pub inputs: Vec<PathBuf>,
    /// Where the ZIP archive is written
    pub output: PathBuf,
    pub options: ScanOptions,
    /// Preferred parent for the scratch directory
    pub temp_dir: Option<PathBuf>,
}

impl ScanRequest {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            options: ScanOptions::default(),
            temp_dir: None,
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Scratch locations to try, most preferred first
    fn scratch_candidates(&self) -> Vec<PathBuf> {
        let beside_input = self
            .inputs
            .first()
            .and_then(|path| path.parent())
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf);
        self.temp_dir.iter().cloned().chain(beside_input).collect()
    }
}

/// Where one owner's pages ended up
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerOutcome {
    pub owner: OwnerKey,
    /// Path of the owner's document inside the archive
    pub file: String,
    pub page_count: usize,
    /// Source page indices, in document order
    pub source_pages: Vec<usize>,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub archive: PathBuf,
    /// Archive entries in stored order
    pub entries: Vec<String>,
    pub summary: Vec<SummaryRow>,
    /// In summary order
    pub owners: Vec<OwnerOutcome>,
    /// One record per source page
    pub records: Vec<PageRecord>,
    pub missing: BTreeSet<usize>,
}

/// Run the whole pipeline
///
/// Fatal errors are logged through `events` with the phase they occurred in
/// before they are returned. The scratch directory is removed on every path.
pub fn run_scan(request: &ScanRequest, rasterizer: &dyn Rasterizer, events: &dyn ScanEvents) -> Result<ScanOutcome> {
    let options = request.options.clone().validated().map_err(|e| failed(events, "Setup", e))?;

    let workspace = Workspace::acquire(&request.scratch_candidates()).map_err(|e| failed(events, "Setup", e))?;
    events.info(&format!("Working directory: {}", workspace.path().display()));

    let source = SourceDocument::merge(&request.inputs, workspace.path()).map_err(|e| failed(events, "Merging", e))?;
    events.info(&format!(
        "Merged {} file(s) into {} pages",
        request.inputs.len(),
        source.page_count()
    ));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()
        .map_err(|e| failed(events, "Setup", Error::Environment(format!("Failed to start worker pool: {}", e))))?;

    let observations = {
        let raster = rasterizer
            .open(source.path())
            .map_err(|e| failed(events, "Reading QR codes", e))?;
        let progress = PhaseProgress::new(events, 0.0, LOCATE_END);
        observe_pages(&source, &*raster, &options, &pool, events, &progress)
            .map_err(|e| failed(events, "Reading QR codes", e))?
    };

    let progress = PhaseProgress::new(events, LOCATE_END, ASSIGN_END);
    let assignment = assign_pages(&observations, options.two_page_scan, events, &progress);
    let groups = group_by_owner(&assignment.records);

    let staging = workspace.staging_dir().map_err(|e| failed(events, "Assembly", e))?;
    let progress = PhaseProgress::new(events, ASSIGN_END, ASSEMBLE_END);
    let mut owners = assemble_owners(&source, &groups, options.split_a3, &staging, &pool, events, &progress)
        .map_err(|e| failed(events, "Assembly", e))?;
    order_owners(&mut owners, options.sort_summary);

    let progress = PhaseProgress::new(events, ASSEMBLE_END, 1.0);
    let context = RunContext {
        inputs: &request.inputs,
        options: &options,
        page_count: source.page_count(),
        started: chrono::Local::now(),
    };
    let reports = write_reports(&source, &owners, &assignment, &context, &staging, events)
        .map_err(|e| failed(events, "Reports", e))?;
    progress.report(1, 2);

    let entries: Vec<String> = owners.iter().map(archive_path).chain(reports).collect();
    write_archive(&staging, &entries, &request.output).map_err(|e| failed(events, "Packaging", e))?;
    progress.report(2, 2);
    events.info(&format!("Archive written to {}", request.output.display()));

    Ok(ScanOutcome {
        archive: request.output.clone(),
        entries,
        summary: summary_rows(&owners),
        owners: owners
            .iter()
            .map(|owner| OwnerOutcome {
                owner: owner.owner.clone(),
                file: archive_path(owner),
                page_count: owner.page_count,
                source_pages: owner.records.iter().map(|r| r.page_index).collect(),
            })
            .collect(),
        records: assignment.records,
        missing: assignment.missing,
    })
}

fn failed(events: &dyn ScanEvents, phase: &str, error: Error) -> Error {
    events.exception(&format!("{} failed", phase), &error);
    error
}
