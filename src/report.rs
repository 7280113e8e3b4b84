//! Summary, missing-page report, preview and manifest
//!
//! Everything here is derived from the assembled owners and the assignment
//! outcome after assembly has finished. Files are written into the staging
//! directory; [`write_reports`] returns their names in archive order.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};
use serde::Serialize;
use crate::assemble::AssembledOwner;
use crate::error::Result;
use crate::events::ScanEvents;
use crate::options::ScanOptions;
use crate::pdf::{banner, write_document, PlannedPage, SourceDocument};
use crate::scan::{Assignment, OwnerKey, PageRecord};

pub const SUMMARY_PDF: &str = "summary.pdf";
pub const SUMMARY_TXT: &str = "summary.txt";
pub const PREVIEW_PDF: &str = "preview.pdf";
pub const MISSING_PAGES_TXT: &str = "missing_pages.txt";
pub const MANIFEST_JSON: &str = "manifest.json";

/// One line of the summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub owner: OwnerKey,
    pub display_name: String,
    /// Pages in the owner's document, split halves counted individually
    pub page_count: usize,
}

/// Facts about the run that appear in the reports
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub inputs: &'a [PathBuf],
    pub options: &'a ScanOptions,
    /// Pages in the merged source document
    pub page_count: usize,
    pub started: DateTime<Local>,
}

/// Put owners into summary order
///
/// Unsorted keeps the order owners were first encountered. Sorting is by
/// display name, then by full key so equal names stay in a fixed order.
pub fn order_owners(owners: &mut [AssembledOwner], sort: bool) {
    if sort {
        owners.sort_by(|a, b| {
            a.owner
                .display_name()
                .cmp(b.owner.display_name())
                .then_with(|| a.owner.as_str().cmp(b.owner.as_str()))
        });
    }
}

pub fn summary_rows(owners: &[AssembledOwner]) -> Vec<SummaryRow> {
    owners
        .iter()
        .map(|owner| SummaryRow {
            owner: owner.owner.clone(),
            display_name: owner.owner.display_name().to_string(),
            page_count: owner.page_count,
        })
        .collect()
}

/// 1-based page numbers joined with commas
fn page_numbers(missing: &BTreeSet<usize>) -> String {
    missing
        .iter()
        .map(|index| (index + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The line appended to the summaries, if any page is unassigned
pub fn missing_pages_line(missing: &BTreeSet<usize>) -> Option<String> {
    if missing.is_empty() {
        None
    } else {
        Some(format!("Unassigned pages: {}", page_numbers(missing)))
    }
}

/// Surface unassigned pages to the operator
pub fn warn_missing(missing: &BTreeSet<usize>, events: &dyn ScanEvents) {
    if missing.is_empty() {
        return;
    }
    events.warn(&format!(
        "{} page(s) could not be assigned to a student: {}. They are listed in {} and at the end of {}.",
        missing.len(),
        page_numbers(missing),
        MISSING_PAGES_TXT,
        PREVIEW_PDF
    ));
}

/// Pages of `summary.pdf`
pub fn summary_plan(rows: &[SummaryRow], missing: &BTreeSet<usize>) -> Vec<PlannedPage> {
    let table: Vec<(String, String)> = rows
        .iter()
        .map(|row| (row.display_name.clone(), row.page_count.to_string()))
        .collect();
    let notes: Vec<String> = missing_pages_line(missing).into_iter().collect();

    banner::table_content("Summary", ("Student", "Pages"), &table, &notes)
        .into_iter()
        .map(PlannedPage::Text)
        .collect()
}

/// Pages of `preview.pdf`: a banner and the document of every owner, then the
/// unassigned pages behind their own banner
pub fn preview_plan(owners: &[AssembledOwner], missing: &BTreeSet<usize>) -> Vec<PlannedPage> {
    let mut plan = Vec::new();
    for owner in owners {
        plan.push(PlannedPage::Banner(format!("Student: {}", owner.owner.display_name())));
        plan.extend(owner.plan.iter().cloned());
    }
    if !missing.is_empty() {
        plan.push(PlannedPage::Banner("Unassigned pages".to_string()));
        plan.extend(missing.iter().map(|&index| PlannedPage::Copy(index)));
    }
    plan
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Plain-text summary
pub fn summary_text(rows: &[SummaryRow], missing: &BTreeSet<usize>, context: &RunContext<'_>) -> String {
    let options = context.options;
    let mut text = String::from("Exam scan summary\n");
    text.push_str(&"=".repeat(50));
    text.push_str("\n\n");
    text.push_str(&format!("Processed: {}\n\n", context.started.format("%Y-%m-%d %H:%M:%S")));

    text.push_str(&format!("Input files: {}\n", context.inputs.len()));
    text.push_str(&format!("Students found: {}\n", rows.len()));
    text.push_str(&format!("Total pages: {}\n", context.page_count));
    if !missing.is_empty() {
        text.push_str(&format!("Unassigned pages: {}\n", missing.len()));
    }

    text.push_str("\nOptions:\n");
    text.push_str(&format!("- Split A3 sheets: {}\n", yes_no(options.split_a3)));
    text.push_str(&format!("- Two-page scan: {}\n", yes_no(options.two_page_scan)));
    text.push_str(&format!("- Quick and dirty: {}\n", yes_no(options.quick_and_dirty)));

    text.push_str("\nStudents:\n");
    text.push_str(&"-".repeat(30));
    text.push('\n');
    for row in rows {
        text.push_str(&format!(
            "{:<24} {:<32} Pages: {}\n",
            row.display_name,
            row.owner.as_str(),
            row.page_count
        ));
    }

    if let Some(line) = missing_pages_line(missing) {
        text.push('\n');
        text.push_str(&line);
        text.push('\n');
    }
    text
}

/// Contents of `missing_pages.txt`, or `None` when every page was assigned
pub fn missing_pages_text(missing: &BTreeSet<usize>) -> Option<String> {
    if missing.is_empty() {
        return None;
    }
    Some(format!(
        "Unassigned pages: {}\nPage numbers: {}\n",
        missing.len(),
        page_numbers(missing)
    ))
}

#[derive(Serialize)]
struct Manifest<'a> {
    generated: String,
    inputs: Vec<String>,
    options: &'a ScanOptions,
    page_count: usize,
    owners: Vec<ManifestOwner<'a>>,
    missing: Vec<&'a PageRecord>,
}

#[derive(Serialize)]
struct ManifestOwner<'a> {
    owner: &'a OwnerKey,
    display_name: &'a str,
    file: String,
    page_count: usize,
    pages: &'a [PageRecord],
}

/// Machine-readable record of where every source page went
pub fn manifest_json(
    owners: &[AssembledOwner],
    assignment: &Assignment,
    context: &RunContext<'_>,
) -> Result<String> {
    let manifest = Manifest {
        generated: context.started.to_rfc3339(),
        inputs: context.inputs.iter().map(|p| p.display().to_string()).collect(),
        options: context.options,
        page_count: context.page_count,
        owners: owners
            .iter()
            .map(|owner| ManifestOwner {
                owner: &owner.owner,
                display_name: owner.owner.display_name(),
                file: archive_path(owner),
                page_count: owner.page_count,
                pages: &owner.records,
            })
            .collect(),
        missing: assignment
            .missing
            .iter()
            .filter_map(|&index| assignment.records.get(index))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&manifest)?)
}

/// Path of an owner's document inside the archive
pub fn archive_path(owner: &AssembledOwner) -> String {
    format!("{0}/{0}.pdf", owner.file_stem)
}

/// Write every report into `dir`, returning the file names in archive order
///
/// `owners` must already be in summary order.
pub(crate) fn write_reports(
    source: &SourceDocument,
    owners: &[AssembledOwner],
    assignment: &Assignment,
    context: &RunContext<'_>,
    dir: &Path,
    events: &dyn ScanEvents,
) -> Result<Vec<String>> {
    let rows = summary_rows(owners);
    let missing = &assignment.missing;
    warn_missing(missing, events);

    let mut written = Vec::new();

    write_document(source, &summary_plan(&rows, missing), &dir.join(SUMMARY_PDF))?;
    written.push(SUMMARY_PDF.to_string());

    fs::write(dir.join(SUMMARY_TXT), summary_text(&rows, missing, context))?;
    written.push(SUMMARY_TXT.to_string());

    let preview_pages = write_document(source, &preview_plan(owners, missing), &dir.join(PREVIEW_PDF))?;
    events.info(&format!("Preview written with {} pages", preview_pages));
    written.push(PREVIEW_PDF.to_string());

    if let Some(text) = missing_pages_text(missing) {
        fs::write(dir.join(MISSING_PAGES_TXT), text)?;
        written.push(MISSING_PAGES_TXT.to_string());
    }

    fs::write(dir.join(MANIFEST_JSON), manifest_json(owners, assignment, context)?)?;
    written.push(MANIFEST_JSON.to_string());

    Ok(written)
}
