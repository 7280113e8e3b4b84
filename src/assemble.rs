//! Building one document per student

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use rayon::prelude::*;
use crate::error::Result;
use crate::events::{PhaseProgress, ScanEvents};
use crate::pdf::{folded_reading_order, is_splittable_pair, write_document, PlannedPage, SizeClass, SourceDocument};
use crate::scan::{OwnerKey, OwnerPages, PageRecord};

/// A finished per-student document
#[derive(Debug, Clone)]
pub struct AssembledOwner {
    pub owner: OwnerKey,
    /// Path-safe name used for the directory and file
    pub file_stem: String,
    /// Pages in the output document (halves count individually)
    pub page_count: usize,
    /// Absolute path of the written PDF
    pub path: PathBuf,
    /// Pages as they appear in the written PDF
    pub plan: Vec<PlannedPage>,
    /// Source records consumed, in document order
    pub records: Vec<PageRecord>,
}

/// Plan the output pages for one owner
///
/// With splitting enabled, an A3 page followed by a page it pairs with is
/// replaced by the four halves in folded reading order and both pages are
/// consumed. Anything else, including a trailing A3 page without a partner,
/// is copied unchanged.
pub fn plan_owner(pages: &[PageRecord], split_a3: bool, events: &dyn ScanEvents) -> Vec<PlannedPage> {
    let mut plan = Vec::with_capacity(pages.len());
    let mut i = 0;

    while i < pages.len() {
        let page = &pages[i];
        let next = pages.get(i + 1);

        match next {
            Some(next) if split_a3 && page.size == SizeClass::A3 && is_splittable_pair(page, next) => {
                events.info(&format!(
                    "Pages {} and {} will be split.",
                    page.page_index + 1,
                    next.page_index + 1
                ));
                plan.extend(
                    folded_reading_order(page.page_index, next.page_index)
                        .into_iter()
                        .map(|(index, half)| PlannedPage::Half(index, half)),
                );
                i += 2;
            }
            _ => {
                plan.push(PlannedPage::Copy(page.page_index));
                i += 1;
            }
        }
    }

    plan
}

/// Replace characters that are not safe in file names
pub fn file_stem_for(owner: &OwnerKey) -> String {
    let stem: String = owner
        .as_str()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// Give every owner a distinct file stem, suffixing collisions
fn unique_stems(groups: &[OwnerPages]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    groups
        .iter()
        .map(|group| {
            let base = file_stem_for(&group.owner);
            let mut stem = base.clone();
            let mut n = 2;
            while !used.insert(stem.to_lowercase()) {
                stem = format!("{}-{}", base, n);
                n += 1;
            }
            stem
        })
        .collect()
}

/// Write `<stem>/<stem>.pdf` under `output_dir` for every owner
///
/// Owners are assembled in parallel on `pool`; the result keeps the order of
/// `groups`.
pub(crate) fn assemble_owners(
    source: &SourceDocument,
    groups: &[OwnerPages],
    split_a3: bool,
    output_dir: &Path,
    pool: &rayon::ThreadPool,
    events: &dyn ScanEvents,
    progress: &PhaseProgress<'_>,
) -> Result<Vec<AssembledOwner>> {
    let stems = unique_stems(groups);

    let assembled: Result<Vec<AssembledOwner>> = pool.install(|| {
        groups
            .par_iter()
            .zip(stems.par_iter())
            .map(|(group, stem)| {
                let plan = plan_owner(&group.pages, split_a3, events);
                let dir = output_dir.join(stem);
                fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{}.pdf", stem));
                let page_count = write_document(source, &plan, &path)?;
                Ok(AssembledOwner {
                    owner: group.owner.clone(),
                    file_stem: stem.clone(),
                    page_count,
                    path,
                    plan,
                    records: group.pages.clone(),
                })
            })
            .collect()
    });

    let assembled = assembled?;
    progress.report(assembled.len(), groups.len());
    Ok(assembled)
}

/// Assemble the pages of a single owner into `output`, returning its page count
pub fn assemble_owner(
    source: &SourceDocument,
    pages: &[PageRecord],
    split_a3: bool,
    output: &Path,
    events: &dyn ScanEvents,
) -> Result<usize> {
    let plan = plan_owner(pages, split_a3, events);
    write_document(source, &plan, output)
}
