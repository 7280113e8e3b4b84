//! Assigning every page to an owner
//!
//! Assignment is a left fold over the pages in index order. The only state
//! carried between pages is the owner of the last labeled page, which is
//! what makes this phase strictly sequential.

use std::collections::{BTreeSet, HashMap};
use serde::Serialize;
use crate::events::{PhaseProgress, ScanEvents};
use crate::pdf::classify::SizeClass;
use crate::scan::qr::{OwnerKey, QrHit};

/// Horizontal half of the page a label was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    /// No label on this page
    None,
}

/// How a page got its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The page's own label was decoded
    Read,
    /// Inferred from the preceding labeled page (two-sided scan)
    FromPrevious,
    /// No owner could be determined
    Missing,
}

/// Outcome for one source page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub page_index: usize,
    pub size: SizeClass,
    pub status: Status,
    /// Present unless `status` is `Missing`
    pub owner: Option<OwnerKey>,
    pub side: Side,
}

/// What the classifier and locator found on one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageObservation {
    pub size: SizeClass,
    pub qr: Option<QrHit>,
}

/// State carried from one page to the next
#[derive(Debug, Default)]
pub struct CarryForward {
    last_owner: Option<OwnerKey>,
}

impl CarryForward {
    /// Decide the owner of page `page_index`
    ///
    /// An inferred page never donates its owner: after a `FromPrevious`
    /// page the carried owner is cleared. A `Missing` page clears it as well,
    /// so inference never reaches across an unassigned page.
    pub fn step(&mut self, page_index: usize, observation: &PageObservation, two_page_scan: bool) -> PageRecord {
        let size = observation.size;

        if let Some(ref hit) = observation.qr {
            self.last_owner = Some(hit.owner.clone());
            return PageRecord {
                page_index,
                size,
                status: Status::Read,
                owner: Some(hit.owner.clone()),
                side: hit.side,
            };
        }

        if two_page_scan {
            if let Some(owner) = self.last_owner.take() {
                return PageRecord {
                    page_index,
                    size,
                    status: Status::FromPrevious,
                    owner: Some(owner),
                    side: Side::None,
                };
            }
        }

        self.last_owner = None;
        PageRecord { page_index, size, status: Status::Missing, owner: None, side: Side::None }
    }
}

/// Result of the assignment pass
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// One record per page, in page order
    pub records: Vec<PageRecord>,
    /// Indices of pages with `Status::Missing`
    pub missing: BTreeSet<usize>,
}

/// Run the assignment fold over all pages
///
/// `observations[i]` describes page `i`. Progress is reported after every
/// page as pages done over total pages.
pub(crate) fn assign_pages(
    observations: &[PageObservation],
    two_page_scan: bool,
    events: &dyn ScanEvents,
    progress: &PhaseProgress<'_>,
) -> Assignment {
    let total = observations.len();
    let mut state = CarryForward::default();
    let mut records = Vec::with_capacity(total);
    let mut missing = BTreeSet::new();

    for (index, observation) in observations.iter().enumerate() {
        let record = state.step(index, observation, two_page_scan);
        match record.status {
            Status::Read => {}
            Status::FromPrevious => events.info(&format!(
                "No QR code on page {} of merged PDF. Inferred from previous page.",
                index + 1
            )),
            Status::Missing if two_page_scan => {
                events.error(&format!(
                    "Error on page {} of merged PDF: two consecutive pages without QR code, or the first page has no QR code.",
                    index + 1
                ));
                missing.insert(index);
            }
            Status::Missing => {
                events.error(&format!(
                    "Read error: page {} has no QR code and two-page scan is not active.",
                    index + 1
                ));
                missing.insert(index);
            }
        }
        records.push(record);
        progress.report(index + 1, total);
    }

    if missing.is_empty() {
        events.info("All QR codes read.");
    } else {
        let numbers: Vec<String> = missing.iter().map(|p| (p + 1).to_string()).collect();
        events.error(&format!("Some pages could not be assigned: {}", numbers.join(", ")));
    }

    Assignment { records, missing }
}

/// Public entry point for callers without a progress phase
pub fn assign(observations: &[PageObservation], two_page_scan: bool, events: &dyn ScanEvents) -> Assignment {
    let progress = PhaseProgress::new(events, 0.0, 1.0);
    assign_pages(observations, two_page_scan, events, &progress)
}

/// Pages of one owner
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerPages {
    pub owner: OwnerKey,
    /// In document order
    pub pages: Vec<PageRecord>,
}

/// Group assigned pages by owner, owners in order of first appearance
pub fn group_by_owner(records: &[PageRecord]) -> Vec<OwnerPages> {
    let mut groups: Vec<OwnerPages> = Vec::new();
    let mut positions: HashMap<OwnerKey, usize> = HashMap::new();

    for record in records {
        let Some(ref owner) = record.owner else {
            continue;
        };
        let position = *positions.entry(owner.clone()).or_insert_with(|| {
            groups.push(OwnerPages { owner: owner.clone(), pages: Vec::new() });
            groups.len() - 1
        });
        groups[position].pages.push(record.clone());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::RecordingEvents;

    fn read(owner: &str, side: Side) -> PageObservation {
        PageObservation {
            size: SizeClass::A4,
            qr: Some(QrHit {
                owner: OwnerKey::from_payload(owner).unwrap(),
                side,
                angle: 0,
            }),
        }
    }

    fn blank() -> PageObservation {
        PageObservation { size: SizeClass::A4, qr: None }
    }

    #[test]
    fn test_single_labeled_page() {
        let events = RecordingEvents::default();
        let result = assign(&[read("Mueller_111", Side::Left)], false, &events);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].status, Status::Read);
        assert_eq!(result.records[0].owner.as_ref().unwrap().as_str(), "Mueller_111");
        assert!(result.missing.is_empty());
        assert!(events.contains("info", "All QR codes read."));
    }

    #[test]
    fn test_two_page_scan_infers_one_page_only() {
        let events = RecordingEvents::default();
        let pages = [read("Mueller_111", Side::Right), blank(), blank()];
        let result = assign(&pages, true, &events);

        let second = &result.records[1];
        assert_eq!(second.status, Status::FromPrevious);
        assert_eq!(second.owner.as_ref().unwrap().as_str(), "Mueller_111");
        assert_eq!(second.side, Side::None);

        // Carry-forward does not chain
        assert_eq!(result.records[2].status, Status::Missing);
        assert_eq!(result.records[2].owner, None);
        assert_eq!(result.missing, BTreeSet::from([2]));
    }

    #[test]
    fn test_without_two_page_scan_blank_pages_are_missing() {
        let events = RecordingEvents::default();
        let pages = [read("Mueller_111", Side::Right), blank(), read("Schmidt_222", Side::Left)];
        let result = assign(&pages, false, &events);

        assert!(result.records.iter().all(|r| r.status != Status::FromPrevious));
        assert_eq!(result.missing, BTreeSet::from([1]));
        assert!(events.contains("error", "page 2 has no QR code"));
        assert!(events.contains("error", "could not be assigned: 2"));
    }

    #[test]
    fn test_leading_blank_page_is_missing() {
        let events = RecordingEvents::default();
        let result = assign(&[blank(), read("Mueller_111", Side::Left)], true, &events);
        assert_eq!(result.records[0].status, Status::Missing);
        assert_eq!(result.missing, BTreeSet::from([0]));
    }

    #[test]
    fn test_missing_page_breaks_the_chain() {
        // Toggling two-page scan mid-run is not possible, so exercise the
        // state machine directly: a missing page clears the carried owner.
        let mut state = CarryForward::default();
        state.step(0, &read("Mueller_111", Side::Left), true);
        let skipped = state.step(1, &blank(), false);
        assert_eq!(skipped.status, Status::Missing);
        let after = state.step(2, &blank(), true);
        assert_eq!(after.status, Status::Missing);
    }

    #[test]
    fn test_progress_after_every_page() {
        let events = RecordingEvents::default();
        assign(&[read("A_1", Side::Left), blank(), blank(), read("B_2", Side::Left)], true, &events);

        let progress = events.progress.lock().unwrap().clone();
        assert_eq!(progress, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_group_keeps_first_appearance_order() {
        let events = RecordingEvents::default();
        let pages = [
            read("Schmidt_222", Side::Left),
            read("Mueller_111", Side::Left),
            blank(),
            read("Schmidt_222", Side::Right),
        ];
        let result = assign(&pages, true, &events);
        let groups = group_by_owner(&result.records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].owner.as_str(), "Schmidt_222");
        assert_eq!(
            groups[0].pages.iter().map(|p| p.page_index).collect::<Vec<_>>(),
            vec![0, 3]
        );
        assert_eq!(groups[1].owner.as_str(), "Mueller_111");
        assert_eq!(
            groups[1].pages.iter().map(|p| p.page_index).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }
}
