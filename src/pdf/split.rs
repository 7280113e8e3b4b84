//! Cutting A3 sheets into their two A4 halves

use crate::pdf::classify::{PageGeometry, Rect, SizeClass};
use crate::scan::assign::{PageRecord, Side, Status};

/// Which half of a sheet, as seen by a reader holding the displayed page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Left,
    Right,
}

/// User-space rectangle showing the requested half of a page
///
/// The cut runs along the displayed vertical midline, so for pages with a
/// `/Rotate` of 90 or 270 the split happens along the user-space y axis.
pub fn half_bounds(geometry: &PageGeometry, half: Half) -> Rect {
    let b = geometry.bounds;
    let mid_x = (b.x0 + b.x1) / 2.0;
    let mid_y = (b.y0 + b.y1) / 2.0;

    let low_x = Rect { x1: mid_x, ..b };
    let high_x = Rect { x0: mid_x, ..b };
    let low_y = Rect { y1: mid_y, ..b };
    let high_y = Rect { y0: mid_y, ..b };

    match (geometry.rotate, half) {
        (90, Half::Left) => low_y,
        (90, Half::Right) => high_y,
        (180, Half::Left) => high_x,
        (180, Half::Right) => low_x,
        (270, Half::Left) => high_y,
        (270, Half::Right) => low_y,
        (_, Half::Left) => low_x,
        (_, Half::Right) => high_x,
    }
}

/// Whether two consecutive pages of one owner form a folded double sheet
///
/// Both pages must be A3 and the first must carry a label. The pair holds
/// when the labels sit left then right, or when the second page was only
/// inferred from the first.
pub fn is_splittable_pair(first: &PageRecord, second: &PageRecord) -> bool {
    if first.size != SizeClass::A3 || second.size != SizeClass::A3 {
        return false;
    }
    first.status == Status::Read
        && ((first.side == Side::Left && second.side == Side::Right) || second.side == Side::None)
}

/// Reading order of the four halves of a folded double sheet
///
/// The outer sheet holds pages 4|1, the inner sheet pages 2|3, so the
/// output runs: right of first, left of second, right of second, left of
/// first.
pub fn folded_reading_order(first: usize, second: usize) -> [(usize, Half); 4] {
    [
        (first, Half::Right),
        (second, Half::Left),
        (second, Half::Right),
        (first, Half::Left),
    ]
}
