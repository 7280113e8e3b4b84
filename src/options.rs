//! Scan configuration

use serde::Serialize;
use crate::error::{Error, Result};

/// Default rasterization zoom (3x the page size in points)
pub const DEFAULT_ZOOM: f32 = 3.0;

/// Default tolerance in points when matching A4/A3 dimensions
pub const DEFAULT_SIZE_TOLERANCE: f32 = 5.0;

/// Default largest rotation (degrees) tried in thorough mode
pub const DEFAULT_MAX_ANGLE: i32 = 15;

/// Options controlling a scan run
///
/// Build with struct update syntax from `Default` and finish with
/// [`ScanOptions::validated`], which is the only place values are checked.
///
/// ```
/// use exam_sorter::ScanOptions;
///
/// let options = ScanOptions {
///     split_a3: true,
///     two_page_scan: true,
///     ..Default::default()
/// }
/// .validated()
/// .expect("valid options");
/// assert_eq!(options.zoom, 3.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOptions {
    /// Cut A3 sheets into two A4 halves when pairs are detected
    pub split_a3: bool,
    /// Assign a page without a label to the owner of the preceding labeled page
    pub two_page_scan: bool,
    /// Only try the unrotated page when looking for a label
    pub quick_and_dirty: bool,
    /// Rasterization zoom factor
    pub zoom: f32,
    /// Tolerance in points for page size classification
    pub size_tolerance: f32,
    /// Largest rotation angle (degrees, both directions) tried in thorough mode
    pub max_angle: i32,
    /// Worker threads for decoding and assembly
    pub workers: usize,
    /// Sort the summary by display name instead of scan order
    pub sort_summary: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            split_a3: false,
            two_page_scan: false,
            quick_and_dirty: false,
            zoom: DEFAULT_ZOOM,
            size_tolerance: DEFAULT_SIZE_TOLERANCE,
            max_angle: DEFAULT_MAX_ANGLE,
            workers: default_workers(),
            sort_summary: false,
        }
    }
}

impl ScanOptions {
    /// Check value ranges and return the options unchanged if they hold
    pub fn validated(self) -> Result<Self> {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(Error::InvalidOptions(format!("zoom must be positive, got {}", self.zoom)));
        }
        if !(self.size_tolerance.is_finite() && self.size_tolerance >= 0.0) {
            return Err(Error::InvalidOptions(format!(
                "size tolerance must not be negative, got {}",
                self.size_tolerance
            )));
        }
        if !(0..=45).contains(&self.max_angle) {
            return Err(Error::InvalidOptions(format!(
                "max angle must be between 0 and 45 degrees, got {}",
                self.max_angle
            )));
        }
        if self.workers == 0 {
            return Err(Error::InvalidOptions("at least one worker is required".to_string()));
        }
        Ok(self)
    }

    /// Rotation angles the QR locator tries, in order
    ///
    /// Always starts at 0. Thorough mode continues with every other integer
    /// angle from `-max_angle` to `+max_angle`.
    pub fn rotation_angles(&self) -> Vec<i32> {
        let mut angles = vec![0];
        if !self.quick_and_dirty {
            angles.extend((-self.max_angle..=self.max_angle).filter(|&a| a != 0));
        }
        angles
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = ScanOptions::default().validated().expect("defaults should validate");
        assert!(!options.split_a3);
        assert!(!options.two_page_scan);
        assert!(!options.quick_and_dirty);
        assert!(options.workers >= 1);
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_zoom = ScanOptions { zoom: 0.0, ..Default::default() };
        assert!(matches!(zero_zoom.validated(), Err(Error::InvalidOptions(_))));

        let negative_tolerance = ScanOptions { size_tolerance: -1.0, ..Default::default() };
        assert!(matches!(negative_tolerance.validated(), Err(Error::InvalidOptions(_))));

        let steep = ScanOptions { max_angle: 90, ..Default::default() };
        assert!(matches!(steep.validated(), Err(Error::InvalidOptions(_))));

        let no_workers = ScanOptions { workers: 0, ..Default::default() };
        assert!(matches!(no_workers.validated(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn test_thorough_angles() {
        let angles = ScanOptions::default().rotation_angles();
        assert_eq!(angles.len(), 31);
        assert_eq!(angles[0], 0);
        assert_eq!(angles[1], -15);
        assert_eq!(angles[15], -1);
        assert_eq!(angles[16], 1);
        assert_eq!(*angles.last().unwrap(), 15);
        assert_eq!(angles.iter().filter(|&&a| a == 0).count(), 1);
    }

    #[test]
    fn test_quick_mode_only_tries_zero() {
        let options = ScanOptions { quick_and_dirty: true, ..Default::default() };
        assert_eq!(options.rotation_angles(), vec![0]);
    }
}
