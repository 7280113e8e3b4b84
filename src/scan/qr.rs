//! Locating and decoding the QR label on a page

use std::fmt;
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use serde::Serialize;
use crate::events::ScanEvents;
use crate::scan::assign::Side;

/// Placeholder the LMS export leaves in participant ids
const LMS_ARTIFACT: &str = "Teilnehmer/in";

/// Identifies the student a page belongs to
///
/// Labels encode `"<display name>_<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Build a key from a raw QR payload
    ///
    /// Strips the LMS placeholder token and surrounding whitespace. Returns
    /// `None` when nothing is left.
    pub fn from_payload(raw: &str) -> Option<Self> {
        let cleaned = raw.replace(LMS_ARTIFACT, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name shown in reports: everything before the first underscore
    pub fn display_name(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded label
#[derive(Debug, Clone, PartialEq)]
pub struct QrHit {
    pub owner: OwnerKey,
    /// Half of the page the label's centre lies in
    pub side: Side,
    /// Rotation (degrees) at which the label decoded
    pub angle: i32,
}

/// Look for a QR label on a rendered page
///
/// `angles` are tried in order; the first successful decode wins. Returns
/// `None` when no angle yields a label. `page_index` is only used for the
/// log line.
pub fn locate(image: &GrayImage, angles: &[i32], page_index: usize, events: &dyn ScanEvents) -> Option<QrHit> {
    locate_with(image, angles, page_index, events, decode)
}

/// `locate` with the decoder supplied by the caller
fn locate_with(
    image: &GrayImage,
    angles: &[i32],
    page_index: usize,
    events: &dyn ScanEvents,
    decode: impl Fn(&GrayImage) -> Option<(String, f32)>,
) -> Option<QrHit> {
    for &angle in angles {
        let decoded = if angle == 0 {
            decode(image)
        } else {
            let rotated = rotate_about_center(
                image,
                (angle as f32).to_radians(),
                Interpolation::Bilinear,
                Luma([255u8]),
            );
            decode(&rotated)
        };

        let Some((payload, centre_x)) = decoded else {
            continue;
        };
        let Some(owner) = OwnerKey::from_payload(&payload) else {
            continue;
        };

        let side = if centre_x < image.width() as f32 / 2.0 { Side::Left } else { Side::Right };
        let angle_note = if angle != 0 { format!(" (angle {})", angle) } else { String::new() };
        events.info(&format!(
            "QR code on page {} read. Student: {}{}",
            page_index + 1,
            owner.display_name(),
            angle_note
        ));

        return Some(QrHit { owner, side, angle });
    }

    None
}

/// Decode the first readable QR code, returning its payload and the x
/// coordinate of its centre
fn decode(image: &GrayImage) -> Option<(String, f32)> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| image.get_pixel(x as u32, y as u32).0[0],
    );

    prepared.detect_grids().into_iter().find_map(|grid| {
        let (_, content) = grid.decode().ok()?;
        let centre_x = grid.bounds.iter().map(|p| p.x as f32).sum::<f32>() / 4.0;
        Some((content, centre_x))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::RecordingEvents;
    use qrcode::{Color, QrCode};

    /// White page with a QR code for `payload` whose left edge is at `x`
    fn page_with_code(payload: &str, x: u32) -> GrayImage {
        let code = QrCode::new(payload.as_bytes()).expect("Failed to encode QR");
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let scale = 6;

        let mut image = GrayImage::from_pixel(900, 1200, Luma([255]));
        for (i, color) in colors.iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let (mx, my) = (i as u32 % modules, i as u32 / modules);
            for dy in 0..scale {
                for dx in 0..scale {
                    image.put_pixel(x + mx * scale + dx, 100 + my * scale + dy, Luma([0]));
                }
            }
        }
        image
    }

    #[test]
    fn test_owner_key_strips_lms_artifact() {
        let key = OwnerKey::from_payload("Anna Schmidt_Teilnehmer/in12345").expect("key");
        assert_eq!(key.as_str(), "Anna Schmidt_12345");
        assert_eq!(key.display_name(), "Anna Schmidt");
    }

    #[test]
    fn test_owner_key_rejects_empty_payload() {
        assert!(OwnerKey::from_payload("").is_none());
        assert!(OwnerKey::from_payload(" Teilnehmer/in ").is_none());
    }

    #[test]
    fn test_display_name_without_underscore() {
        let key = OwnerKey::from_payload("Mueller").expect("key");
        assert_eq!(key.display_name(), "Mueller");
    }

    #[test]
    fn test_locate_left_label() {
        let events = RecordingEvents::default();
        let image = page_with_code("Mueller_111", 60);

        let hit = locate(&image, &[0], 0, &events).expect("Should find label");
        assert_eq!(hit.owner.as_str(), "Mueller_111");
        assert_eq!(hit.side, Side::Left);
        assert_eq!(hit.angle, 0);
        assert!(events.contains("info", "page 1 read. Student: Mueller"));
    }

    #[test]
    fn test_locate_right_label() {
        let events = RecordingEvents::default();
        let image = page_with_code("Schmidt_222", 600);

        let hit = locate(&image, &[0], 4, &events).expect("Should find label");
        assert_eq!(hit.owner.as_str(), "Schmidt_222");
        assert_eq!(hit.side, Side::Right);
    }

    #[test]
    fn test_blank_page_is_not_found() {
        let events = RecordingEvents::default();
        let image = GrayImage::from_pixel(400, 600, Luma([255]));
        let angles = crate::options::ScanOptions::default().rotation_angles();

        assert!(locate(&image, &angles, 2, &events).is_none());
        assert_eq!(events.count("info"), 0);
    }

    /// Decoder that only reads images differing from the upright page
    fn decodes_when_rotated(upright: &GrayImage) -> impl Fn(&GrayImage) -> Option<(String, f32)> + '_ {
        move |image| (image != upright).then(|| ("Mueller_111".to_string(), 700.0))
    }

    #[test]
    fn test_label_found_only_after_rotation() {
        let events = RecordingEvents::default();
        let mut image = GrayImage::from_pixel(900, 1200, Luma([255]));
        image.put_pixel(100, 100, Luma([0]));
        let angles = crate::options::ScanOptions::default().rotation_angles();

        let hit = locate_with(&image, &angles, 2, &events, decodes_when_rotated(&image))
            .expect("Should find label once rotated");
        assert_eq!(hit.angle, angles[1]);
        assert_ne!(hit.angle, 0);
        assert_eq!(hit.side, Side::Right);
        assert!(events.contains("info", &format!("page 3 read. Student: Mueller (angle {})", hit.angle)));
    }

    #[test]
    fn test_quick_mode_skips_rotations() {
        let events = RecordingEvents::default();
        let mut image = GrayImage::from_pixel(900, 1200, Luma([255]));
        image.put_pixel(100, 100, Luma([0]));
        let quick = crate::options::ScanOptions { quick_and_dirty: true, ..Default::default() };

        assert_eq!(quick.rotation_angles(), vec![0]);
        let hit = locate_with(&image, &quick.rotation_angles(), 2, &events, decodes_when_rotated(&image));
        assert!(hit.is_none());
        assert_eq!(events.count("info"), 0);
    }

    #[test]
    fn test_locate_is_idempotent() {
        let events = RecordingEvents::default();
        let image = page_with_code("Mueller_111", 60);
        let first = locate(&image, &[0, -1, 1], 0, &events);
        let second = locate(&image, &[0, -1, 1], 0, &events);
        assert_eq!(first, second);
    }
}
