//! Page geometry and size classification

use lopdf::{Document, Object, ObjectId};
use serde::Serialize;
use crate::error::{Error, Result};

/// Canonical A4 dimensions in points (portrait)
pub const A4_POINTS: (f32, f32) = (595.0, 842.0);

/// Canonical A3 dimensions in points (portrait)
pub const A3_POINTS: (f32, f32) = (842.0, 1191.0);

/// Physical size class of a scanned page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SizeClass {
    A4,
    A3,
    Other,
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeClass::A4 => write!(f, "A4"),
            SizeClass::A3 => write!(f, "A3"),
            SizeClass::Other => write!(f, "other"),
        }
    }
}

/// Classify a page by its width and height in points
///
/// Either orientation matches. Each dimension must lie strictly within
/// `tolerance` points of the canonical value.
pub fn classify(width: f32, height: f32, tolerance: f32) -> SizeClass {
    if matches_size(width, height, A4_POINTS, tolerance) {
        SizeClass::A4
    } else if matches_size(width, height, A3_POINTS, tolerance) {
        SizeClass::A3
    } else {
        SizeClass::Other
    }
}

fn matches_size(width: f32, height: f32, (w, h): (f32, f32), tolerance: f32) -> bool {
    let close = |a: f32, b: f32| (a - b).abs() < tolerance;
    (close(width, w) && close(height, h)) || (close(width, h) && close(height, w))
}

/// Axis-aligned rectangle in PDF user space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Parse a PDF rectangle array, normalizing corner order
    pub fn from_object(object: &Object) -> Option<Self> {
        let values: Vec<f32> = object
            .as_array()
            .ok()?
            .iter()
            .filter_map(|v| v.as_float().ok())
            .collect();
        if values.len() != 4 {
            return None;
        }
        Some(Self {
            x0: values[0].min(values[2]),
            y0: values[1].min(values[3]),
            x1: values[0].max(values[2]),
            y1: values[1].max(values[3]),
        })
    }

    pub fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.x0),
            Object::Real(self.y0),
            Object::Real(self.x1),
            Object::Real(self.y1),
        ])
    }
}

/// Visible area and rotation of one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// CropBox if present, otherwise MediaBox
    pub bounds: Rect,
    /// `/Rotate` normalized to 0, 90, 180 or 270
    pub rotate: i64,
}

impl PageGeometry {
    /// Width and height as the page is displayed
    pub fn displayed_size(&self) -> (f32, f32) {
        if self.rotate % 180 == 0 {
            (self.bounds.width(), self.bounds.height())
        } else {
            (self.bounds.height(), self.bounds.width())
        }
    }

    pub fn size_class(&self, tolerance: f32) -> SizeClass {
        let (width, height) = self.displayed_size();
        classify(width, height, tolerance)
    }
}

/// Keys a page may inherit from its ancestors in the page tree
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Look up a page attribute, walking up `/Parent` links for inherited values
///
/// The value is returned as stored, so it may be an indirect reference.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound only guards against reference cycles
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Like [`inherited_attribute`], with indirect references followed
fn resolved_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let value = inherited_attribute(doc, page_id, key)?;
    doc.dereference(value).ok().map(|(_, resolved)| resolved)
}

/// Read the geometry of a page
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let media_box = resolved_attribute(doc, page_id, b"MediaBox")
        .and_then(Rect::from_object)
        .ok_or_else(|| Error::General(format!("Page object {:?} has no MediaBox", page_id)))?;

    let bounds = resolved_attribute(doc, page_id, b"CropBox")
        .and_then(Rect::from_object)
        .unwrap_or(media_box);

    let rotate = resolved_attribute(doc, page_id, b"Rotate")
        .and_then(|r| r.as_i64().ok())
        .unwrap_or(0)
        .rem_euclid(360);
    // Non-multiples of 90 are invalid; treat them as unrotated
    let rotate = if rotate % 90 == 0 { rotate } else { 0 };

    Ok(PageGeometry { bounds, rotate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Dictionary;

    #[test]
    fn test_classify_canonical_sizes() {
        assert_eq!(classify(595.0, 842.0, 5.0), SizeClass::A4);
        assert_eq!(classify(842.0, 595.0, 5.0), SizeClass::A4);
        assert_eq!(classify(842.0, 1191.0, 5.0), SizeClass::A3);
        assert_eq!(classify(1191.0, 842.0, 5.0), SizeClass::A3);
    }

    #[test]
    fn test_classify_scanner_imprecision() {
        // 595.28 x 841.89 is the exact A4 size most scanners write
        assert_eq!(classify(595.28, 841.89, 5.0), SizeClass::A4);
        assert_eq!(classify(598.0, 839.0, 5.0), SizeClass::A4);
        assert_eq!(classify(1189.0, 844.5, 5.0), SizeClass::A3);
    }

    #[test]
    fn test_classify_other() {
        // US Letter
        assert_eq!(classify(612.0, 792.0, 5.0), SizeClass::Other);
        // Just outside the tolerance
        assert_eq!(classify(600.0, 842.0, 5.0), SizeClass::Other);
        assert_eq!(classify(0.0, 0.0, 5.0), SizeClass::Other);
    }

    #[test]
    fn test_rect_normalizes_corners() {
        let object = Object::Array(vec![
            Object::Integer(842),
            Object::Integer(595),
            Object::Integer(0),
            Object::Real(0.0),
        ]);
        let rect = Rect::from_object(&object).expect("Should parse rectangle");
        assert_eq!(rect, Rect { x0: 0.0, y0: 0.0, x1: 842.0, y1: 595.0 });
    }

    #[test]
    fn test_geometry_inherits_from_parent() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Rotate", Object::Integer(-90)),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                ("MediaBox", Rect { x0: 0.0, y0: 0.0, x1: 1191.0, y1: 842.0 }.to_object()),
            ])),
        );

        let geometry = page_geometry(&doc, page_id).expect("Failed to read geometry");
        assert_eq!(geometry.rotate, 270);
        assert_eq!(geometry.displayed_size(), (842.0, 1191.0));
        assert_eq!(geometry.size_class(5.0), SizeClass::A3);
    }
}
