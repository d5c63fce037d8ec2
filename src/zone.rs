//! Screen zones and named layouts.
//!
//! A [`Rect`] is an axis-aligned rectangle in absolute virtual-desktop
//! coordinates.  A layout is an ordered list of zones: when a layout is
//! applied, the first zone receives the first eligible window, the second
//! zone the second window, and so on.  Layouts are loaded once at startup
//! and never change afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::action::Point;

/// A rectangle in absolute virtual-desktop coordinates.
///
/// `x`/`y` may be negative (monitors left of or above the primary one);
/// `width` and `height` of a layout zone must be strictly positive, which
/// [`LayoutTable::new`] enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Construct a rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether `point` lies inside this rectangle (right/bottom edges
    /// exclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// Error produced when a layout table fails validation.
#[derive(Debug, thiserror::Error)]
pub enum LayoutTableError {
    /// A zone has a non-positive width or height.
    #[error("layout {layout:?} zone {index} has a non-positive size ({width}x{height})")]
    DegenerateZone {
        layout: String,
        index: usize,
        width: i32,
        height: i32,
    },
}

/// An immutable collection of named layouts.
///
/// Built once from configuration.  Lookup is by exact name; the zone order
/// within each layout defines assignment priority.
#[derive(Debug, Clone, Default)]
pub struct LayoutTable {
    inner: BTreeMap<String, Vec<Rect>>,
}

impl LayoutTable {
    /// Build a table from `(name, zones)` entries, validating every zone.
    ///
    /// A layout with an empty zone list is accepted (applying it arranges
    /// nothing); a zone with a non-positive dimension is rejected.
    pub fn new(
        entries: impl IntoIterator<Item = (String, Vec<Rect>)>,
    ) -> Result<Self, LayoutTableError> {
        let mut inner = BTreeMap::new();
        for (name, zones) in entries {
            for (index, zone) in zones.iter().enumerate() {
                if zone.width <= 0 || zone.height <= 0 {
                    return Err(LayoutTableError::DegenerateZone {
                        layout: name,
                        index,
                        width: zone.width,
                        height: zone.height,
                    });
                }
            }
            inner.insert(name, zones);
        }
        Ok(Self { inner })
    }

    /// Look up a layout's zones by name.
    pub fn get(&self, name: &str) -> Option<&[Rect]> {
        self.inner.get(name).map(Vec::as_slice)
    }

    /// Iterate over layout names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Number of layouts in the table.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the table contains no layouts.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_includes_top_left_excludes_bottom_right() {
        let r = Rect::new(100, 200, 50, 40);
        assert!(r.contains(Point { x: 100, y: 200 }));
        assert!(r.contains(Point { x: 149, y: 239 }));
        assert!(!r.contains(Point { x: 150, y: 200 }));
        assert!(!r.contains(Point { x: 100, y: 240 }));
        assert!(!r.contains(Point { x: 99, y: 210 }));
    }

    #[test]
    fn contains_with_negative_origin() {
        let r = Rect::new(-1920, 0, 1920, 1080);
        assert!(r.contains(Point { x: -960, y: 540 }));
        assert!(!r.contains(Point { x: 0, y: 540 }));
    }

    #[test]
    fn table_lookup_by_name() {
        let table = LayoutTable::new([(
            "halves".to_string(),
            vec![Rect::new(0, 0, 960, 1080), Rect::new(960, 0, 960, 1080)],
        )])
        .unwrap();
        assert_eq!(table.get("halves").map(<[Rect]>::len), Some(2));
        assert!(table.get("thirds").is_none());
    }

    #[test]
    fn zero_width_zone_is_rejected() {
        let err = LayoutTable::new([(
            "bad".to_string(),
            vec![Rect::new(0, 0, 0, 1080)],
        )])
        .unwrap_err();
        assert!(matches!(err, LayoutTableError::DegenerateZone { index: 0, .. }));
    }

    #[test]
    fn negative_height_zone_is_rejected() {
        let err = LayoutTable::new([(
            "bad".to_string(),
            vec![Rect::new(0, 0, 960, 1080), Rect::new(960, 0, 960, -1)],
        )])
        .unwrap_err();
        assert!(matches!(err, LayoutTableError::DegenerateZone { index: 1, .. }));
    }

    #[test]
    fn empty_layout_is_accepted() {
        let table = LayoutTable::new([("nothing".to_string(), vec![])]).unwrap();
        assert_eq!(table.get("nothing").map(<[Rect]>::len), Some(0));
    }

    #[test]
    fn names_are_sorted() {
        let table = LayoutTable::new([
            ("b".to_string(), vec![Rect::new(0, 0, 1, 1)]),
            ("a".to_string(), vec![Rect::new(0, 0, 1, 1)]),
        ])
        .unwrap();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
