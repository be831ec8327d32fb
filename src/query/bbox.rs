//! Bounding box and polygon region selectors.

use serde::Serialize;

use super::selector::WhereParam;

/// A validated geographic bounding box, in degrees.
///
/// Constructed only from `bbox=left,bottom,right,top` clauses; immutable
/// once built. Validation enforces `-180 <= left,right <= 180`,
/// `-90 <= bottom,top <= 90`, `left <= right` and `bottom <= top`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl BoundingBox {
    /// Validates and builds a bounding box. Arguments are in clause source
    /// order: left, bottom, right, top.
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Result<Self, String> {
        for (name, v) in [("left", left), ("bottom", bottom), ("right", right), ("top", top)] {
            if !v.is_finite() {
                return Err(format!("{name} is not a finite number"));
            }
        }
        if !(-180.0..=180.0).contains(&left) || !(-180.0..=180.0).contains(&right) {
            return Err("longitude must be between -180 and 180".to_string());
        }
        if !(-90.0..=90.0).contains(&bottom) || !(-90.0..=90.0).contains(&top) {
            return Err("latitude must be between -90 and 90".to_string());
        }
        if left > right {
            return Err("left edge is greater than right edge".to_string());
        }
        if bottom > top {
            return Err("bottom edge is greater than top edge".to_string());
        }
        Ok(Self {
            left,
            right,
            top,
            bottom,
        })
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    /// Euclidean degree-span product. A heuristic admission threshold, not
    /// a surface area; always >= 0 once validated.
    pub fn area(&self) -> f64 {
        (self.right - self.left) * (self.top - self.bottom)
    }

    /// Whether a point lies inside the box (edges inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.left && lon <= self.right && lat >= self.bottom && lat <= self.top
    }
}

/// A bounding region expressed as a closed corner-point ring.
///
/// Produced instead of a plain box when a `bbox=` clause is combined with
/// non-bbox predicates, so the datastore can intersect the region with the
/// predicate filters in a single pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    bbox: BoundingBox,
    points: Vec<(f64, f64)>,
}

impl Polygon {
    /// Builds the five-point closed ring for a box, counter-clockwise from
    /// the bottom-left corner.
    pub fn from_bbox(bbox: BoundingBox) -> Self {
        let (l, r, t, b) = (bbox.left(), bbox.right(), bbox.top(), bbox.bottom());
        let points = vec![(l, b), (r, b), (r, t), (l, t), (l, b)];
        Self { bbox, points }
    }

    /// The (lon, lat) ring, first point repeated last.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn area(&self) -> f64 {
        self.bbox.area()
    }

    /// Well-known-text rendering of the ring, the single where parameter of
    /// a polygon selector.
    pub fn wkt(&self) -> String {
        let ring = self
            .points
            .iter()
            .map(|(lon, lat)| format!("{lon} {lat}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("POLYGON(({ring}))")
    }
}

/// One entry of a descriptor's bounding-region list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BboxSelector {
    Box(BoundingBox),
    Polygon(Polygon),
}

impl BboxSelector {
    /// The underlying box, regardless of representation.
    pub fn bounds(&self) -> &BoundingBox {
        match self {
            Self::Box(b) => b,
            Self::Polygon(p) => p.bbox(),
        }
    }

    pub fn area(&self) -> f64 {
        self.bounds().area()
    }

    pub fn where_params(&self) -> Vec<WhereParam> {
        match self {
            Self::Box(b) => vec![
                b.left().into(),
                b.bottom().into(),
                b.right().into(),
                b.top().into(),
            ],
            Self::Polygon(p) => vec![WhereParam::Str(p.wkt())],
        }
    }
}
