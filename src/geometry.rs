//! Pure geometry helpers: distances, rotation, bounds, polygon extraction,
//! and segment healing. No state, no allocation beyond return values.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

/// A point in world coordinates (centimeters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Whether `p` lies inside, expanded by `tolerance` on every side.
    #[must_use]
    pub fn contains_with_tolerance(&self, p: Point, tolerance: f64) -> bool {
        p.x >= self.min_x - tolerance
            && p.x <= self.max_x + tolerance
            && p.y >= self.min_y - tolerance
            && p.y <= self.max_y + tolerance
    }

    /// Overlap test against another box, expanded by `margin`.
    #[must_use]
    pub fn intersects_with_margin(&self, other: &Bounds, margin: f64) -> bool {
        !(self.max_x < other.min_x - margin
            || self.min_x > other.max_x + margin
            || self.max_y < other.min_y - margin
            || self.min_y > other.max_y + margin)
    }

    /// Smallest box covering both.
    #[must_use]
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Rotate `point` around `center` by `angle_degrees` (clockwise-positive,
/// matching shape rotation semantics).
#[must_use]
pub fn rotate_point(point: Point, center: Point, angle_degrees: f64) -> Point {
    let rad = angle_degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    Point {
        x: center.x + (point.x - center.x) * cos - (point.y - center.y) * sin,
        y: center.y + (point.x - center.x) * sin + (point.y - center.y) * cos,
    }
}

/// Distance from `p` to the segment `a`–`b` (clamped to the segment, not the
/// infinite line).
#[must_use]
pub fn point_to_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return distance(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + t * dx, a.y + t * dy))
}

/// Ray-cast point-in-polygon test. Points on an edge may land either way;
/// callers pair this with a tolerance pass.
#[must_use]
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Bounding box of a point list. `None` when empty.
#[must_use]
pub fn bounds_of_points(points: &[Point]) -> Option<Bounds> {
    let first = points.first()?;
    let mut b = Bounds::new(first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        b.min_x = b.min_x.min(p.x);
        b.min_y = b.min_y.min(p.y);
        b.max_x = b.max_x.max(p.x);
        b.max_y = b.max_y.max(p.y);
    }
    Some(b)
}

/// Normalize a polygon-ish JSON value into a vertex list. Reference geometry
/// arrives in three encodings: `{ "points": [...] }`, a bare point array, or
/// a segment `{ "a": {...}, "b": {...} }`. Anything else yields an empty list.
#[must_use]
pub fn polygon_points(value: &serde_json::Value) -> Vec<Point> {
    if let Some(arr) = value.as_array() {
        let parsed: Option<Vec<Point>> =
            arr.iter().map(|v| serde_json::from_value(v.clone()).ok()).collect();
        return parsed.unwrap_or_default();
    }
    if let Some(points) = value.get("points") {
        return serde_json::from_value(points.clone()).unwrap_or_default();
    }
    if let (Some(a), Some(b)) = (value.get("a"), value.get("b")) {
        let a: Option<Point> = serde_json::from_value(a.clone()).ok();
        let b: Option<Point> = serde_json::from_value(b.clone()).ok();
        if let (Some(a), Some(b)) = (a, b) {
            return vec![a, b];
        }
    }
    Vec::new()
}

/// Chain loose segments into a single vertex sequence by repeatedly
/// appending whichever remaining segment starts (or ends) within `tolerance`
/// of the current tail. Used to build a slab contour from individual CAD
/// lines. A trailing vertex that closes back onto the first is dropped.
#[must_use]
pub fn merge_segments_to_polygon(segments: &[Segment], tolerance: f64) -> Vec<Point> {
    let Some((first, rest)) = segments.split_first() else {
        return Vec::new();
    };
    let mut pool: Vec<Segment> = rest.to_vec();
    let mut points = vec![first.p1, first.p2];

    let mut changed = true;
    while changed && !pool.is_empty() {
        changed = false;
        let last = points[points.len() - 1];
        for i in 0..pool.len() {
            let seg = pool[i];
            if distance(last, seg.p1) <= tolerance {
                points.push(seg.p2);
                pool.remove(i);
                changed = true;
                break;
            }
            if distance(last, seg.p2) <= tolerance {
                points.push(seg.p1);
                pool.remove(i);
                changed = true;
                break;
            }
        }
    }

    if points.len() > 2 && distance(points[0], points[points.len() - 1]) <= tolerance {
        points.pop();
    }
    points
}

/// Collapse runs of near-coincident vertices: keeps the first of any cluster
/// closer than `tolerance` to its predecessor.
#[must_use]
pub fn heal_points(points: &[Point], tolerance: f64) -> Vec<Point> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut result = vec![*first];
    for p in &points[1..] {
        let prev = result[result.len() - 1];
        if distance(prev, *p) > tolerance {
            result.push(*p);
        }
    }
    result
}
