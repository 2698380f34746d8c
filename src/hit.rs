//! Interaction/Selection Engine: hit-testing, click-cycling, and selection
//! chrome.
//!
//! Hit-testing runs in world space against the scene store, never against
//! surface primitives: a coarse bounding-box pass with zoom-normalized
//! tolerance, a fine point-in-shape pass retried at star offsets around the
//! pointer (thin strokes and zero-area lines would otherwise be
//! unhittable), then an area-ascending sort so small shapes nested inside
//! large ones win. Repeat clicks at the same spot cycle through the sorted
//! candidates.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::{
    AREA_TIE_EPSILON, COLOR_SNAP_GUIDE, CYCLE_THRESHOLD_PX, HIT_TOLERANCE_PX, MIN_HIT_TOLERANCE,
    PROP_RADIUS,
};
use crate::geometry::{
    Point, distance, point_in_polygon, point_to_segment_distance, rotate_point,
};
use crate::scene::SceneStore;
use crate::shape::{Shape, ShapeId, ShapeKind};
use crate::surface::{
    PrimitiveId, PrimitiveRole, PrimitiveShape, PrimitiveSpec, RenderSurface, Style, Transform,
};
use crate::viewport::Viewport;

/// Assumed context-toolbar width for horizontal centering (screen px).
const TOOLBAR_WIDTH: f64 = 160.0;

/// Vertical offset of the toolbar above the selection (screen px).
const TOOLBAR_OFFSET: f64 = 50.0;

/// Hit-testing and selection state.
pub struct InteractionEngine {
    last_click: Option<Point>,
    candidates: Vec<ShapeId>,
    candidate_index: usize,
    snap_guide: Option<PrimitiveId>,
}

impl Default for InteractionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_click: None,
            candidates: Vec::new(),
            candidate_index: 0,
            snap_guide: None,
        }
    }

    /// All shapes under a world point, smallest bounding area first. Lines
    /// count as area zero; near-equal areas are broken by distance from the
    /// pointer. Locked-layer shapes are not candidates.
    #[must_use]
    pub fn find_shapes_at_point(
        &self,
        store: &SceneStore,
        p: Point,
        zoom: f64,
    ) -> Vec<ShapeId> {
        let tolerance = (HIT_TOLERANCE_PX / zoom).max(MIN_HIT_TOLERANCE);
        let mut hits: Vec<(f64, f64, ShapeId)> = store
            .visible_shapes()
            .iter()
            .filter(|v| !v.locked)
            .filter(|v| v.shape.bounds().contains_with_tolerance(p, tolerance))
            .filter(|v| hit_with_offsets(v.shape, p, tolerance))
            .map(|v| (sort_area(v.shape), pointer_distance(v.shape, p), v.shape.id))
            .collect();
        hits.sort_by(|a, b| {
            if (a.0 - b.0).abs() < AREA_TIE_EPSILON {
                a.1.total_cmp(&b.1)
            } else {
                a.0.total_cmp(&b.0)
            }
        });
        hits.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Click-to-select with cycling: a repeat click near the previous one
    /// advances through the cached candidate list instead of re-testing, so
    /// stacked shapes are all reachable. Returns the selected id.
    pub fn select_at_point(
        &mut self,
        store: &mut SceneStore,
        p: Point,
        zoom: f64,
        additive: bool,
    ) -> Option<ShapeId> {
        let threshold = CYCLE_THRESHOLD_PX / zoom;
        let same_spot = self
            .last_click
            .is_some_and(|prev| distance(prev, p) <= threshold);
        if same_spot && self.candidates.len() > 1 {
            self.candidate_index = (self.candidate_index + 1) % self.candidates.len();
        } else {
            self.candidates = self.find_shapes_at_point(store, p, zoom);
            self.candidate_index = 0;
        }
        self.last_click = Some(p);
        let selected = self.candidates.get(self.candidate_index).copied();
        match selected {
            Some(id) => store.select(id, additive),
            None => {
                if !additive {
                    store.clear_selection();
                }
            }
        }
        selected
    }

    /// Forget the cached candidates, e.g. after the shape set changed.
    pub fn reset_cycling(&mut self) {
        self.last_click = None;
        self.candidates.clear();
        self.candidate_index = 0;
    }

    /// Screen position for the context toolbar: horizontally centered above
    /// the selection, clamped into the container, flipped below when there
    /// is no room above. `None` without a selection.
    #[must_use]
    pub fn context_toolbar_position(
        &self,
        store: &SceneStore,
        viewport: &Viewport,
        container_w: f64,
        container_h: f64,
    ) -> Option<(f64, f64)> {
        let mut bounds = None;
        for shape in store.selected_shapes() {
            let b = shape.bounds();
            bounds = Some(match bounds {
                None => b,
                Some(acc) => b.union(&acc),
            });
        }
        let bounds = bounds?;
        let top_left = viewport.world_to_screen(Point::new(bounds.min_x, bounds.min_y));
        let bottom_right = viewport.world_to_screen(Point::new(bounds.max_x, bounds.max_y));
        let center_x = (top_left.x + bottom_right.x) / 2.0;
        let x = (center_x - TOOLBAR_WIDTH / 2.0).clamp(10.0, container_w - 200.0);
        let mut y = top_left.y - TOOLBAR_OFFSET;
        if y < 10.0 {
            y = bottom_right.y + 10.0;
        }
        Some((x, y.min(container_h - TOOLBAR_OFFSET)))
    }

    /// Show the snap marker at a snap point, move it, or remove it when no
    /// snap point is in range.
    pub fn update_snap_guide(
        &mut self,
        snap: Option<Point>,
        surface: &mut dyn RenderSurface,
    ) {
        match (snap, self.snap_guide) {
            (Some(p), Some(id)) => {
                surface.set_transform(id, Transform::at(p.x, p.y));
                surface.request_render();
            }
            (Some(p), None) => {
                self.snap_guide = Some(surface.add(PrimitiveSpec {
                    shape: PrimitiveShape::Circle { radius: 5.0 },
                    style: Style {
                        stroke: Some(COLOR_SNAP_GUIDE.to_owned()),
                        stroke_width: 2.0,
                        ..Style::default()
                    },
                    transform: Transform::at(p.x, p.y),
                    source_id: None,
                    role: PrimitiveRole::Overlay,
                }));
                surface.request_render();
            }
            (None, Some(id)) => {
                surface.remove(id);
                self.snap_guide = None;
                surface.request_render();
            }
            (None, None) => {}
        }
    }
}

/// Bounding area used for the smallest-wins sort; line-like shapes count
/// as zero so they always beat filled shapes they lie on.
fn sort_area(shape: &Shape) -> f64 {
    if is_line(shape) {
        return 0.0;
    }
    shape.bounds().area()
}

fn is_line(shape: &Shape) -> bool {
    shape.kind == ShapeKind::Beam
        || (shape.kind.has_points() && shape.points.as_ref().is_some_and(|p| p.len() < 3))
}

/// Distance used as the area tie-break: to the nearest segment for lines,
/// to the bounding-box center otherwise.
fn pointer_distance(shape: &Shape, p: Point) -> f64 {
    if is_line(shape) {
        let points = shape.world_points();
        return points
            .windows(2)
            .map(|w| point_to_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min);
    }
    distance(p, shape.bounds().center())
}

/// Fine pass: exact point first, then eight star offsets at the tolerance
/// radius.
fn hit_with_offsets(shape: &Shape, p: Point, tolerance: f64) -> bool {
    if point_in_shape(shape, p, tolerance) {
        return true;
    }
    let t = tolerance;
    let offsets = [
        (t, 0.0),
        (-t, 0.0),
        (0.0, t),
        (0.0, -t),
        (t, t),
        (t, -t),
        (-t, t),
        (-t, -t),
    ];
    offsets
        .iter()
        .any(|(dx, dy)| point_in_shape(shape, Point::new(p.x + dx, p.y + dy), tolerance))
}

/// Precise world-space point-in-shape test with tolerance.
fn point_in_shape(shape: &Shape, p: Point, tolerance: f64) -> bool {
    match shape.kind {
        ShapeKind::Slab | ShapeKind::Polygon | ShapeKind::Beam => {
            let points = shape.world_points();
            if points.len() < 2 {
                return false;
            }
            let near_edge = points
                .windows(2)
                .any(|w| point_to_segment_distance(p, w[0], w[1]) <= tolerance);
            if near_edge {
                return true;
            }
            if shape.kind != ShapeKind::Beam && points.len() >= 3 {
                // Closure is implied: also test the wrap-around edge.
                let first = points[0];
                let last = points[points.len() - 1];
                if point_to_segment_distance(p, last, first) <= tolerance {
                    return true;
                }
                return point_in_polygon(p, &points);
            }
            false
        }
        ShapeKind::Panel | ShapeKind::Rectangle => {
            let b = shape.bounds();
            let local = rotate_point(p, b.center(), -shape.rotation);
            b.contains_with_tolerance(local, tolerance)
        }
        ShapeKind::Prop => distance(p, Point::new(shape.x, shape.y)) <= PROP_RADIUS + tolerance,
    }
}
