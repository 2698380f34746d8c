//! Renderer Surface collaborator: the drawing backend the editor core
//! projects onto.
//!
//! The surface owns disposable render primitives derived from the scene
//! store — never the other way around. A primitive may carry an opaque
//! back-reference (`source_id`) to the shape it was built from; the store
//! never holds references to primitives. Everything on the surface can be
//! rebuilt from the store at any time.
//!
//! [`MemorySurface`] is a headless reference implementation used by the test
//! suite and by hosts that rasterize elsewhere.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Bounds, Point, bounds_of_points, point_in_polygon, point_to_segment_distance, rotate_point};
use crate::shape::ShapeId;

/// Unique identifier for a render primitive.
pub type PrimitiveId = Uuid;

/// Geometry of a render primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum PrimitiveShape {
    Line { a: Point, b: Point },
    Polyline { points: Vec<Point> },
    Polygon { points: Vec<Point> },
    Rect { width: f64, height: f64 },
    Circle { radius: f64 },
    Text { content: String },
}

/// Visual style of a primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    pub stroke_width: f64,
    #[serde(default)]
    pub dashed: bool,
    pub opacity: f64,
    pub visible: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            dashed: false,
            opacity: 1.0,
            visible: true,
        }
    }
}

/// Placement of a primitive in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    /// Degrees, clockwise around the primitive's bounding-box center.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, rotation: 0.0, scale_x: 1.0, scale_y: 1.0 }
    }
}

impl Transform {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, ..Self::default() }
    }
}

/// What a primitive is for. Selection ignores decoration; resync rebuilds
/// only content; history serializes everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveRole {
    /// Projection of a scene shape.
    Content,
    /// Transient drawing-tool feedback (markers, follower segments, labels).
    Preview,
    /// Grid lines and other non-selectable decoration.
    Grid,
    /// Lazily mounted bulk-import geometry.
    Import,
    /// Selection chrome, snap guides.
    Overlay,
}

/// Full creation spec for a primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveSpec {
    pub shape: PrimitiveShape,
    pub style: Style,
    pub transform: Transform,
    /// Opaque back-reference to the scene shape this was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<ShapeId>,
    pub role: PrimitiveRole,
}

/// Error from restoring serialized surface state.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("invalid surface snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),
}

/// The drawing backend contract.
///
/// Only the canvas orchestrator and the engines it invokes mutate the
/// surface. Input events flow host → engine, not out of the surface.
pub trait RenderSurface {
    /// Create a primitive, returning its id.
    fn add(&mut self, spec: PrimitiveSpec) -> PrimitiveId;

    /// Destroy a primitive. Returns false if it was already gone.
    fn remove(&mut self, id: PrimitiveId) -> bool;

    /// Replace a primitive's geometry (e.g. a preview line following the
    /// pointer). No-op on unknown ids.
    fn set_geometry(&mut self, id: PrimitiveId, shape: PrimitiveShape);

    fn set_style(&mut self, id: PrimitiveId, style: Style);

    fn set_transform(&mut self, id: PrimitiveId, transform: Transform);

    fn transform(&self, id: PrimitiveId) -> Option<Transform>;

    /// World-space bounding box of a primitive.
    fn bounding_rect(&self, id: PrimitiveId) -> Option<Bounds>;

    /// Precise world-space hit test against one primitive, with slop.
    fn contains_point(&self, id: PrimitiveId, p: Point, tolerance: f64) -> bool;

    /// Apply the viewport as a single affine transform (zoom + pan).
    fn set_view_transform(&mut self, zoom: f64, pan_x: f64, pan_y: f64);

    /// Schedule a render pass.
    fn request_render(&mut self);

    /// Group primitives into the active composite selection (empty clears).
    fn set_selection(&mut self, ids: &[PrimitiveId]);

    /// Serialize the full surface state to an opaque blob. Used by the
    /// history engine.
    fn serialize_state(&self) -> serde_json::Value;

    /// Restore a blob produced by [`Self::serialize_state`].
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidSnapshot`] when the blob does not
    /// decode; the surface keeps its previous state in that case.
    fn restore_state(&mut self, blob: &serde_json::Value) -> Result<(), SurfaceError>;
}

/// Project a scene shape into a primitive spec carrying its id as the
/// back-reference. `opacity` comes from the owning layer.
#[must_use]
pub fn spec_for_shape(shape: &crate::shape::Shape, role: PrimitiveRole, opacity: f64) -> PrimitiveSpec {
    use crate::shape::ShapeKind;
    let props = shape.props();
    let geometry = match shape.kind {
        ShapeKind::Slab | ShapeKind::Polygon => {
            let points = shape.points.clone().unwrap_or_default();
            if points.len() >= 3 {
                PrimitiveShape::Polygon { points }
            } else {
                PrimitiveShape::Polyline { points }
            }
        }
        ShapeKind::Beam => PrimitiveShape::Polyline {
            points: shape.points.clone().unwrap_or_default(),
        },
        ShapeKind::Panel | ShapeKind::Rectangle => PrimitiveShape::Rect {
            width: shape.width.unwrap_or(0.0),
            height: shape.height.unwrap_or(0.0),
        },
        ShapeKind::Prop => PrimitiveShape::Circle { radius: crate::consts::PROP_RADIUS },
    };
    PrimitiveSpec {
        shape: geometry,
        style: Style {
            fill: props.fill().map(str::to_owned),
            stroke: props.stroke().map(str::to_owned),
            stroke_width: props.stroke_width(),
            dashed: false,
            opacity,
            visible: true,
        },
        transform: Transform {
            x: shape.x,
            y: shape.y,
            rotation: shape.rotation,
            scale_x: 1.0,
            scale_y: 1.0,
        },
        source_id: Some(shape.id),
        role,
    }
}

// =============================================================
// MemorySurface
// =============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrimitiveRecord {
    spec: PrimitiveSpec,
}

/// Headless in-memory surface. Keeps every primitive and counts render
/// requests; geometry queries are exact for unrotated primitives and
/// rotation-aware for rects and circles.
#[derive(Debug, Default)]
pub struct MemorySurface {
    primitives: HashMap<PrimitiveId, PrimitiveRecord>,
    selection: Vec<PrimitiveId>,
    view: (f64, f64, f64),
    render_requests: u64,
}

#[derive(Serialize, Deserialize)]
struct MemorySnapshot {
    primitives: Vec<(PrimitiveId, PrimitiveRecord)>,
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self { view: (1.0, 0.0, 0.0), ..Self::default() }
    }

    /// Number of live primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Ids of all live primitives, in arbitrary order.
    #[must_use]
    pub fn ids(&self) -> Vec<PrimitiveId> {
        self.primitives.keys().copied().collect()
    }

    /// Ids of primitives with the given role.
    #[must_use]
    pub fn ids_with_role(&self, role: PrimitiveRole) -> Vec<PrimitiveId> {
        self.primitives
            .iter()
            .filter(|(_, r)| r.spec.role == role)
            .map(|(id, _)| *id)
            .collect()
    }

    /// The spec of a primitive, if alive.
    #[must_use]
    pub fn spec(&self, id: PrimitiveId) -> Option<&PrimitiveSpec> {
        self.primitives.get(&id).map(|r| &r.spec)
    }

    /// Current composite selection.
    #[must_use]
    pub fn selection(&self) -> &[PrimitiveId] {
        &self.selection
    }

    /// Last applied `(zoom, pan_x, pan_y)`.
    #[must_use]
    pub fn view_transform(&self) -> (f64, f64, f64) {
        self.view
    }

    /// How many render passes were requested.
    #[must_use]
    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }

    fn local_bounds(shape: &PrimitiveShape) -> Bounds {
        match shape {
            PrimitiveShape::Line { a, b } => bounds_of_points(&[*a, *b])
                .unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0)),
            PrimitiveShape::Polyline { points } | PrimitiveShape::Polygon { points } => {
                bounds_of_points(points).unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0))
            }
            PrimitiveShape::Rect { width, height } => Bounds::new(0.0, 0.0, *width, *height),
            PrimitiveShape::Circle { radius } => {
                Bounds::new(-radius, -radius, *radius, *radius)
            }
            // Nominal box; headless surfaces don't measure text.
            PrimitiveShape::Text { .. } => Bounds::new(0.0, 0.0, 10.0, 10.0),
        }
    }
}

impl RenderSurface for MemorySurface {
    fn add(&mut self, spec: PrimitiveSpec) -> PrimitiveId {
        let id = Uuid::new_v4();
        self.primitives.insert(id, PrimitiveRecord { spec });
        id
    }

    fn remove(&mut self, id: PrimitiveId) -> bool {
        self.selection.retain(|s| *s != id);
        self.primitives.remove(&id).is_some()
    }

    fn set_geometry(&mut self, id: PrimitiveId, shape: PrimitiveShape) {
        if let Some(rec) = self.primitives.get_mut(&id) {
            rec.spec.shape = shape;
        }
    }

    fn set_style(&mut self, id: PrimitiveId, style: Style) {
        if let Some(rec) = self.primitives.get_mut(&id) {
            rec.spec.style = style;
        }
    }

    fn set_transform(&mut self, id: PrimitiveId, transform: Transform) {
        if let Some(rec) = self.primitives.get_mut(&id) {
            rec.spec.transform = transform;
        }
    }

    fn transform(&self, id: PrimitiveId) -> Option<Transform> {
        self.primitives.get(&id).map(|r| r.spec.transform)
    }

    fn bounding_rect(&self, id: PrimitiveId) -> Option<Bounds> {
        let rec = self.primitives.get(&id)?;
        let local = Self::local_bounds(&rec.spec.shape);
        let t = rec.spec.transform;
        Some(Bounds::new(
            local.min_x * t.scale_x + t.x,
            local.min_y * t.scale_y + t.y,
            local.max_x * t.scale_x + t.x,
            local.max_y * t.scale_y + t.y,
        ))
    }

    fn contains_point(&self, id: PrimitiveId, p: Point, tolerance: f64) -> bool {
        let Some(rec) = self.primitives.get(&id) else {
            return false;
        };
        let t = rec.spec.transform;
        // Undo translation (and rotation for box kinds) to test locally.
        let local = Point::new(p.x - t.x, p.y - t.y);
        match &rec.spec.shape {
            PrimitiveShape::Line { a, b } => {
                point_to_segment_distance(local, *a, *b)
                    <= tolerance.max(rec.spec.style.stroke_width)
            }
            PrimitiveShape::Polyline { points } => points
                .windows(2)
                .any(|w| point_to_segment_distance(local, w[0], w[1]) <= tolerance),
            PrimitiveShape::Polygon { points } => {
                point_in_polygon(local, points)
                    || points.windows(2).any(|w| {
                        point_to_segment_distance(local, w[0], w[1]) <= tolerance
                    })
            }
            PrimitiveShape::Rect { width, height } => {
                let center = Point::new(width / 2.0, height / 2.0);
                let local = rotate_point(local, center, -t.rotation);
                local.x >= -tolerance
                    && local.x <= width + tolerance
                    && local.y >= -tolerance
                    && local.y <= height + tolerance
            }
            PrimitiveShape::Circle { radius } => {
                (local.x.powi(2) + local.y.powi(2)).sqrt() <= radius + tolerance
            }
            PrimitiveShape::Text { .. } => {
                local.x >= 0.0 && local.x <= 10.0 && local.y >= 0.0 && local.y <= 10.0
            }
        }
    }

    fn set_view_transform(&mut self, zoom: f64, pan_x: f64, pan_y: f64) {
        self.view = (zoom, pan_x, pan_y);
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }

    fn set_selection(&mut self, ids: &[PrimitiveId]) {
        self.selection = ids.to_vec();
    }

    fn serialize_state(&self) -> serde_json::Value {
        let snapshot = MemorySnapshot {
            primitives: self.primitives.iter().map(|(id, r)| (*id, r.clone())).collect(),
        };
        serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null)
    }

    fn restore_state(&mut self, blob: &serde_json::Value) -> Result<(), SurfaceError> {
        let snapshot: MemorySnapshot = serde_json::from_value(blob.clone())?;
        self.primitives = snapshot.primitives.into_iter().collect();
        self.selection.clear();
        Ok(())
    }
}
