//! Drawing Engine: multi-step shape construction.
//!
//! One construction is in progress at a time, encapsulated in
//! [`DrawState`]: beam dragging, polygon/trace point accumulation, or
//! nothing. Stamp tools (panel, prop) commit on a single click and never
//! enter a state. Preview primitives live on the render surface with the
//! `Preview` role and are discarded atomically on finish, cancel, or tool
//! switch; finished shapes are committed into the scene store.

#[cfg(test)]
#[path = "drawing_test.rs"]
mod drawing_test;

use uuid::Uuid;

use crate::consts::{
    CLOSE_TOLERANCE, COLOR_BEAM, COLOR_CLOSING_HINT, COLOR_PANEL_FILL, COLOR_PANEL_STROKE,
    COLOR_POLYGON_FILL, COLOR_POLYGON_STROKE, COLOR_PROP_FILL, COLOR_PROP_STROKE,
    COLOR_TRACE_MARKER_FILL, COLOR_TRACE_MARKER_STROKE, DEFAULT_PANEL_HEIGHT,
    DEFAULT_PANEL_WIDTH,
};
use crate::geometry::{Point, distance};
use crate::notify::{Notifier, Severity};
use crate::scene::SceneStore;
use crate::shape::{Shape, ShapeKind};
use crate::surface::{
    PrimitiveId, PrimitiveRole, PrimitiveShape, PrimitiveSpec, RenderSurface, Style, Transform,
};

/// Radius of the vertex markers shown while tracing (world units).
const MARKER_RADIUS: f64 = 4.0;

/// The construction in progress.
#[derive(Debug)]
pub enum DrawState {
    Idle,
    /// Pointer is down on a beam drag.
    Beam { start: Point, preview: PrimitiveId },
    /// Pointer is down on a rectangle drag.
    Rect { start: Point, preview: PrimitiveId },
    /// Clicks are accumulating polygon/trace vertices.
    Accumulating {
        kind: ShapeKind,
        points: Vec<Point>,
        markers: Vec<PrimitiveId>,
        segments: Vec<PrimitiveId>,
        follower: Option<PrimitiveId>,
        label: Option<PrimitiveId>,
    },
}

/// Stateful tool logic for multi-step shape construction.
pub struct DrawingEngine {
    state: DrawState,
}

impl Default for DrawingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self { state: DrawState::Idle }
    }

    /// Whether a construction is in progress.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        !matches!(self.state, DrawState::Idle)
    }

    /// Vertices accumulated so far, empty outside accumulation.
    #[must_use]
    pub fn accumulated_points(&self) -> &[Point] {
        match &self.state {
            DrawState::Accumulating { points, .. } => points,
            _ => &[],
        }
    }

    /// Current construction state, for dispatch and tests.
    #[must_use]
    pub fn state(&self) -> &DrawState {
        &self.state
    }

    // ══════════════════════════════════════════════════════════════
    // Beam tool
    // ══════════════════════════════════════════════════════════════

    /// Pointer-down with the beam tool: capture the start point and spawn
    /// the preview line. Replaces any construction in progress.
    pub fn begin_beam(&mut self, start: Point, surface: &mut dyn RenderSurface) {
        self.cancel(surface);
        let preview = surface.add(PrimitiveSpec {
            shape: PrimitiveShape::Line { a: start, b: start },
            style: Style {
                stroke: Some(COLOR_BEAM.to_owned()),
                stroke_width: 3.0,
                ..Style::default()
            },
            transform: Transform::default(),
            source_id: None,
            role: PrimitiveRole::Preview,
        });
        self.state = DrawState::Beam { start, preview };
        surface.request_render();
    }

    /// Pointer-move while dragging a beam: follow the pointer.
    pub fn update_beam(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        if let DrawState::Beam { start, preview } = self.state {
            surface.set_geometry(preview, PrimitiveShape::Line { a: start, b: pos });
            surface.request_render();
        }
    }

    /// Pointer-up: discard the preview and commit the beam. Zero-length
    /// drags commit nothing.
    pub fn finish_beam(
        &mut self,
        end: Point,
        store: &mut SceneStore,
        surface: &mut dyn RenderSurface,
    ) {
        let DrawState::Beam { start, preview } = self.state else {
            return;
        };
        surface.remove(preview);
        self.state = DrawState::Idle;
        if distance(start, end) < 1.0 {
            surface.request_render();
            return;
        }
        store.add_shape(Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Beam,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            points: Some(vec![start, end]),
            width: None,
            height: None,
            properties: serde_json::json!({
                "stroke": COLOR_BEAM,
                "strokeWidth": 3.0,
            }),
            catalog_code: None,
        });
    }

    // ══════════════════════════════════════════════════════════════
    // Rectangle tool
    // ══════════════════════════════════════════════════════════════

    /// Pointer-down with the rectangle tool: anchor one corner.
    pub fn begin_rect(&mut self, start: Point, surface: &mut dyn RenderSurface) {
        self.cancel(surface);
        let preview = surface.add(PrimitiveSpec {
            shape: PrimitiveShape::Rect { width: 0.0, height: 0.0 },
            style: Style {
                stroke: Some(COLOR_PANEL_STROKE.to_owned()),
                dashed: true,
                ..Style::default()
            },
            transform: Transform::at(start.x, start.y),
            source_id: None,
            role: PrimitiveRole::Preview,
        });
        self.state = DrawState::Rect { start, preview };
        surface.request_render();
    }

    /// Pointer-move while dragging a rectangle: resize toward the pointer.
    pub fn update_rect(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        if let DrawState::Rect { start, preview } = self.state {
            let (x, w) = ordered_span(start.x, pos.x);
            let (y, h) = ordered_span(start.y, pos.y);
            surface.set_geometry(preview, PrimitiveShape::Rect { width: w, height: h });
            surface.set_transform(preview, Transform::at(x, y));
            surface.request_render();
        }
    }

    /// Pointer-up: discard the preview and commit the rectangle. Degenerate
    /// drags commit nothing.
    pub fn finish_rect(
        &mut self,
        end: Point,
        store: &mut SceneStore,
        surface: &mut dyn RenderSurface,
    ) {
        let DrawState::Rect { start, preview } = self.state else {
            return;
        };
        surface.remove(preview);
        self.state = DrawState::Idle;
        surface.request_render();
        let (x, width) = ordered_span(start.x, end.x);
        let (y, height) = ordered_span(start.y, end.y);
        if width < 1.0 || height < 1.0 {
            return;
        }
        store.add_shape(Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Rectangle,
            x,
            y,
            rotation: 0.0,
            points: None,
            width: Some(width),
            height: Some(height),
            properties: serde_json::json!({
                "stroke": COLOR_PANEL_STROKE,
            }),
            catalog_code: None,
        });
    }

    // ══════════════════════════════════════════════════════════════
    // Polygon / trace tools
    // ══════════════════════════════════════════════════════════════

    /// A click with a trace tool: append a vertex, or auto-close when the
    /// click lands within closing tolerance of the first vertex.
    pub fn add_point(
        &mut self,
        p: Point,
        kind: ShapeKind,
        store: &mut SceneStore,
        surface: &mut dyn RenderSurface,
        notifier: &mut dyn Notifier,
    ) {
        if !matches!(self.state, DrawState::Accumulating { .. }) {
            self.cancel(surface);
            self.state = DrawState::Accumulating {
                kind,
                points: Vec::new(),
                markers: Vec::new(),
                segments: Vec::new(),
                follower: None,
                label: None,
            };
        }
        if let DrawState::Accumulating { points, .. } = &self.state {
            if points.len() >= 3 && distance(p, points[0]) <= CLOSE_TOLERANCE {
                self.finish_polygon(store, surface, notifier);
                return;
            }
        }
        let DrawState::Accumulating { points, markers, segments, .. } = &mut self.state else {
            return;
        };
        if let Some(last) = points.last().copied() {
            segments.push(surface.add(PrimitiveSpec {
                shape: PrimitiveShape::Line { a: last, b: p },
                style: Style {
                    stroke: Some(COLOR_POLYGON_STROKE.to_owned()),
                    stroke_width: 2.0,
                    ..Style::default()
                },
                transform: Transform::default(),
                source_id: None,
                role: PrimitiveRole::Preview,
            }));
        }
        markers.push(surface.add(PrimitiveSpec {
            shape: PrimitiveShape::Circle { radius: MARKER_RADIUS },
            style: Style {
                fill: Some(COLOR_TRACE_MARKER_FILL.to_owned()),
                stroke: Some(COLOR_TRACE_MARKER_STROKE.to_owned()),
                ..Style::default()
            },
            transform: Transform::at(p.x, p.y),
            source_id: None,
            role: PrimitiveRole::Preview,
        }));
        points.push(p);
        surface.request_render();
    }

    /// Pointer-move while accumulating: a dashed segment follows the
    /// pointer from the last vertex, annotated with the live distance in
    /// meters. Turns green once the pointer would close the outline.
    pub fn update_follower(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        let DrawState::Accumulating { points, follower, label, .. } = &mut self.state else {
            return;
        };
        let Some(last) = points.last().copied() else {
            return;
        };
        let closing = points.len() >= 3 && distance(pos, points[0]) <= CLOSE_TOLERANCE;
        let stroke = if closing { COLOR_CLOSING_HINT } else { COLOR_POLYGON_STROKE };
        let style = Style {
            stroke: Some(stroke.to_owned()),
            stroke_width: 1.5,
            dashed: true,
            ..Style::default()
        };
        let geometry = PrimitiveShape::Line { a: last, b: pos };
        match follower {
            Some(id) => {
                surface.set_geometry(*id, geometry);
                surface.set_style(*id, style);
            }
            None => {
                *follower = Some(surface.add(PrimitiveSpec {
                    shape: geometry,
                    style,
                    transform: Transform::default(),
                    source_id: None,
                    role: PrimitiveRole::Preview,
                }));
            }
        }
        // Centimeter world units read as meters on the label.
        let text = format!("{:.2} m", distance(last, pos) / 100.0);
        let mid = Point::new((last.x + pos.x) / 2.0, (last.y + pos.y) / 2.0);
        match label {
            Some(id) => {
                surface.set_geometry(*id, PrimitiveShape::Text { content: text });
                surface.set_transform(*id, Transform::at(mid.x, mid.y));
            }
            None => {
                *label = Some(surface.add(PrimitiveSpec {
                    shape: PrimitiveShape::Text { content: text },
                    style: Style::default(),
                    transform: Transform::at(mid.x, mid.y),
                    source_id: None,
                    role: PrimitiveRole::Preview,
                }));
            }
        }
        surface.request_render();
    }

    /// Backspace while tracing: drop the last vertex with its marker and
    /// connecting segment. Removing the only vertex cancels the trace.
    pub fn remove_last_point(&mut self, surface: &mut dyn RenderSurface) {
        let DrawState::Accumulating { points, markers, segments, .. } = &mut self.state else {
            return;
        };
        points.pop();
        if let Some(marker) = markers.pop() {
            surface.remove(marker);
        }
        if let Some(segment) = segments.pop() {
            surface.remove(segment);
        }
        if points.is_empty() {
            self.cancel(surface);
        }
        surface.request_render();
    }

    /// Finalize the accumulated outline into a shape. The closing click's
    /// duplicate vertex is dropped first; fewer than three remaining
    /// vertices refuse with a warning.
    pub fn finish_polygon(
        &mut self,
        store: &mut SceneStore,
        surface: &mut dyn RenderSurface,
        notifier: &mut dyn Notifier,
    ) {
        let state = std::mem::replace(&mut self.state, DrawState::Idle);
        let DrawState::Accumulating { kind, mut points, markers, segments, follower, label } =
            state
        else {
            return;
        };
        for id in markers.into_iter().chain(segments).chain(follower).chain(label) {
            surface.remove(id);
        }
        surface.request_render();
        if points.len() > 2 {
            let last = points[points.len() - 1];
            if distance(last, points[0]) <= CLOSE_TOLERANCE {
                points.pop();
            }
        }
        if kind == ShapeKind::Slab {
            store.create_slab_from_points(points, notifier);
            return;
        }
        if points.len() < 3 {
            tracing::warn!(count = points.len(), "polygon needs at least 3 points");
            notifier.notify(
                Severity::Warn,
                "Too few points",
                "A polygon needs at least 3 points.",
            );
            return;
        }
        store.add_shape(Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Polygon,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            points: Some(points),
            width: None,
            height: None,
            properties: serde_json::json!({
                "fill": COLOR_POLYGON_FILL,
                "stroke": COLOR_POLYGON_STROKE,
            }),
            catalog_code: None,
        });
    }

    // ══════════════════════════════════════════════════════════════
    // Stamp tools
    // ══════════════════════════════════════════════════════════════

    /// Stamp a panel centered at the click point, sized from the active
    /// catalog item when one is set.
    pub fn stamp_panel(&mut self, p: Point, store: &mut SceneStore) {
        let (width, height, code) = store.active_catalog_item().map_or(
            (DEFAULT_PANEL_WIDTH, DEFAULT_PANEL_HEIGHT, None),
            |item| (item.length, item.width, Some(item.code.clone())),
        );
        store.add_shape(Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Panel,
            x: p.x - width / 2.0,
            y: p.y - height / 2.0,
            rotation: 0.0,
            points: None,
            width: Some(width),
            height: Some(height),
            properties: serde_json::json!({
                "fill": COLOR_PANEL_FILL,
                "stroke": COLOR_PANEL_STROKE,
            }),
            catalog_code: code,
        });
    }

    /// Stamp a prop centered at the click point.
    pub fn stamp_prop(&mut self, p: Point, store: &mut SceneStore) {
        let code = store
            .active_catalog_item()
            .map(|item| item.code.clone());
        store.add_shape(Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Prop,
            x: p.x,
            y: p.y,
            rotation: 0.0,
            points: None,
            width: None,
            height: None,
            properties: serde_json::json!({
                "fill": COLOR_PROP_FILL,
                "stroke": COLOR_PROP_STROKE,
            }),
            catalog_code: code,
        });
    }

    /// Discard all in-progress preview primitives and reset to idle,
    /// committing nothing. Called on tool switch and Escape.
    pub fn cancel(&mut self, surface: &mut dyn RenderSurface) {
        let state = std::mem::replace(&mut self.state, DrawState::Idle);
        match state {
            DrawState::Idle => {}
            DrawState::Beam { preview, .. } | DrawState::Rect { preview, .. } => {
                surface.remove(preview);
                surface.request_render();
            }
            DrawState::Accumulating { markers, segments, follower, label, .. } => {
                for id in markers.into_iter().chain(segments).chain(follower).chain(label) {
                    surface.remove(id);
                }
                surface.request_render();
            }
        }
    }
}

/// Origin and extent of a drag span regardless of direction.
fn ordered_span(a: f64, b: f64) -> (f64, f64) {
    (a.min(b), (b - a).abs())
}
