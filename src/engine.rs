//! Canvas Orchestrator: event dispatch and store↔surface synchronization.
//!
//! | Concern            | Where it goes                                  |
//! |--------------------|------------------------------------------------|
//! | Pointer/key events | dispatched to drawing/interaction by tool      |
//! | Store changes      | drained from a shared set, full diff-and-rebuild resync |
//! | Viewport changes   | applied as a direct transform, never a resync  |
//! | Bulk imports       | pumped incrementally into the chunk renderer   |
//! | History            | saved at explicit commit points                |
//!
//! The engine owns the store, viewport, and sub-engines; the render surface
//! stays outside and is threaded through every call, so hosts can back it
//! with a real canvas or [`crate::surface::MemorySurface`].
//!
//! Store and viewport listeners only record *that* something changed into
//! shared cells; the work happens on the next [`Engine::tick`] or at the
//! end of the triggering event handler. That keeps listener callbacks free
//! of surface access and makes re-entrancy a non-issue.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Instant;

use uuid::Uuid;

use crate::chunk::{ChunkRenderer, ChunkStats};
use crate::consts::{PASTE_OFFSET, RESYNC_IMPORT_CAP, SNAP_RADIUS};
use crate::drawing::{DrawState, DrawingEngine};
use crate::geometry::{Bounds, Point};
use crate::hit::InteractionEngine;
use crate::history::History;
use crate::import::{GeometryImport, ImportEvent, RawGeometry};
use crate::input::{Button, Key, Modifiers, Tool, WheelDelta};
use crate::notify::{Notifier, Severity};
use crate::scene::{ChangeEvent, SceneStore};
use crate::shape::{PartialShape, Shape, ShapeId};
use crate::surface::{
    PrimitiveId, PrimitiveRole, PrimitiveShape, PrimitiveSpec, RenderSurface, Style, Transform,
    spec_for_shape,
};
use crate::viewport::Viewport;

/// Wheel zoom step per notch.
const WHEEL_ZOOM_FACTOR: f64 = 1.1;

/// Grid lines beyond this count are not drawn (zoomed far out).
const MAX_GRID_LINES: usize = 400;

/// An in-progress pointer drag.
enum Drag {
    None,
    /// Middle-button or pan-tool drag; position in screen space.
    Panning { last: Point },
    /// Dragging the selection; position in world space.
    MovingSelection { last: Point },
}

/// Wires the store, viewport, and sub-engines to a render surface.
pub struct Engine {
    store: SceneStore,
    viewport: Viewport,
    drawing: DrawingEngine,
    interaction: InteractionEngine,
    history: History,
    chunks: ChunkRenderer,
    import: Option<GeometryImport>,
    /// Content primitives on the surface, by source shape.
    shape_map: HashMap<ShapeId, PrimitiveId>,
    grid_primitives: Vec<PrimitiveId>,
    changes: Rc<RefCell<HashSet<ChangeEvent>>>,
    view_moved: Rc<RefCell<bool>>,
    auto_fit_done: bool,
    drag: Drag,
    clipboard: Vec<Shape>,
}

impl Engine {
    /// Build an engine for a container of the given device-pixel size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        let mut store = SceneStore::new();
        let mut viewport = Viewport::new();
        viewport.set_size(width, height);

        let changes: Rc<RefCell<HashSet<ChangeEvent>>> = Rc::default();
        let sink = Rc::clone(&changes);
        store.subscribe(Box::new(move |event| {
            sink.borrow_mut().insert(event);
        }));

        let view_moved: Rc<RefCell<bool>> = Rc::default();
        let flag = Rc::clone(&view_moved);
        viewport.on_view_change(Box::new(move |_, _, _| {
            *flag.borrow_mut() = true;
        }));

        Self {
            store,
            viewport,
            drawing: DrawingEngine::new(),
            interaction: InteractionEngine::new(),
            history: History::new(),
            chunks: ChunkRenderer::new(),
            import: None,
            shape_map: HashMap::new(),
            grid_primitives: Vec::new(),
            changes,
            view_moved,
            auto_fit_done: false,
            drag: Drag::None,
            clipboard: Vec::new(),
        }
    }

    // --- Accessors ---

    #[must_use]
    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SceneStore {
        &mut self.store
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn drawing(&self) -> &DrawingEngine {
        &self.drawing
    }

    #[must_use]
    pub fn chunk_stats(&self) -> ChunkStats {
        self.chunks.stats()
    }

    /// Surface primitive backing a shape, if currently mounted.
    #[must_use]
    pub fn primitive_for(&self, shape_id: ShapeId) -> Option<PrimitiveId> {
        self.shape_map.get(&shape_id).copied()
    }

    // ══════════════════════════════════════════════════════════════
    // Frame loop
    // ══════════════════════════════════════════════════════════════

    /// Per-animation-frame tick: apply deferred viewport updates, pump any
    /// running import, drain store changes, and give the chunk renderer its
    /// slot.
    pub fn tick(&mut self, surface: &mut dyn RenderSurface, now: Instant) {
        self.viewport.tick_frame();
        self.pump_import(surface);
        self.flush_changes(surface);
        self.chunks.tick(&self.viewport, surface, now);
    }

    /// Container resize: keep the viewport and surface size in sync.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.set_size(width, height);
        *self.view_moved.borrow_mut() = true;
    }

    // ══════════════════════════════════════════════════════════════
    // Pointer events (positions in screen space)
    // ══════════════════════════════════════════════════════════════

    pub fn pointer_down(
        &mut self,
        pos: Point,
        button: Button,
        modifiers: Modifiers,
        surface: &mut dyn RenderSurface,
        notifier: &mut dyn Notifier,
    ) {
        if button == Button::Middle || self.store.active_tool() == Tool::Pan {
            self.drag = Drag::Panning { last: pos };
            return;
        }
        if button != Button::Primary {
            return;
        }
        let world = self.viewport.screen_to_world(pos);
        match self.store.active_tool() {
            Tool::Select => {
                let zoom = self.viewport.zoom();
                let selected =
                    self.interaction
                        .select_at_point(&mut self.store, world, zoom, modifiers.shift);
                if selected.is_some() {
                    self.drag = Drag::MovingSelection { last: world };
                }
                self.flush_changes(surface);
            }
            Tool::Pan => {}
            Tool::AddPanel => {
                let p = self.store.snap_to_grid_point(world);
                self.drawing.stamp_panel(p, &mut self.store);
                self.commit_history(surface);
            }
            Tool::AddProp => {
                let p = self.store.snap_to_grid_point(world);
                self.drawing.stamp_prop(p, &mut self.store);
                self.commit_history(surface);
            }
            Tool::DrawBeam => {
                let p = self.snapped(world);
                self.drawing.begin_beam(p, surface);
            }
            Tool::Rectangle => {
                self.drawing.begin_rect(world, surface);
            }
            Tool::DrawPolygon | Tool::TraceSlab => {
                let kind = if self.store.active_tool() == Tool::TraceSlab {
                    crate::shape::ShapeKind::Slab
                } else {
                    crate::shape::ShapeKind::Polygon
                };
                let p = self.snapped(world);
                self.drawing
                    .add_point(p, kind, &mut self.store, surface, notifier);
                // An auto-closing click leaves the engine idle again.
                if !self.drawing.in_progress() {
                    self.interaction.update_snap_guide(None, surface);
                    self.commit_history(surface);
                }
            }
        }
    }

    pub fn pointer_move(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        if let Drag::Panning { last } = self.drag {
            self.viewport.pan_by(pos.x - last.x, pos.y - last.y);
            self.drag = Drag::Panning { last: pos };
            self.flush_changes(surface);
            return;
        }
        let world = self.viewport.screen_to_world(pos);
        let tool = self.store.active_tool();
        if tool.snaps() {
            let snap = self.store.find_nearest_snap_point(world, SNAP_RADIUS);
            self.interaction.update_snap_guide(snap, surface);
        }
        match tool {
            Tool::Select => {
                if let Drag::MovingSelection { last } = self.drag {
                    self.translate_selection(world.x - last.x, world.y - last.y);
                    self.drag = Drag::MovingSelection { last: world };
                    self.flush_changes(surface);
                }
            }
            Tool::DrawBeam => {
                let p = self.snapped(world);
                self.drawing.update_beam(p, surface);
            }
            Tool::Rectangle => {
                self.drawing.update_rect(world, surface);
            }
            Tool::DrawPolygon | Tool::TraceSlab => {
                let p = self.snapped(world);
                self.drawing.update_follower(p, surface);
            }
            Tool::Pan | Tool::AddPanel | Tool::AddProp => {}
        }
    }

    pub fn pointer_up(&mut self, pos: Point, surface: &mut dyn RenderSurface) {
        let world = self.viewport.screen_to_world(pos);
        match std::mem::replace(&mut self.drag, Drag::None) {
            Drag::Panning { .. } => return,
            Drag::MovingSelection { .. } => {
                self.commit_history(surface);
                return;
            }
            Drag::None => {}
        }
        match self.drawing.state() {
            DrawState::Beam { .. } => {
                let p = self.snapped(world);
                self.drawing.finish_beam(p, &mut self.store, surface);
                self.commit_history(surface);
            }
            DrawState::Rect { .. } => {
                self.drawing.finish_rect(world, &mut self.store, surface);
                self.commit_history(surface);
            }
            _ => {}
        }
    }

    /// Double-click finishes an accumulating trace explicitly.
    pub fn double_click(&mut self, surface: &mut dyn RenderSurface, notifier: &mut dyn Notifier) {
        if matches!(self.drawing.state(), DrawState::Accumulating { .. }) {
            self.drawing.finish_polygon(&mut self.store, surface, notifier);
            self.interaction.update_snap_guide(None, surface);
            self.commit_history(surface);
        }
    }

    /// Wheel zoom anchored at the pointer.
    pub fn wheel(&mut self, delta: WheelDelta, pos: Point, surface: &mut dyn RenderSurface) {
        let factor = if delta.dy < 0.0 { WHEEL_ZOOM_FACTOR } else { 1.0 / WHEEL_ZOOM_FACTOR };
        self.viewport.set_zoom(self.viewport.zoom() * factor, Some(pos));
        self.flush_changes(surface);
    }

    // ══════════════════════════════════════════════════════════════
    // Keyboard
    // ══════════════════════════════════════════════════════════════

    /// Dispatch a keyboard shortcut. `in_text_input` suppresses everything
    /// while a text field owns focus.
    pub fn key_down(
        &mut self,
        key: &Key,
        modifiers: Modifiers,
        in_text_input: bool,
        surface: &mut dyn RenderSurface,
    ) {
        if in_text_input {
            return;
        }
        let k = key.lower();
        if modifiers.primary() {
            match k.as_str() {
                "c" => self.copy_selection(),
                "v" => self.paste(surface),
                "a" => self.select_all(surface),
                "z" => {
                    if modifiers.shift {
                        self.redo(surface);
                    } else {
                        self.undo(surface);
                    }
                }
                _ => {}
            }
            return;
        }
        match k.as_str() {
            "backspace" if self.drawing.in_progress() => {
                self.drawing.remove_last_point(surface);
            }
            "delete" | "backspace" => {
                self.store.remove_selected_shapes();
                self.commit_history(surface);
            }
            "escape" => {
                self.drawing.cancel(surface);
                self.interaction.update_snap_guide(None, surface);
                self.store.clear_selection();
                self.store.set_active_tool(Tool::Select);
                self.flush_changes(surface);
            }
            "r" => self.rotate_selection(surface),
            _ => {
                if let Some(tool) = Tool::from_shortcut(&k) {
                    self.drawing.cancel(surface);
                    self.interaction.update_snap_guide(None, surface);
                    self.store.set_active_tool(tool);
                    self.flush_changes(surface);
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Edit commands
    // ══════════════════════════════════════════════════════════════

    /// Copy the selection to the internal clipboard.
    pub fn copy_selection(&mut self) {
        self.clipboard = self.store.selected_shapes().into_iter().cloned().collect();
    }

    /// Paste clipboard shapes with fresh ids at a fixed offset, selecting
    /// the pasted copies.
    pub fn paste(&mut self, surface: &mut dyn RenderSurface) {
        if self.clipboard.is_empty() {
            return;
        }
        let mut pasted = Vec::with_capacity(self.clipboard.len());
        for original in self.clipboard.clone() {
            let mut shape = original;
            shape.id = Uuid::new_v4();
            shape.x += PASTE_OFFSET;
            shape.y += PASTE_OFFSET;
            pasted.push(shape.id);
            self.store.add_shape(shape);
        }
        self.store.select_multiple(pasted);
        self.commit_history(surface);
    }

    /// Select every unlocked, non-imported shape of the active tab.
    pub fn select_all(&mut self, surface: &mut dyn RenderSurface) {
        let ids: Vec<ShapeId> = self
            .store
            .visible_shapes()
            .iter()
            .filter(|v| !v.locked && !v.shape.props().from_import())
            .map(|v| v.shape.id)
            .collect();
        self.store.select_multiple(ids);
        self.flush_changes(surface);
    }

    /// Rotate the selection by 90 degrees.
    pub fn rotate_selection(&mut self, surface: &mut dyn RenderSurface) {
        let updates: Vec<(ShapeId, f64)> = self
            .store
            .selected_shapes()
            .iter()
            .map(|s| (s.id, (s.rotation + 90.0) % 360.0))
            .collect();
        if updates.is_empty() {
            return;
        }
        for (id, rotation) in updates {
            self.store.update_shape(
                id,
                &PartialShape { rotation: Some(rotation), ..PartialShape::default() },
            );
        }
        self.commit_history(surface);
    }

    pub fn undo(&mut self, surface: &mut dyn RenderSurface) -> bool {
        let restored = self.history.undo(&mut self.store, surface);
        if restored {
            self.flush_changes(surface);
        }
        restored
    }

    pub fn redo(&mut self, surface: &mut dyn RenderSurface) -> bool {
        let restored = self.history.redo(&mut self.store, surface);
        if restored {
            self.flush_changes(surface);
        }
        restored
    }

    /// Screen position for the context toolbar above the selection.
    #[must_use]
    pub fn toolbar_position(&self) -> Option<(f64, f64)> {
        let (w, h) = self.viewport.size();
        self.interaction
            .context_toolbar_position(&self.store, &self.viewport, w, h)
    }

    // ══════════════════════════════════════════════════════════════
    // Bulk import
    // ══════════════════════════════════════════════════════════════

    /// Start a chunked import of extracted geometry, superseding any import
    /// in progress.
    pub fn start_import(&mut self, geometry: &RawGeometry, surface: &mut dyn RenderSurface) {
        let generation = self.chunks.begin_import(surface);
        self.import = Some(GeometryImport::from_geometry(geometry, generation));
    }

    /// Decode and start an import from a raw JSON payload. A payload that
    /// fails to decode is abandoned with an error toast; chunks from the
    /// previous import stay mounted.
    pub fn start_import_payload(
        &mut self,
        payload: &serde_json::Value,
        surface: &mut dyn RenderSurface,
        notifier: &mut dyn Notifier,
    ) {
        match serde_json::from_value::<RawGeometry>(payload.clone()) {
            Ok(geometry) => self.start_import(&geometry, surface),
            Err(e) => {
                tracing::warn!(error = %e, "geometry payload rejected");
                notifier.notify(Severity::Error, "Import failed", &e.to_string());
            }
        }
    }

    fn pump_import(&mut self, surface: &mut dyn RenderSurface) {
        let Some(import) = &mut self.import else {
            return;
        };
        let generation = import.generation();
        let events = import.pump();
        let done = import.is_done();
        for event in events {
            match event {
                ImportEvent::Chunk { shapes, .. } => {
                    self.chunks.add_chunk(generation, shapes);
                }
                ImportEvent::Progress { percent } => {
                    tracing::debug!(percent, "import progress");
                }
                ImportEvent::Complete { total } => {
                    tracing::info!(total, "import complete");
                    self.chunks.update_visibility(&self.viewport, surface);
                }
            }
        }
        if done {
            self.import = None;
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Synchronization
    // ══════════════════════════════════════════════════════════════

    /// Drain pending store and viewport changes and apply them to the
    /// surface. Shape-set changes trigger a full diff-and-rebuild; viewport
    /// changes only update the transform.
    pub fn flush_changes(&mut self, surface: &mut dyn RenderSurface) {
        let events: Vec<ChangeEvent> = self.changes.borrow_mut().drain().collect();
        let mut shapes = false;
        let mut selection = false;
        let mut grid = false;
        for event in events {
            match event {
                ChangeEvent::Shapes | ChangeEvent::ActiveTab | ChangeEvent::ActiveLayer => {
                    shapes = true;
                }
                ChangeEvent::Selection => selection = true,
                ChangeEvent::Grid => grid = true,
                ChangeEvent::Tool => {
                    self.drawing.cancel(surface);
                    self.interaction.update_snap_guide(None, surface);
                }
            }
        }
        if shapes {
            self.resync(surface);
            self.interaction.reset_cycling();
            self.maybe_auto_fit();
        }
        if shapes || selection {
            self.sync_selection(surface);
        }
        let moved = std::mem::take(&mut *self.view_moved.borrow_mut());
        if moved {
            let (zoom, (pan_x, pan_y)) = (self.viewport.zoom(), self.viewport.pan());
            surface.set_view_transform(zoom, pan_x, pan_y);
            self.chunks.on_view_change(Instant::now());
            surface.request_render();
        }
        if grid || moved {
            self.redraw_grid(surface);
        }
    }

    /// Full rebuild of content primitives from the store. Imported shapes
    /// beyond the safety cap are skipped; they render through chunks.
    fn resync(&mut self, surface: &mut dyn RenderSurface) {
        for (_, id) in self.shape_map.drain() {
            surface.remove(id);
        }
        let visible = self.store.visible_shapes();
        let import_count = visible
            .iter()
            .filter(|v| v.shape.props().from_import())
            .count();
        let skip_imports = import_count > RESYNC_IMPORT_CAP;
        if skip_imports {
            tracing::warn!(import_count, "imported shapes skipped during resync");
        }
        for v in &visible {
            if skip_imports && v.shape.props().from_import() {
                continue;
            }
            let id = surface.add(spec_for_shape(v.shape, PrimitiveRole::Content, v.opacity));
            self.shape_map.insert(v.shape.id, id);
        }
        surface.request_render();
    }

    fn sync_selection(&mut self, surface: &mut dyn RenderSurface) {
        let prims: Vec<PrimitiveId> = self
            .store
            .selection()
            .iter()
            .filter_map(|id| self.shape_map.get(id).copied())
            .collect();
        surface.set_selection(&prims);
        surface.request_render();
    }

    /// One-shot fit-to-content the first time real content appears.
    fn maybe_auto_fit(&mut self) {
        if self.auto_fit_done {
            return;
        }
        let mut bounds: Option<Bounds> = None;
        for shape in self.store.all_shapes() {
            let b = shape.bounds();
            bounds = Some(match bounds {
                None => b,
                Some(acc) => acc.union(&b),
            });
        }
        if let Some(b) = bounds {
            if b.area() > 0.0 {
                self.viewport.zoom_to_fit(&b);
                self.auto_fit_done = true;
            }
        }
    }

    fn redraw_grid(&mut self, surface: &mut dyn RenderSurface) {
        for id in self.grid_primitives.drain(..) {
            surface.remove(id);
        }
        if !self.store.show_grid() {
            surface.request_render();
            return;
        }
        let b = self.viewport.visible_bounds();
        let step = self.store.grid_size();
        let lines = (b.width() / step + b.height() / step).ceil();
        if !(0.0..=MAX_GRID_LINES as f64).contains(&lines) {
            surface.request_render();
            return;
        }
        let style = Style {
            stroke: Some("#e0e0e0".to_owned()),
            ..Style::default()
        };
        let mut x = (b.min_x / step).floor() * step;
        while x <= b.max_x {
            self.grid_primitives.push(surface.add(PrimitiveSpec {
                shape: PrimitiveShape::Line {
                    a: Point::new(x, b.min_y),
                    b: Point::new(x, b.max_y),
                },
                style: style.clone(),
                transform: Transform::default(),
                source_id: None,
                role: PrimitiveRole::Grid,
            }));
            x += step;
        }
        let mut y = (b.min_y / step).floor() * step;
        while y <= b.max_y {
            self.grid_primitives.push(surface.add(PrimitiveSpec {
                shape: PrimitiveShape::Line {
                    a: Point::new(b.min_x, y),
                    b: Point::new(b.max_x, y),
                },
                style: style.clone(),
                transform: Transform::default(),
                source_id: None,
                role: PrimitiveRole::Grid,
            }));
            y += step;
        }
        surface.request_render();
    }

    // --- Helpers ---

    /// Apply reference-geometry snapping, falling back to grid snapping.
    fn snapped(&self, world: Point) -> Point {
        self.store
            .find_nearest_snap_point(world, SNAP_RADIUS)
            .unwrap_or_else(|| self.store.snap_to_grid_point(world))
    }

    fn translate_selection(&mut self, dx: f64, dy: f64) {
        let updates: Vec<(ShapeId, f64, f64)> = self
            .store
            .selected_shapes()
            .iter()
            .map(|s| (s.id, s.x + dx, s.y + dy))
            .collect();
        for (id, x, y) in updates {
            self.store.update_shape(
                id,
                &PartialShape { x: Some(x), y: Some(y), ..PartialShape::default() },
            );
        }
    }

    /// Record the current state as the history baseline, e.g. right after
    /// loading a project.
    pub fn mark_history_baseline(&mut self, surface: &mut dyn RenderSurface) {
        self.flush_changes(surface);
        self.history.save_state(&self.store, surface);
    }

    fn commit_history(&mut self, surface: &mut dyn RenderSurface) {
        self.flush_changes(surface);
        self.history.save_state(&self.store, surface);
    }
}
