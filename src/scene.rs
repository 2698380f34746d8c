//! Scene Store: the authoritative document state.
//!
//! Owns the tabs → layers → shapes tree plus selection, active tool, active
//! tab/layer, grid settings, and background reference geometry. All
//! mutations are synchronous state transitions; after each committed
//! mutation the affected slice is announced on a subscribe/notify bus
//! ([`ChangeEvent`]). Reads are plain synchronous getters.
//!
//! Operations that can refuse (too few points, protected layer, last tab)
//! never error: they no-op, log a `tracing::warn!`, and surface a toast via
//! the caller's [`Notifier`].
//!
//! Persistence lives in [`crate::project`] and formwork-generation ingest in
//! [`crate::formwork`]; both extend this type with further `impl` blocks.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::catalog::CatalogItem;
use crate::consts::{COLOR_CAD_LAYER, DEFAULT_GRID_SIZE};
use crate::geometry::{Point, distance};
use crate::import::RawGeometry;
use crate::input::Tool;
use crate::notify::{Notifier, Severity};
use crate::shape::{Layer, LayerId, LayerKind, PartialShape, Shape, ShapeId, ShapeKind, Tab, TabId};

/// Badge colors assigned round-robin-by-chance to new user layers.
const LAYER_PALETTE: [&str; 8] = [
    "#e53935", "#8e24aa", "#3949ab", "#039be5", "#00897b", "#7cb342", "#fdd835", "#fb8c00",
];

/// Which store slice a committed mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    /// Shape set of the active tab changed (add/update/remove/reparent).
    Shapes,
    Selection,
    ActiveTab,
    ActiveLayer,
    Tool,
    Grid,
}

/// Identifier for a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// A shape flattened out of the layer tree, annotated with the layer state
/// a renderer or hit-tester needs.
#[derive(Debug, Clone, Copy)]
pub struct VisibleShape<'a> {
    pub shape: &'a Shape,
    pub layer_id: LayerId,
    pub locked: bool,
    pub opacity: f64,
}

/// The authoritative editor document plus its interaction state.
pub struct SceneStore {
    pub(crate) tabs: Vec<Tab>,
    pub(crate) active_tab: Option<TabId>,
    pub(crate) active_layer: Option<LayerId>,
    pub(crate) selection: Vec<ShapeId>,
    active_tool: Tool,
    active_catalog_item: Option<CatalogItem>,
    grid_size: f64,
    snap_to_grid: bool,
    show_grid: bool,
    pub(crate) background_url: Option<String>,
    pub(crate) reference_geometry: Option<RawGeometry>,
    listeners: Vec<(SubscriptionId, Box<dyn FnMut(ChangeEvent)>)>,
    next_subscription: u64,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    /// An empty document: one active tab with one active user layer.
    #[must_use]
    pub fn new() -> Self {
        let mut store = Self {
            tabs: Vec::new(),
            active_tab: None,
            active_layer: None,
            selection: Vec::new(),
            active_tool: Tool::Select,
            active_catalog_item: None,
            grid_size: DEFAULT_GRID_SIZE,
            snap_to_grid: false,
            show_grid: true,
            background_url: None,
            reference_geometry: None,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        let tab = default_tab("Tab 1", true, false);
        store.active_tab = Some(tab.id);
        store.active_layer = tab.layers.first().map(|l| l.id);
        store.tabs.push(tab);
        store
    }

    // ══════════════════════════════════════════════════════════════
    // Change notification
    // ══════════════════════════════════════════════════════════════

    /// Register a listener invoked synchronously after each committed
    /// mutation, with the slice that changed.
    pub fn subscribe(&mut self, listener: Box<dyn FnMut(ChangeEvent)>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub(crate) fn notify_change(&mut self, event: ChangeEvent) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in &mut listeners {
            listener(event);
        }
        listeners.extend(self.listeners.drain(..));
        self.listeners = listeners;
    }

    // ══════════════════════════════════════════════════════════════
    // State access
    // ══════════════════════════════════════════════════════════════

    #[must_use]
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    #[must_use]
    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active_tab
    }

    #[must_use]
    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.active_layer
    }

    #[must_use]
    pub fn active_tab(&self) -> Option<&Tab> {
        let id = self.active_tab?;
        self.tabs.iter().find(|t| t.id == id)
    }

    pub(crate) fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        let id = self.active_tab?;
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        let layer_id = self.active_layer?;
        self.active_tab_mut()?.layer_mut(layer_id)
    }

    #[must_use]
    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    #[must_use]
    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    #[must_use]
    pub fn active_catalog_item(&self) -> Option<&CatalogItem> {
        self.active_catalog_item.as_ref()
    }

    #[must_use]
    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    #[must_use]
    pub fn snap_to_grid(&self) -> bool {
        self.snap_to_grid
    }

    #[must_use]
    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    #[must_use]
    pub fn background_url(&self) -> Option<&str> {
        self.background_url.as_deref()
    }

    #[must_use]
    pub fn reference_geometry(&self) -> Option<&RawGeometry> {
        self.reference_geometry.as_ref()
    }

    // ══════════════════════════════════════════════════════════════
    // Computed views
    // ══════════════════════════════════════════════════════════════

    /// Layers of the active tab, in stacking order.
    #[must_use]
    pub fn active_layers(&self) -> &[Layer] {
        self.active_tab().map_or(&[], |t| t.layers.as_slice())
    }

    /// Shapes of visible layers of the active tab, flattened with layer
    /// annotations, in layer-then-insertion order.
    #[must_use]
    pub fn visible_shapes(&self) -> Vec<VisibleShape<'_>> {
        self.active_layers()
            .iter()
            .filter(|l| l.is_visible)
            .flat_map(|l| {
                l.shapes.iter().map(|shape| VisibleShape {
                    shape,
                    layer_id: l.id,
                    locked: l.is_locked,
                    opacity: l.opacity,
                })
            })
            .collect()
    }

    /// Every shape of the active tab regardless of visibility.
    #[must_use]
    pub fn all_shapes(&self) -> Vec<&Shape> {
        self.active_layers().iter().flat_map(|l| l.shapes.iter()).collect()
    }

    /// Currently selected shapes, skipping any id that no longer resolves.
    #[must_use]
    pub fn selected_shapes(&self) -> Vec<&Shape> {
        self.selection
            .iter()
            .filter_map(|id| self.find_shape(*id))
            .collect()
    }

    /// Whether the active tab contains at least one slab/polygon with three
    /// or more points (the precondition for formwork generation).
    #[must_use]
    pub fn is_slab_defined(&self) -> bool {
        self.all_shapes().iter().any(|s| {
            matches!(s.kind, ShapeKind::Slab | ShapeKind::Polygon)
                && s.points.as_ref().is_some_and(|p| p.len() >= 3)
        })
    }

    /// Find a shape by id across all layers of the active tab.
    #[must_use]
    pub fn find_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.all_shapes().into_iter().find(|s| s.id == id)
    }

    // ══════════════════════════════════════════════════════════════
    // Shape operations
    // ══════════════════════════════════════════════════════════════

    /// Append a shape to the active layer and select it. No-op without an
    /// active tab/layer.
    pub fn add_shape(&mut self, shape: Shape) {
        let id = shape.id;
        let Some(layer) = self.active_layer_mut() else {
            tracing::warn!(shape_id = %id, "add_shape without an active layer");
            return;
        };
        layer.shapes.push(shape);
        self.notify_change(ChangeEvent::Shapes);
        self.selection = vec![id];
        self.notify_change(ChangeEvent::Selection);
    }

    /// Merge a sparse update into the shape with matching id. No-op when the
    /// id does not resolve in the active tab.
    pub fn update_shape(&mut self, id: ShapeId, update: &PartialShape) {
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        for layer in &mut tab.layers {
            if let Some(shape) = layer.shapes.iter_mut().find(|s| s.id == id) {
                update.apply_to(shape);
                self.notify_change(ChangeEvent::Shapes);
                return;
            }
        }
    }

    /// Delete one shape from whichever layer of the active tab holds it.
    pub fn remove_shape(&mut self, id: ShapeId) {
        self.remove_shapes(&[id]);
    }

    /// Delete several shapes and purge them from the selection.
    pub fn remove_shapes(&mut self, ids: &[ShapeId]) {
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        let mut removed = false;
        for layer in &mut tab.layers {
            let before = layer.shapes.len();
            layer.shapes.retain(|s| !ids.contains(&s.id));
            removed |= layer.shapes.len() != before;
        }
        if removed {
            self.notify_change(ChangeEvent::Shapes);
        }
        let before = self.selection.len();
        self.selection.retain(|sid| !ids.contains(sid));
        if self.selection.len() != before {
            self.notify_change(ChangeEvent::Selection);
        }
    }

    /// Delete the whole selection in one call.
    pub fn remove_selected_shapes(&mut self) {
        let ids = self.selection.clone();
        if !ids.is_empty() {
            self.remove_shapes(&ids);
        }
    }

    /// Empty every layer of the active tab and clear the selection.
    pub fn clear_canvas(&mut self) {
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        for layer in &mut tab.layers {
            layer.shapes.clear();
        }
        self.notify_change(ChangeEvent::Shapes);
        self.clear_selection();
    }

    /// Build a slab shape from traced points. Refuses below three points.
    pub fn create_slab_from_points(&mut self, points: Vec<Point>, notifier: &mut dyn Notifier) {
        if points.len() < 3 {
            tracing::warn!(count = points.len(), "slab needs at least 3 points");
            notifier.notify(
                Severity::Warn,
                "Too few points",
                "A slab outline needs at least 3 points.",
            );
            return;
        }
        let shape = Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Slab,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            points: Some(points),
            width: None,
            height: None,
            properties: serde_json::json!({
                "fill": crate::consts::COLOR_POLYGON_FILL,
                "stroke": crate::consts::COLOR_POLYGON_STROKE,
            }),
            catalog_code: None,
        };
        self.add_shape(shape);
    }

    // ══════════════════════════════════════════════════════════════
    // Selection
    // ══════════════════════════════════════════════════════════════

    /// Select a single shape, or extend the selection when `additive`.
    pub fn select(&mut self, id: ShapeId, additive: bool) {
        if additive {
            if !self.selection.contains(&id) {
                self.selection.push(id);
                self.notify_change(ChangeEvent::Selection);
            }
        } else {
            self.selection = vec![id];
            self.notify_change(ChangeEvent::Selection);
        }
    }

    /// Replace the selection wholesale.
    pub fn select_multiple(&mut self, ids: Vec<ShapeId>) {
        self.selection = ids;
        self.notify_change(ChangeEvent::Selection);
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.notify_change(ChangeEvent::Selection);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Layer operations
    // ══════════════════════════════════════════════════════════════

    pub fn toggle_layer_visibility(&mut self, layer_id: LayerId) {
        if let Some(layer) = self.active_tab_mut().and_then(|t| t.layer_mut(layer_id)) {
            layer.is_visible = !layer.is_visible;
            self.notify_change(ChangeEvent::Shapes);
        }
    }

    pub fn toggle_layer_lock(&mut self, layer_id: LayerId) {
        if let Some(layer) = self.active_tab_mut().and_then(|t| t.layer_mut(layer_id)) {
            layer.is_locked = !layer.is_locked;
            self.notify_change(ChangeEvent::Shapes);
        }
    }

    /// Set a layer's opacity, clamped to `[0, 1]`.
    pub fn set_layer_opacity(&mut self, layer_id: LayerId, opacity: f64) {
        if let Some(layer) = self.active_tab_mut().and_then(|t| t.layer_mut(layer_id)) {
            layer.opacity = opacity.clamp(0.0, 1.0);
            self.notify_change(ChangeEvent::Shapes);
        }
    }

    /// Append a new layer to the active tab and make it active. Returns the
    /// new layer's id, or `None` without an active tab.
    pub fn create_layer_in_active_tab(&mut self, name: &str, kind: LayerKind) -> Option<LayerId> {
        let layer = match kind {
            LayerKind::Cad => cad_layer(),
            _ => {
                let mut l = user_layer(name);
                l.kind = kind;
                l
            }
        };
        let layer = Layer { name: name.to_owned(), ..layer };
        let id = layer.id;
        let tab = self.active_tab_mut()?;
        tab.layers.push(layer);
        self.active_layer = Some(id);
        self.notify_change(ChangeEvent::Shapes);
        self.notify_change(ChangeEvent::ActiveLayer);
        Some(id)
    }

    /// Delete a layer. System layers refuse; deleting the last layer
    /// synthesizes a default user layer so a tab is never empty.
    pub fn delete_layer(&mut self, layer_id: LayerId, notifier: &mut dyn Notifier) {
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        let Some(layer) = tab.layer(layer_id) else {
            return;
        };
        if layer.kind == LayerKind::System {
            tracing::warn!(layer = %layer.name, "refusing to delete a system layer");
            notifier.notify(
                Severity::Warn,
                "Protected layer",
                "System layers cannot be deleted.",
            );
            return;
        }
        tab.layers.retain(|l| l.id != layer_id);
        if tab.layers.is_empty() {
            tab.layers.push(user_layer("Layer 1"));
        }
        let fallback = tab.layers.first().map(|l| l.id);
        if self.active_layer == Some(layer_id) {
            self.active_layer = fallback;
            self.notify_change(ChangeEvent::ActiveLayer);
        }
        self.notify_change(ChangeEvent::Shapes);
    }

    /// Rename a layer. System layers refuse.
    pub fn rename_layer(&mut self, layer_id: LayerId, name: &str, notifier: &mut dyn Notifier) {
        let Some(layer) = self.active_tab_mut().and_then(|t| t.layer_mut(layer_id)) else {
            return;
        };
        if layer.kind == LayerKind::System {
            notifier.notify(
                Severity::Warn,
                "Protected layer",
                "System layers cannot be renamed.",
            );
            return;
        }
        layer.name = name.to_owned();
        self.notify_change(ChangeEvent::Shapes);
    }

    /// Make a layer of the active tab the mutation target for drawing tools.
    pub fn set_active_layer(&mut self, layer_id: LayerId) {
        let exists = self.active_tab().is_some_and(|t| t.layer(layer_id).is_some());
        if exists && self.active_layer != Some(layer_id) {
            self.active_layer = Some(layer_id);
            self.notify_change(ChangeEvent::ActiveLayer);
        }
    }

    /// Move a layer to a new position within the active tab. No-op on an
    /// unknown layer or out-of-range index.
    pub fn reorder_layers(&mut self, layer_id: LayerId, new_index: usize) {
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        let Some(from) = tab.layers.iter().position(|l| l.id == layer_id) else {
            return;
        };
        if new_index >= tab.layers.len() || new_index == from {
            return;
        }
        let layer = tab.layers.remove(from);
        tab.layers.insert(new_index, layer);
        self.notify_change(ChangeEvent::Shapes);
    }

    /// Move the selected shapes into a freshly created layer, then clear
    /// the selection.
    pub fn save_selection_as_layer(&mut self, name: &str) {
        if self.selection.is_empty() {
            return;
        }
        let ids = self.selection.clone();
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        let mut moved = Vec::new();
        for layer in &mut tab.layers {
            let mut kept = Vec::with_capacity(layer.shapes.len());
            for shape in layer.shapes.drain(..) {
                if ids.contains(&shape.id) {
                    moved.push(shape);
                } else {
                    kept.push(shape);
                }
            }
            layer.shapes = kept;
        }
        let mut layer = user_layer(name);
        layer.shapes = moved;
        let layer_id = layer.id;
        tab.layers.push(layer);
        self.active_layer = Some(layer_id);
        self.notify_change(ChangeEvent::Shapes);
        self.notify_change(ChangeEvent::ActiveLayer);
        self.clear_selection();
    }

    /// Re-parent the selected shapes into an existing layer of the active
    /// tab, without mutating the shapes.
    pub fn move_selection_to_layer(&mut self, target_layer_id: LayerId) {
        if self.selection.is_empty() {
            return;
        }
        let ids = self.selection.clone();
        let Some(tab) = self.active_tab_mut() else {
            return;
        };
        if tab.layer(target_layer_id).is_none() {
            return;
        }
        let mut moved = Vec::new();
        for layer in &mut tab.layers {
            if layer.id == target_layer_id {
                continue;
            }
            let mut kept = Vec::with_capacity(layer.shapes.len());
            for shape in layer.shapes.drain(..) {
                if ids.contains(&shape.id) {
                    moved.push(shape);
                } else {
                    kept.push(shape);
                }
            }
            layer.shapes = kept;
        }
        if let Some(target) = tab.layer_mut(target_layer_id) {
            target.shapes.extend(moved);
        }
        self.notify_change(ChangeEvent::Shapes);
        self.clear_selection();
    }

    // ══════════════════════════════════════════════════════════════
    // Tab operations
    // ══════════════════════════════════════════════════════════════

    /// Append a new tab with one default user layer and activate it.
    pub fn add_tab(&mut self, name: &str) -> TabId {
        let tab = default_tab(name, false, false);
        let id = tab.id;
        self.tabs.push(tab);
        self.set_active_tab(id);
        id
    }

    /// Remove a tab. Refuses when it is the only one. The tab activated
    /// afterwards is the one now occupying `min(removed_index, len - 1)`.
    pub fn remove_tab(&mut self, tab_id: TabId, notifier: &mut dyn Notifier) {
        if self.tabs.len() <= 1 {
            tracing::warn!("refusing to remove the last tab");
            notifier.notify(Severity::Warn, "Last tab", "A project needs at least one tab.");
            return;
        }
        let Some(index) = self.tabs.iter().position(|t| t.id == tab_id) else {
            return;
        };
        self.tabs.remove(index);
        let next = index.min(self.tabs.len() - 1);
        let next_id = self.tabs[next].id;
        if self.active_tab == Some(tab_id) {
            self.set_active_tab(next_id);
        } else {
            self.notify_change(ChangeEvent::ActiveTab);
        }
    }

    pub fn rename_tab(&mut self, tab_id: TabId, name: &str) {
        if let Some(tab) = self.tabs.iter_mut().find(|t| t.id == tab_id) {
            tab.name = name.to_owned();
            self.notify_change(ChangeEvent::ActiveTab);
        }
    }

    /// Switch tabs: active layer resets to the new tab's first layer and the
    /// selection is cleared.
    pub fn set_active_tab(&mut self, tab_id: TabId) {
        let Some(tab) = self.tabs.iter_mut().find(|t| t.id == tab_id) else {
            return;
        };
        let first_layer = tab.layers.first().map(|l| l.id);
        for t in &mut self.tabs {
            t.active = t.id == tab_id;
        }
        self.active_tab = Some(tab_id);
        self.active_layer = first_layer;
        self.selection.clear();
        self.notify_change(ChangeEvent::ActiveTab);
        self.notify_change(ChangeEvent::ActiveLayer);
        self.notify_change(ChangeEvent::Selection);
    }

    /// Move a layer to another tab. The CAD underlay is pinned to the first
    /// tab and refuses. A source tab left empty gets a default user layer.
    pub fn move_layer_to_tab(
        &mut self,
        layer_id: LayerId,
        target_tab_id: TabId,
        notifier: &mut dyn Notifier,
    ) {
        if self.is_pinned_cad_layer(layer_id) {
            tracing::warn!("refusing to move the CAD underlay off the first tab");
            notifier.notify(
                Severity::Warn,
                "Protected layer",
                "The CAD underlay stays on the first tab.",
            );
            return;
        }
        if !self.tabs.iter().any(|t| t.id == target_tab_id) {
            return;
        }
        let Some(source_index) = self
            .tabs
            .iter()
            .position(|t| t.layers.iter().any(|l| l.id == layer_id))
        else {
            return;
        };
        if self.tabs[source_index].id == target_tab_id {
            return;
        }
        let source = &mut self.tabs[source_index];
        let Some(layer_index) = source.layers.iter().position(|l| l.id == layer_id) else {
            return;
        };
        let layer = source.layers.remove(layer_index);
        if source.layers.is_empty() {
            source.layers.push(user_layer("Layer 1"));
        }
        let source_fallback = source.layers.first().map(|l| l.id);
        if let Some(target) = self.tabs.iter_mut().find(|t| t.id == target_tab_id) {
            target.layers.push(layer);
        }
        if self.active_layer == Some(layer_id) {
            self.active_layer = source_fallback;
            self.notify_change(ChangeEvent::ActiveLayer);
        }
        self.selection.clear();
        self.notify_change(ChangeEvent::Shapes);
        self.notify_change(ChangeEvent::Selection);
    }

    /// Move a layer into a freshly created tab.
    pub fn move_layer_to_new_tab(
        &mut self,
        layer_id: LayerId,
        name: &str,
        notifier: &mut dyn Notifier,
    ) {
        if self.is_pinned_cad_layer(layer_id) {
            notifier.notify(
                Severity::Warn,
                "Protected layer",
                "The CAD underlay stays on the first tab.",
            );
            return;
        }
        let tab = Tab { id: Uuid::new_v4(), name: name.to_owned(), active: false, layers: Vec::new() };
        let tab_id = tab.id;
        self.tabs.push(tab);
        self.move_layer_to_tab(layer_id, tab_id, notifier);
    }

    fn is_pinned_cad_layer(&self, layer_id: LayerId) -> bool {
        self.tabs
            .first()
            .and_then(|t| t.layer(layer_id))
            .is_some_and(|l| l.kind == LayerKind::Cad)
    }

    // ══════════════════════════════════════════════════════════════
    // Tool / catalog / grid
    // ══════════════════════════════════════════════════════════════

    /// Switch the active tool. Clears the catalog selection: a tool and a
    /// catalog item are mutually exclusive intents.
    pub fn set_active_tool(&mut self, tool: Tool) {
        self.active_tool = tool;
        self.active_catalog_item = None;
        self.notify_change(ChangeEvent::Tool);
    }

    /// Pick (or clear) the catalog item used to size stamped panels.
    /// Setting one auto-switches the tool to panel placement; clearing it
    /// falls back to select.
    pub fn set_active_catalog_item(&mut self, item: Option<CatalogItem>) {
        self.active_tool = if item.is_some() { Tool::AddPanel } else { Tool::Select };
        self.active_catalog_item = item;
        self.notify_change(ChangeEvent::Tool);
    }

    /// Set the grid spacing in world units; values below 1 are refused.
    pub fn set_grid_size(&mut self, size: f64) {
        if size < 1.0 {
            tracing::warn!(size, "grid size below 1 refused");
            return;
        }
        self.grid_size = size;
        self.notify_change(ChangeEvent::Grid);
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.snap_to_grid = enabled;
        self.notify_change(ChangeEvent::Grid);
    }

    pub fn set_show_grid(&mut self, visible: bool) {
        self.show_grid = visible;
        self.notify_change(ChangeEvent::Grid);
    }

    /// Round a world point to the nearest grid intersection when grid
    /// snapping is on, else pass it through.
    #[must_use]
    pub fn snap_to_grid_point(&self, p: Point) -> Point {
        if !self.snap_to_grid {
            return p;
        }
        Point {
            x: (p.x / self.grid_size).round() * self.grid_size,
            y: (p.y / self.grid_size).round() * self.grid_size,
        }
    }

    /// Nearest reference-geometry vertex within `radius` of `p`, if any.
    /// Scans background geometry only, never scene shapes.
    #[must_use]
    pub fn find_nearest_snap_point(&self, p: Point, radius: f64) -> Option<Point> {
        let geometry = self.reference_geometry.as_ref()?;
        let mut best: Option<(f64, Point)> = None;
        for vertex in geometry.vertices() {
            let d = distance(p, vertex);
            if d <= radius && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, vertex));
            }
        }
        best.map(|(_, v)| v)
    }
}

// ══════════════════════════════════════════════════════════════
// Factories
// ══════════════════════════════════════════════════════════════

/// A fresh user layer with a random palette badge color.
pub(crate) fn user_layer(name: &str) -> Layer {
    let color = LAYER_PALETTE
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(LAYER_PALETTE[0]);
    Layer {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        kind: LayerKind::User,
        is_visible: true,
        is_locked: false,
        opacity: 1.0,
        color: Some(color.to_owned()),
        shapes: Vec::new(),
    }
}

/// The locked CAD underlay layer holding background-derived geometry.
pub(crate) fn cad_layer() -> Layer {
    Layer {
        id: Uuid::new_v4(),
        name: "CAD".to_owned(),
        kind: LayerKind::Cad,
        is_visible: true,
        is_locked: true,
        opacity: 1.0,
        color: Some(COLOR_CAD_LAYER.to_owned()),
        shapes: Vec::new(),
    }
}

/// A fresh tab. The first tab of a project with reference geometry carries
/// the CAD underlay below its first user layer.
pub(crate) fn default_tab(name: &str, active: bool, with_cad: bool) -> Tab {
    let mut layers = Vec::new();
    if with_cad {
        layers.push(cad_layer());
    }
    layers.push(user_layer("Layer 1"));
    Tab { id: Uuid::new_v4(), name: name.to_owned(), active, layers }
}
