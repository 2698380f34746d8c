#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;
use crate::surface::MemorySurface;
use uuid::Uuid;

fn rect(x: f64, y: f64, w: f64, h: f64) -> Shape {
    Shape {
        id: Uuid::new_v4(),
        kind: ShapeKind::Rectangle,
        x,
        y,
        rotation: 0.0,
        points: None,
        width: Some(w),
        height: Some(h),
        properties: serde_json::json!({}),
        catalog_code: None,
    }
}

fn beam(x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
    Shape {
        id: Uuid::new_v4(),
        kind: ShapeKind::Beam,
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        points: Some(vec![Point::new(x1, y1), Point::new(x2, y2)]),
        width: None,
        height: None,
        properties: serde_json::json!({}),
        catalog_code: None,
    }
}

// --- hit-testing ---

#[test]
fn smallest_shape_wins_when_nested() {
    let mut store = SceneStore::new();
    let big = rect(0.0, 0.0, 1000.0, 1000.0);
    let small = rect(400.0, 400.0, 100.0, 100.0);
    let (big_id, small_id) = (big.id, small.id);
    store.add_shape(big);
    store.add_shape(small);

    let engine = InteractionEngine::new();
    let hits = engine.find_shapes_at_point(&store, Point::new(450.0, 450.0), 1.0);
    assert_eq!(hits, vec![small_id, big_id]);
}

#[test]
fn lines_beat_filled_shapes_they_cross() {
    let mut store = SceneStore::new();
    let panel = rect(0.0, 0.0, 500.0, 500.0);
    let line = beam(0.0, 250.0, 500.0, 250.0);
    let (panel_id, line_id) = (panel.id, line.id);
    store.add_shape(panel);
    store.add_shape(line);

    let engine = InteractionEngine::new();
    let hits = engine.find_shapes_at_point(&store, Point::new(250.0, 250.0), 1.0);
    assert_eq!(hits[0], line_id);
    assert!(hits.contains(&panel_id));
}

#[test]
fn tolerance_scales_with_zoom() {
    let mut store = SceneStore::new();
    let shape = rect(0.0, 0.0, 100.0, 100.0);
    let id = shape.id;
    store.add_shape(shape);

    let engine = InteractionEngine::new();
    // 12 world units off the edge: inside the 15-unit tolerance at zoom 1
    let p = Point::new(112.0, 50.0);
    assert_eq!(engine.find_shapes_at_point(&store, p, 1.0), vec![id]);
    // at zoom 3 the tolerance shrinks to 5 and the same point misses
    assert!(engine.find_shapes_at_point(&store, p, 3.0).is_empty());
    // the tolerance floor keeps very high zooms usable
    assert_eq!(
        engine.find_shapes_at_point(&store, Point::new(104.0, 50.0), 100.0),
        vec![id]
    );
}

#[test]
fn locked_layer_shapes_are_not_candidates() {
    let mut store = SceneStore::new();
    let shape = rect(0.0, 0.0, 100.0, 100.0);
    store.add_shape(shape);
    let layer_id = store.active_layer_id().unwrap();
    store.toggle_layer_lock(layer_id);

    let engine = InteractionEngine::new();
    assert!(engine.find_shapes_at_point(&store, Point::new(50.0, 50.0), 1.0).is_empty());
}

#[test]
fn rotated_panels_hit_in_local_space() {
    let mut store = SceneStore::new();
    let mut panel = rect(0.0, 0.0, 200.0, 20.0);
    panel.kind = ShapeKind::Panel;
    panel.rotation = 90.0;
    let id = panel.id;
    store.add_shape(panel);

    let engine = InteractionEngine::new();
    // near the center the rotated footprint still covers the point
    assert_eq!(
        engine.find_shapes_at_point(&store, Point::new(110.0, 15.0), 3.0),
        vec![id]
    );
    // far along the unrotated long axis the rotated panel is gone
    assert!(engine.find_shapes_at_point(&store, Point::new(180.0, 10.0), 3.0).is_empty());
}

// --- cycling ---

#[test]
fn repeat_clicks_cycle_through_stacked_shapes() {
    let mut store = SceneStore::new();
    let a = rect(0.0, 0.0, 100.0, 100.0);
    let b = rect(10.0, 10.0, 80.0, 80.0);
    let (a_id, b_id) = (a.id, b.id);
    store.add_shape(a);
    store.add_shape(b);

    let mut engine = InteractionEngine::new();
    let p = Point::new(50.0, 50.0);
    assert_eq!(engine.select_at_point(&mut store, p, 1.0, false), Some(b_id));
    assert_eq!(engine.select_at_point(&mut store, p, 1.0, false), Some(a_id));
    // wraps back around
    assert_eq!(engine.select_at_point(&mut store, p, 1.0, false), Some(b_id));
    assert_eq!(store.selection(), &[b_id]);
}

#[test]
fn a_distant_click_restarts_the_cycle() {
    let mut store = SceneStore::new();
    let a = rect(0.0, 0.0, 100.0, 100.0);
    let b = rect(10.0, 10.0, 80.0, 80.0);
    let b_id = b.id;
    store.add_shape(a);
    store.add_shape(b);

    let mut engine = InteractionEngine::new();
    engine.select_at_point(&mut store, Point::new(50.0, 50.0), 1.0, false);
    engine.select_at_point(&mut store, Point::new(50.0, 50.0), 1.0, false);
    // beyond the cycle threshold: fresh test, back to the top candidate
    let selected = engine.select_at_point(&mut store, Point::new(70.0, 50.0), 1.0, false);
    assert_eq!(selected, Some(b_id));
}

#[test]
fn reset_cycling_forgets_candidates() {
    let mut store = SceneStore::new();
    let a = rect(0.0, 0.0, 100.0, 100.0);
    let b = rect(10.0, 10.0, 80.0, 80.0);
    let b_id = b.id;
    store.add_shape(a);
    store.add_shape(b);

    let mut engine = InteractionEngine::new();
    let p = Point::new(50.0, 50.0);
    engine.select_at_point(&mut store, p, 1.0, false);
    engine.reset_cycling();
    assert_eq!(engine.select_at_point(&mut store, p, 1.0, false), Some(b_id));
}

#[test]
fn empty_click_clears_selection_unless_additive() {
    let mut store = SceneStore::new();
    let shape = rect(0.0, 0.0, 100.0, 100.0);
    let id = shape.id;
    store.add_shape(shape);

    let mut engine = InteractionEngine::new();
    assert_eq!(engine.select_at_point(&mut store, Point::new(2000.0, 2000.0), 1.0, true), None);
    assert_eq!(store.selection(), &[id]);
    assert_eq!(engine.select_at_point(&mut store, Point::new(3000.0, 3000.0), 1.0, false), None);
    assert!(store.selection().is_empty());
}

// --- toolbar ---

#[test]
fn toolbar_sits_above_the_selection() {
    let mut store = SceneStore::new();
    let shape = rect(400.0, 400.0, 200.0, 100.0);
    store.add_shape(shape);
    let viewport = Viewport::new();

    let engine = InteractionEngine::new();
    let (x, y) = engine
        .context_toolbar_position(&store, &viewport, 1920.0, 1080.0)
        .unwrap();
    // centered on the shape, offset above it
    assert_eq!(x, 500.0 - TOOLBAR_WIDTH / 2.0);
    assert_eq!(y, 400.0 - TOOLBAR_OFFSET);
}

#[test]
fn toolbar_flips_below_near_the_top_edge() {
    let mut store = SceneStore::new();
    let shape = rect(100.0, 5.0, 100.0, 50.0);
    store.add_shape(shape);
    let viewport = Viewport::new();

    let engine = InteractionEngine::new();
    let (_, y) = engine
        .context_toolbar_position(&store, &viewport, 1920.0, 1080.0)
        .unwrap();
    assert_eq!(y, 55.0 + 10.0);
}

#[test]
fn toolbar_needs_a_selection() {
    let store = SceneStore::new();
    let viewport = Viewport::new();
    let engine = InteractionEngine::new();
    assert!(engine.context_toolbar_position(&store, &viewport, 800.0, 600.0).is_none());
}

// --- snap guide ---

#[test]
fn snap_guide_appears_moves_and_disappears() {
    let mut engine = InteractionEngine::new();
    let mut surface = MemorySurface::new();

    engine.update_snap_guide(Some(Point::new(10.0, 10.0)), &mut surface);
    let overlays = surface.ids_with_role(PrimitiveRole::Overlay);
    assert_eq!(overlays.len(), 1);

    engine.update_snap_guide(Some(Point::new(30.0, 40.0)), &mut surface);
    assert_eq!(surface.ids_with_role(PrimitiveRole::Overlay), overlays);
    let transform = surface.transform(overlays[0]).unwrap();
    assert_eq!((transform.x, transform.y), (30.0, 40.0));

    engine.update_snap_guide(None, &mut surface);
    assert!(surface.ids_with_role(PrimitiveRole::Overlay).is_empty());
}
