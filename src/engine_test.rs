#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;
use crate::notify::{NullNotifier, RecordingNotifier};
use crate::surface::MemorySurface;

fn engine() -> (Engine, MemorySurface) {
    (Engine::new(1920.0, 1080.0), MemorySurface::new())
}

fn press(engine: &mut Engine, surface: &mut MemorySurface, name: &str, modifiers: Modifiers) {
    engine.key_down(&Key::new(name), modifiers, false, surface);
}

fn primary() -> Modifiers {
    Modifiers { ctrl: true, ..Modifiers::default() }
}

fn click(engine: &mut Engine, surface: &mut MemorySurface, pos: Point) {
    let mut notifier = NullNotifier;
    engine.pointer_down(pos, Button::Primary, Modifiers::default(), surface, &mut notifier);
    engine.pointer_up(pos, surface);
}

// --- stamping and sync ---

#[test]
fn stamping_a_panel_creates_shape_and_primitive() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));

    let shapes = engine.store().all_shapes();
    assert_eq!(shapes.len(), 1);
    let id = shapes[0].id;
    let primitive = engine.primitive_for(id).unwrap();
    assert_eq!(surface.spec(primitive).unwrap().source_id, Some(id));
    // the stamp is selected and the history recorded it
    assert_eq!(engine.store().selection(), &[id]);
    assert!(!engine.history().is_empty());
}

#[test]
fn removing_a_shape_removes_its_primitive() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));
    let id = engine.store().all_shapes()[0].id;
    let primitive = engine.primitive_for(id).unwrap();

    press(&mut engine, &mut surface, "delete", Modifiers::default());
    assert!(engine.store().all_shapes().is_empty());
    assert!(engine.primitive_for(id).is_none());
    assert!(surface.spec(primitive).is_none());
}

// --- selection and dragging ---

#[test]
fn select_and_drag_moves_the_shape() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));
    engine.store_mut().set_active_tool(Tool::Select);
    engine.tick(&mut surface, Instant::now());

    // the first commit auto-fitted the view, so address the shape through it
    let shape = engine.store().all_shapes()[0].clone();
    let screen = engine.viewport().world_to_screen(shape.bounds().center());
    let zoom = engine.viewport().zoom();

    let mut notifier = NullNotifier;
    engine.pointer_down(screen, Button::Primary, Modifiers::default(), &mut surface, &mut notifier);
    engine.pointer_move(Point::new(screen.x + 50.0, screen.y), &mut surface);
    engine.pointer_up(Point::new(screen.x + 50.0, screen.y), &mut surface);

    let moved = &engine.store().all_shapes()[0];
    assert!((moved.x - (shape.x + 50.0 / zoom)).abs() < 1e-9);
    // the moved primitive carries the new transform
    let primitive = engine.primitive_for(moved.id).unwrap();
    assert_eq!(surface.transform(primitive).unwrap().x, moved.x);
}

#[test]
fn selection_mirrors_to_the_surface() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));
    let id = engine.store().all_shapes()[0].id;
    let primitive = engine.primitive_for(id).unwrap();
    assert_eq!(surface.selection(), &[primitive]);

    engine.store_mut().clear_selection();
    engine.tick(&mut surface, Instant::now());
    assert!(surface.selection().is_empty());
}

// --- drawing dispatch ---

#[test]
fn beam_tool_draws_through_drag() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::DrawBeam);
    let mut notifier = NullNotifier;
    engine.pointer_down(
        Point::new(100.0, 100.0),
        Button::Primary,
        Modifiers::default(),
        &mut surface,
        &mut notifier,
    );
    assert!(engine.drawing().in_progress());
    engine.pointer_move(Point::new(500.0, 100.0), &mut surface);
    engine.pointer_up(Point::new(500.0, 100.0), &mut surface);

    assert!(!engine.drawing().in_progress());
    let shapes = engine.store().all_shapes();
    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[0].kind, crate::shape::ShapeKind::Beam);
}

#[test]
fn polygon_auto_close_commits_history() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::DrawPolygon);
    for pos in [
        Point::new(100.0, 100.0),
        Point::new(400.0, 100.0),
        Point::new(400.0, 400.0),
    ] {
        click(&mut engine, &mut surface, pos);
    }
    assert!(engine.drawing().in_progress());
    click(&mut engine, &mut surface, Point::new(102.0, 102.0));
    assert!(!engine.drawing().in_progress());
    assert_eq!(engine.store().all_shapes().len(), 1);
    assert!(engine.history().can_undo() || engine.history().len() == 1);
}

#[test]
fn escape_cancels_drawing_and_resets_the_tool() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::DrawPolygon);
    click(&mut engine, &mut surface, Point::new(100.0, 100.0));
    click(&mut engine, &mut surface, Point::new(200.0, 100.0));
    assert!(engine.drawing().in_progress());

    press(&mut engine, &mut surface, "Escape", Modifiers::default());
    assert!(!engine.drawing().in_progress());
    assert_eq!(engine.store().active_tool(), Tool::Select);
    assert!(surface.ids_with_role(PrimitiveRole::Preview).is_empty());
    assert!(engine.store().all_shapes().is_empty());
}

#[test]
fn backspace_steps_back_while_tracing() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::DrawPolygon);
    click(&mut engine, &mut surface, Point::new(100.0, 100.0));
    click(&mut engine, &mut surface, Point::new(200.0, 100.0));
    press(&mut engine, &mut surface, "Backspace", Modifiers::default());
    assert_eq!(engine.drawing().accumulated_points().len(), 1);
}

// --- clipboard ---

#[test]
fn copy_paste_offsets_with_fresh_ids() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));
    let original = engine.store().all_shapes()[0].clone();

    press(&mut engine, &mut surface, "c", primary());
    press(&mut engine, &mut surface, "v", primary());

    let shapes = engine.store().all_shapes();
    assert_eq!(shapes.len(), 2);
    let pasted = shapes.iter().find(|s| s.id != original.id).unwrap();
    assert_eq!(pasted.x, original.x + PASTE_OFFSET);
    assert_eq!(pasted.y, original.y + PASTE_OFFSET);
    assert_eq!(engine.store().selection(), &[pasted.id]);
}

#[test]
fn shortcuts_are_suppressed_while_typing() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));
    assert_eq!(engine.store().selection().len(), 1);

    engine.key_down(&Key::new("delete"), Modifiers::default(), true, &mut surface);
    assert_eq!(engine.store().all_shapes().len(), 1);

    engine.store_mut().clear_selection();
    engine.key_down(&Key::new("a"), primary(), true, &mut surface);
    assert!(engine.store().selection().is_empty());
}

#[test]
fn select_all_skips_locked_layers() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(200.0, 200.0));
    click(&mut engine, &mut surface, Point::new(600.0, 200.0));
    let layer_id = engine.store().active_layer_id().unwrap();

    press(&mut engine, &mut surface, "a", primary());
    assert_eq!(engine.store().selection().len(), 2);

    engine.store_mut().toggle_layer_lock(layer_id);
    press(&mut engine, &mut surface, "a", primary());
    assert!(engine.store().selection().is_empty());
}

// --- history ---

#[test]
fn undo_shortcut_restores_the_previous_state() {
    let (mut engine, mut surface) = engine();
    engine.mark_history_baseline(&mut surface);
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));
    assert_eq!(engine.store().all_shapes().len(), 1);

    press(&mut engine, &mut surface, "z", primary());
    assert!(engine.store().all_shapes().is_empty());

    press(&mut engine, &mut surface, "z", Modifiers { shift: true, ..primary() });
    assert_eq!(engine.store().all_shapes().len(), 1);
}

// --- rotation ---

#[test]
fn r_rotates_the_selection_by_a_quarter_turn() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));

    press(&mut engine, &mut surface, "r", Modifiers::default());
    assert_eq!(engine.store().all_shapes()[0].rotation, 90.0);
    for _ in 0..3 {
        press(&mut engine, &mut surface, "r", Modifiers::default());
    }
    assert_eq!(engine.store().all_shapes()[0].rotation, 0.0);
}

// --- viewport ---

#[test]
fn wheel_zooms_about_the_pointer() {
    let (mut engine, mut surface) = engine();
    let anchor = Point::new(960.0, 540.0);
    let world_before = engine.viewport().screen_to_world(anchor);

    engine.wheel(WheelDelta { dx: 0.0, dy: -1.0 }, anchor, &mut surface);
    assert!(engine.viewport().zoom() > 1.0);
    let world_after = engine.viewport().screen_to_world(anchor);
    assert!((world_before.x - world_after.x).abs() < 1e-9);

    // the surface picked up the new view transform
    let (zoom, _, _) = surface.view_transform();
    assert_eq!(zoom, engine.viewport().zoom());
}

#[test]
fn first_content_triggers_a_one_shot_fit() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_active_tool(Tool::AddPanel);
    click(&mut engine, &mut surface, Point::new(400.0, 300.0));
    let fitted = engine.viewport().zoom();
    assert!(fitted > 1.0);

    // a second shape does not refit
    engine.viewport_mut().tick_frame();
    click(&mut engine, &mut surface, Point::new(800.0, 600.0));
    assert_eq!(engine.viewport().zoom(), fitted);
}

// --- grid ---

#[test]
fn grid_redraws_on_setting_changes() {
    let (mut engine, mut surface) = engine();
    engine.store_mut().set_grid_size(200.0);
    engine.tick(&mut surface, Instant::now());
    assert!(!surface.ids_with_role(PrimitiveRole::Grid).is_empty());

    engine.store_mut().set_show_grid(false);
    engine.tick(&mut surface, Instant::now());
    assert!(surface.ids_with_role(PrimitiveRole::Grid).is_empty());
}

// --- bulk import ---

#[test]
fn import_payload_mounts_chunks_over_ticks() {
    let (mut engine, mut surface) = engine();
    let mut notifier = RecordingNotifier::new();
    let payload = serde_json::json!({
        "lines": (0..20)
            .map(|i| serde_json::json!({
                "a": { "x": f64::from(i) * 10.0, "y": 0.0 },
                "b": { "x": f64::from(i) * 10.0, "y": 100.0 },
            }))
            .collect::<Vec<_>>()
    });
    engine.start_import_payload(&payload, &mut surface, &mut notifier);
    assert!(notifier.messages.is_empty());

    for _ in 0..10 {
        engine.tick(&mut surface, Instant::now());
    }
    assert_eq!(engine.chunk_stats().total, 20);
    assert_eq!(engine.chunk_stats().mounted, 20);
    assert_eq!(surface.ids_with_role(PrimitiveRole::Import).len(), 20);
}

#[test]
fn bad_import_payload_leaves_previous_chunks() {
    let (mut engine, mut surface) = engine();
    let mut notifier = RecordingNotifier::new();
    let geometry = RawGeometry {
        polygons: Vec::new(),
        lines: vec![crate::import::LineEntry {
            a: Point::new(0.0, 0.0),
            b: Point::new(100.0, 0.0),
        }],
    };
    engine.start_import(&geometry, &mut surface);
    for _ in 0..5 {
        engine.tick(&mut surface, Instant::now());
    }
    assert_eq!(engine.chunk_stats().total, 1);

    engine.start_import_payload(&serde_json::json!({ "lines": 42 }), &mut surface, &mut notifier);
    assert_eq!(notifier.severities(), vec![Severity::Error]);
    assert_eq!(engine.chunk_stats().total, 1);
}
