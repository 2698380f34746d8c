#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;
use crate::notify::RecordingNotifier;

struct FixedClient {
    layout: FormworkLayout,
    requests: Vec<FormworkRequest>,
}

impl FixedClient {
    fn new(elements: Vec<FormworkElement>) -> Self {
        Self { layout: FormworkLayout { elements }, requests: Vec::new() }
    }
}

impl FormworkClient for FixedClient {
    fn calculate(&mut self, request: &FormworkRequest) -> Result<FormworkLayout, FormworkError> {
        self.requests.push(request.clone());
        Ok(self.layout.clone())
    }
}

struct FailingClient;

impl FormworkClient for FailingClient {
    fn calculate(&mut self, _request: &FormworkRequest) -> Result<FormworkLayout, FormworkError> {
        Err(FormworkError::Service("outline too complex".into()))
    }
}

fn store_with_slab() -> SceneStore {
    let mut store = SceneStore::new();
    store.create_slab_from_points(
        vec![
            Point::new(0.0, 0.0),
            Point::new(600.0, 0.0),
            Point::new(600.0, 400.0),
            Point::new(0.0, 400.0),
        ],
        &mut crate::notify::NullNotifier,
    );
    store
}

fn user_rect() -> Shape {
    Shape {
        id: Uuid::new_v4(),
        kind: ShapeKind::Rectangle,
        x: 50.0,
        y: 50.0,
        rotation: 0.0,
        points: None,
        width: Some(80.0),
        height: Some(40.0),
        properties: serde_json::json!({}),
        catalog_code: None,
    }
}

fn panel(position_x: f64, position_y: f64, rotation: f64) -> FormworkElement {
    FormworkElement::Panel {
        position_x,
        position_y,
        rotation,
        details: PanelDetails { length: 120.0, width: 60.0 },
    }
}

// --- request construction ---

#[test]
fn request_uses_slab_outline_and_bounds() {
    let mut store = store_with_slab();
    let mut client = FixedClient::new(vec![]);
    let mut notifier = RecordingNotifier::new();
    store.generate_auto_layout(None, &mut client, &mut notifier);

    let request = &client.requests[0];
    assert_eq!(request.points.len(), 4);
    assert_eq!(request.width, 600.0);
    assert_eq!(request.height, 400.0);
    assert_eq!(request.slab_thickness, DEFAULT_SLAB_THICKNESS);
    assert!(!request.optimize_for_warehouse);
}

#[test]
fn optimal_layout_flags_warehouse_stock() {
    let mut store = store_with_slab();
    let mut client = FixedClient::new(vec![]);
    let mut notifier = RecordingNotifier::new();
    store.generate_optimal_layout(None, &mut client, &mut notifier);
    assert!(client.requests[0].optimize_for_warehouse);
    // pre-flight info toast, then the completion toast
    assert_eq!(notifier.severities()[0], Severity::Info);
}

#[test]
fn refuses_without_a_slab() {
    let mut store = SceneStore::new();
    store.add_shape(user_rect());
    let mut client = FixedClient::new(vec![panel(0.0, 0.0, 0.0)]);
    let mut notifier = RecordingNotifier::new();
    store.generate_auto_layout(None, &mut client, &mut notifier);
    assert!(client.requests.is_empty());
    assert_eq!(notifier.severities(), vec![Severity::Warn]);
}

#[test]
fn service_failure_surfaces_as_toast() {
    let mut store = store_with_slab();
    let before = store.all_shapes().len();
    let mut notifier = RecordingNotifier::new();
    store.generate_auto_layout(None, &mut FailingClient, &mut notifier);
    assert_eq!(notifier.severities(), vec![Severity::Error]);
    assert_eq!(store.all_shapes().len(), before);
}

// --- ingest ---

#[test]
fn positions_scale_from_meters_to_centimeters() {
    let mut store = store_with_slab();
    let mut client = FixedClient::new(vec![panel(1.2, 0.6, 0.0)]);
    store.generate_auto_layout(None, &mut client, &mut crate::notify::NullNotifier);

    let placed: Vec<_> = store
        .all_shapes()
        .into_iter()
        .filter(|s| s.props().is_generated())
        .collect();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].x, 120.0);
    assert_eq!(placed[0].y, 60.0);
    assert_eq!(placed[0].width, Some(120.0));
    assert_eq!(placed[0].height, Some(60.0));
}

#[test]
fn quarter_turn_panels_swap_dimensions() {
    let mut store = store_with_slab();
    let mut client = FixedClient::new(vec![panel(0.0, 0.0, 90.0)]);
    store.generate_auto_layout(None, &mut client, &mut crate::notify::NullNotifier);

    let placed: Vec<_> = store
        .all_shapes()
        .into_iter()
        .filter(|s| s.props().is_generated())
        .collect();
    assert_eq!(placed[0].rotation, 0.0);
    assert_eq!(placed[0].width, Some(60.0));
    assert_eq!(placed[0].height, Some(120.0));
}

#[test]
fn regenerate_replaces_only_generated_shapes() {
    let mut store = store_with_slab();
    let keeper = user_rect();
    let keeper_id = keeper.id;
    store.add_shape(keeper);

    let mut first = FixedClient::new(vec![panel(0.0, 0.0, 0.0), panel(1.2, 0.0, 0.0)]);
    store.generate_auto_layout(None, &mut first, &mut crate::notify::NullNotifier);
    assert_eq!(generated_count(&store), 2);

    let mut second = FixedClient::new(vec![panel(0.0, 0.0, 0.0), panel(1.2, 0.0, 0.0), panel(2.4, 0.0, 0.0)]);
    store.generate_auto_layout(None, &mut second, &mut crate::notify::NullNotifier);
    assert_eq!(generated_count(&store), 3);
    assert!(store.find_shape(keeper_id).is_some());
    assert!(store.is_slab_defined());
}

#[test]
fn generated_shapes_land_in_the_active_layer() {
    let mut store = store_with_slab();
    let first = store.active_layer_id();
    store.create_layer_in_active_tab("Notes", crate::shape::LayerKind::User);
    if let Some(id) = first {
        store.set_active_layer(id);
    }

    let mut client = FixedClient::new(vec![panel(0.0, 0.0, 0.0)]);
    store.generate_auto_layout(None, &mut client, &mut RecordingNotifier::new());

    let tab = store.active_tab().unwrap();
    let holder = tab
        .layers
        .iter()
        .find(|l| l.shapes.iter().any(|s| s.props().is_generated()))
        .map(|l| l.id);
    assert_eq!(holder, first);
    assert_ne!(holder, tab.layers.last().map(|l| l.id));
}

#[test]
fn beams_and_props_become_shapes() {
    let mut store = store_with_slab();
    let mut client = FixedClient::new(vec![
        FormworkElement::Beam {
            position_x: 0.5,
            position_y: 0.5,
            rotation: 0.0,
            details: BeamDetails { length: 245.0 },
        },
        FormworkElement::Prop { position_x: 1.0, position_y: 1.0 },
    ]);
    store.generate_auto_layout(None, &mut client, &mut crate::notify::NullNotifier);

    let shapes = store.all_shapes();
    let beam = shapes.iter().find(|s| s.kind == ShapeKind::Beam).unwrap();
    assert_eq!(beam.x, 50.0);
    assert_eq!(beam.points.as_ref().map(Vec::len), Some(2));
    let prop = shapes.iter().find(|s| s.kind == ShapeKind::Prop).unwrap();
    assert_eq!(prop.x, 100.0);
    assert_eq!(prop.y, 100.0);
}

#[test]
fn element_wire_format_decodes() {
    let layout: FormworkLayout = serde_json::from_value(serde_json::json!({
        "elements": [
            {
                "elementType": "panel",
                "positionX": 0.0,
                "positionY": 0.0,
                "details": { "length": 120.0, "width": 60.0 }
            },
            { "elementType": "prop", "positionX": 1.0, "positionY": 2.0 }
        ]
    }))
    .unwrap();
    assert_eq!(layout.elements.len(), 2);
    // rotation defaults to 0 when absent
    assert!(matches!(layout.elements[0], FormworkElement::Panel { rotation, .. } if rotation == 0.0));
}

fn generated_count(store: &SceneStore) -> usize {
    store
        .all_shapes()
        .into_iter()
        .filter(|s| s.props().is_generated())
        .count()
}
