#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

fn payload_with(polygons: usize, lines: usize) -> RawGeometry {
    let polygons = (0..polygons)
        .map(|i| {
            let x = i as f64 * 10.0;
            PolyEntry::Wrapped {
                points: vec![
                    Point::new(x, 0.0),
                    Point::new(x + 5.0, 0.0),
                    Point::new(x + 5.0, 5.0),
                ],
            }
        })
        .collect();
    let lines = (0..lines)
        .map(|i| {
            let y = i as f64 * 10.0;
            LineEntry { a: Point::new(0.0, y), b: Point::new(100.0, y) }
        })
        .collect();
    RawGeometry { polygons, lines }
}

// --- payload decoding ---

#[test]
fn all_three_polygon_encodings_decode() {
    let geometry: RawGeometry = serde_json::from_value(serde_json::json!({
        "polygons": [
            { "points": [ {"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0} ] },
            [ {"x": 2.0, "y": 0.0}, {"x": 3.0, "y": 0.0} ],
            { "a": {"x": 4.0, "y": 0.0}, "b": {"x": 5.0, "y": 0.0} }
        ],
        "lines": [
            { "a": {"x": 6.0, "y": 0.0}, "b": {"x": 7.0, "y": 0.0} }
        ]
    }))
    .unwrap();
    assert_eq!(geometry.len(), 4);
    assert_eq!(geometry.polygons[0].points()[1], Point::new(1.0, 0.0));
    assert_eq!(geometry.polygons[1].points()[0], Point::new(2.0, 0.0));
    assert_eq!(geometry.polygons[2].points(), vec![Point::new(4.0, 0.0), Point::new(5.0, 0.0)]);
}

#[test]
fn missing_sections_default_to_empty() {
    let geometry: RawGeometry = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(geometry.is_empty());
}

#[test]
fn garbage_payload_is_an_error() {
    let result = GeometryImport::parse(&serde_json::json!({ "polygons": "nope" }), 1);
    assert!(matches!(result, Err(ImportError::InvalidPayload(_))));
}

#[test]
fn vertices_iterates_polygons_then_lines() {
    let geometry = payload_with(1, 1);
    let vertices: Vec<Point> = geometry.vertices().collect();
    assert_eq!(vertices.len(), 5);
    assert_eq!(vertices[0], Point::new(0.0, 0.0));
    assert_eq!(vertices[4], Point::new(100.0, 0.0));
}

// --- pumping ---

#[test]
fn pump_emits_chunks_then_progress_then_complete() {
    let geometry = payload_with(0, CHUNK_SIZE + 10);
    let mut import = GeometryImport::from_geometry(&geometry, 7);
    assert_eq!(import.generation(), 7);

    let events = import.pump();
    assert_eq!(events.len(), 2);
    let ImportEvent::Chunk { index, shapes } = &events[0] else {
        panic!("expected a chunk");
    };
    assert_eq!(*index, 0);
    assert_eq!(shapes.len(), CHUNK_SIZE);
    let ImportEvent::Progress { percent } = &events[1] else {
        panic!("expected progress");
    };
    assert!(*percent < 100);

    let events = import.pump();
    let ImportEvent::Chunk { index, shapes } = &events[0] else {
        panic!("expected a chunk");
    };
    assert_eq!(*index, 1);
    assert_eq!(shapes.len(), 10);
    assert!(matches!(events[1], ImportEvent::Progress { percent: 100 }));

    assert!(!import.is_done());
    let events = import.pump();
    let [ImportEvent::Complete { total }] = events.as_slice() else {
        panic!("expected completion");
    };
    assert_eq!(*total, CHUNK_SIZE + 10);
    assert!(import.is_done());
    assert!(import.pump().is_empty());
}

#[test]
fn empty_payload_completes_immediately() {
    let mut import = GeometryImport::from_geometry(&RawGeometry::default(), 1);
    let events = import.pump();
    assert!(matches!(events.as_slice(), [ImportEvent::Complete { total: 0 }]));
}

#[test]
fn single_point_polygons_are_dropped() {
    let geometry = RawGeometry {
        polygons: vec![
            PolyEntry::Bare(vec![Point::new(0.0, 0.0)]),
            PolyEntry::Bare(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]),
        ],
        lines: Vec::new(),
    };
    let mut import = GeometryImport::from_geometry(&geometry, 1);
    let events = import.pump();
    let ImportEvent::Chunk { shapes, .. } = &events[0] else {
        panic!("expected a chunk");
    };
    assert_eq!(shapes.len(), 1);
}

#[test]
fn imported_shapes_carry_provenance() {
    let geometry = payload_with(1, 0);
    let mut import = GeometryImport::from_geometry(&geometry, 1);
    let events = import.pump();
    let ImportEvent::Chunk { shapes, .. } = &events[0] else {
        panic!("expected a chunk");
    };
    let shape = &shapes[0];
    assert_eq!(shape.kind, ShapeKind::Polygon);
    assert!(shape.props().from_import());
    assert!(!shape.props().is_generated());
}
