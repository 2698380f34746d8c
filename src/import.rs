//! Bulk reference-geometry parsing.
//!
//! Extracted drawings arrive as a raw JSON payload of polygons and lines,
//! frequently tens of thousands of entries. [`GeometryImport`] turns the
//! payload into scene shapes incrementally: each [`GeometryImport::pump`]
//! call materializes at most one chunk's worth and reports progress, so the
//! caller can interleave parsing with frame work and hand chunks straight
//! to [`crate::chunk::ChunkRenderer`].
//!
//! Starting a new import supersedes the old one. The generation counter
//! stamped on every import lets downstream consumers drop stale chunks.

#[cfg(test)]
#[path = "import_test.rs"]
mod import_test;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{CHUNK_SIZE, COLOR_CAD_LAYER};
use crate::geometry::Point;
use crate::shape::{Shape, ShapeKind};

/// One polygon entry. The payload is produced by several upstream
/// extractors which disagree on encoding, so all three observed forms
/// decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolyEntry {
    /// `{ "points": [ {x, y}, ... ] }`
    Wrapped { points: Vec<Point> },
    /// Bare vertex array `[ {x, y}, ... ]`
    Bare(Vec<Point>),
    /// Degenerate two-point entry `{ "a": {x, y}, "b": {x, y} }`
    Segment { a: Point, b: Point },
}

impl PolyEntry {
    /// Vertex list regardless of encoding.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        match self {
            Self::Wrapped { points } | Self::Bare(points) => points.clone(),
            Self::Segment { a, b } => vec![*a, *b],
        }
    }
}

/// A line entry: always the `{a, b}` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineEntry {
    pub a: Point,
    pub b: Point,
}

/// Raw extracted geometry, as persisted alongside a project. Used for
/// snapping and bulk import only; never rendered as scene shapes directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(default)]
    pub polygons: Vec<PolyEntry>,
    #[serde(default)]
    pub lines: Vec<LineEntry>,
}

impl RawGeometry {
    /// Total entry count across polygons and lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.polygons.len() + self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.lines.is_empty()
    }

    /// Every vertex in the payload, polygons first. Snap-point scans
    /// iterate this.
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        let polys = self.polygons.iter().flat_map(PolyEntry::points);
        let lines = self.lines.iter().flat_map(|l| [l.a, l.b]);
        polys.chain(lines)
    }
}

/// Error from decoding a raw geometry payload.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid geometry payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// One step of the import protocol.
#[derive(Debug, Clone)]
pub enum ImportEvent {
    /// A batch of materialized shapes, at most [`CHUNK_SIZE`] per event.
    Chunk { index: usize, shapes: Vec<Shape> },
    /// Parse progress in percent of total entries.
    Progress { percent: u8 },
    /// All entries materialized.
    Complete { total: usize },
}

/// Incremental importer for one payload.
///
/// The caller pumps it once per scheduling slot; an empty return means the
/// import already completed. Dropping the importer cancels it — nothing
/// downstream references it, chunks already emitted stay valid.
pub struct GeometryImport {
    pending: VecDeque<Shape>,
    total: usize,
    emitted: usize,
    next_chunk: usize,
    generation: u64,
    done: bool,
}

impl GeometryImport {
    /// Decode a raw JSON payload and prepare it for pumping.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidPayload`] when the payload does not
    /// decode as [`RawGeometry`].
    pub fn parse(payload: &serde_json::Value, generation: u64) -> Result<Self, ImportError> {
        let geometry: RawGeometry = serde_json::from_value(payload.clone())?;
        Ok(Self::from_geometry(&geometry, generation))
    }

    /// Prepare an already-decoded payload for pumping.
    #[must_use]
    pub fn from_geometry(geometry: &RawGeometry, generation: u64) -> Self {
        let mut pending = VecDeque::with_capacity(geometry.len());
        for entry in &geometry.polygons {
            let points = entry.points();
            if points.len() >= 2 {
                pending.push_back(imported_shape(points));
            }
        }
        for line in &geometry.lines {
            pending.push_back(imported_shape(vec![line.a, line.b]));
        }
        let total = pending.len();
        tracing::debug!(total, generation, "geometry import prepared");
        Self { pending, total, emitted: 0, next_chunk: 0, generation, done: false }
    }

    /// The import generation this importer was started under.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Materialize the next chunk. Returns `[Chunk, Progress]` while
    /// entries remain, `[Complete]` once drained, and `[]` after that.
    pub fn pump(&mut self) -> Vec<ImportEvent> {
        if self.done {
            return Vec::new();
        }
        if self.pending.is_empty() {
            self.done = true;
            tracing::debug!(total = self.total, "geometry import complete");
            return vec![ImportEvent::Complete { total: self.total }];
        }
        let take = self.pending.len().min(CHUNK_SIZE);
        let shapes: Vec<Shape> = self.pending.drain(..take).collect();
        self.emitted += shapes.len();
        let index = self.next_chunk;
        self.next_chunk += 1;
        let percent = if self.total == 0 {
            100
        } else {
            ((self.emitted * 100) / self.total).min(100) as u8
        };
        vec![ImportEvent::Chunk { index, shapes }, ImportEvent::Progress { percent }]
    }
}

/// An imported polyline shape, flagged so resync and generation never treat
/// it as user content.
fn imported_shape(points: Vec<Point>) -> Shape {
    Shape {
        id: Uuid::new_v4(),
        kind: ShapeKind::Polygon,
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        points: Some(points),
        width: None,
        height: None,
        properties: serde_json::json!({
            "stroke": COLOR_CAD_LAYER,
            "strokeWidth": 1.0,
            "fromImport": true,
        }),
        catalog_code: None,
    }
}
