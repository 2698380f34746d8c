//! Chunked Renderer: viewport-driven lazy mounting for bulk imports.
//!
//! Imported reference geometry runs to tens of thousands of polylines —
//! far too many to keep mounted. Shapes are partitioned into fixed-size
//! chunks, each with its own bounding box; a debounced visibility pass
//! marks chunks in or out of the (margin-expanded) viewport; newly visible
//! chunks queue for mounting in budgeted batches across frames; chunks
//! leaving the view are unmounted and re-mounted later from stored shape
//! data, never re-parsed.
//!
//! Cancellation is by generation: starting a new import bumps the counter
//! and clears everything, and a chunk stamped with a stale generation is
//! dropped on arrival, so a superseded import can never mount.

#[cfg(test)]
#[path = "chunk_test.rs"]
mod chunk_test;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::consts::{CHUNK_MARGIN_PX, FRAME_BUDGET_MS, MOUNT_BATCH_SIZE, VISIBILITY_DEBOUNCE_MS};
use crate::geometry::Bounds;
use crate::shape::Shape;
use crate::surface::{PrimitiveId, PrimitiveRole, RenderSurface, spec_for_shape};
use crate::viewport::Viewport;

/// A spatially bounded batch of imported shapes.
pub struct Chunk {
    shapes: Vec<Shape>,
    bounds: Option<Bounds>,
    mounted: Vec<PrimitiveId>,
    visible: bool,
}

impl Chunk {
    fn new(shapes: Vec<Shape>) -> Self {
        let bounds = shapes
            .iter()
            .map(Shape::bounds)
            .reduce(|a, b| a.union(&b));
        Self { shapes, bounds, mounted: Vec::new(), visible: false }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.mounted.is_empty()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }
}

/// Running counters exposed to debug overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkStats {
    /// Shapes across all chunks.
    pub total: usize,
    /// Shapes currently mounted on the surface.
    pub mounted: usize,
    /// Shapes in chunks currently marked visible.
    pub visible: usize,
    /// Measured tick rate.
    pub fps: f64,
}

/// Lazily mounts/unmounts chunks as the viewport moves.
pub struct ChunkRenderer {
    chunks: Vec<Chunk>,
    generation: u64,
    mount_queue: VecDeque<usize>,
    /// When the viewport last moved; visibility recomputes after the
    /// debounce window.
    view_dirty_since: Option<Instant>,
    frame_times: VecDeque<Instant>,
}

impl Default for ChunkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            generation: 0,
            mount_queue: VecDeque::new(),
            view_dirty_since: None,
            frame_times: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The generation new chunks must be stamped with.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start (or supersede) an import: bump the generation, unmount and
    /// drop every existing chunk, and clear the mount queue. Returns the
    /// new generation for stamping chunks.
    pub fn begin_import(&mut self, surface: &mut dyn RenderSurface) -> u64 {
        self.clear(surface);
        self.generation += 1;
        tracing::debug!(generation = self.generation, "chunked import started");
        self.generation
    }

    /// Accept one chunk of shapes. Chunks from a superseded import (stale
    /// generation) are dropped.
    pub fn add_chunk(&mut self, generation: u64, shapes: Vec<Shape>) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "stale chunk dropped");
            return;
        }
        if shapes.is_empty() {
            return;
        }
        // Visibility of the new chunk resolves on the next visibility pass.
        self.chunks.push(Chunk::new(shapes));
    }

    /// Note a viewport change; the visibility pass runs once the debounce
    /// window elapses.
    pub fn on_view_change(&mut self, now: Instant) {
        self.view_dirty_since = Some(now);
    }

    /// Per-frame tick: runs the debounced visibility pass, then drains the
    /// mount queue within the frame budget.
    pub fn tick(
        &mut self,
        viewport: &Viewport,
        surface: &mut dyn RenderSurface,
        now: Instant,
    ) {
        self.record_frame(now);
        if let Some(since) = self.view_dirty_since {
            if now.duration_since(since) >= debounce() {
                self.view_dirty_since = None;
                self.update_visibility(viewport, surface);
            }
        }
        self.pump_mount_queue(surface);
    }

    /// Recompute chunk visibility against the margin-expanded viewport:
    /// unmount chunks that left the view, queue newly visible ones.
    pub fn update_visibility(&mut self, viewport: &Viewport, surface: &mut dyn RenderSurface) {
        let margin = CHUNK_MARGIN_PX / viewport.zoom();
        let mut changed = false;
        for (index, chunk) in self.chunks.iter_mut().enumerate() {
            let Some(bounds) = chunk.bounds else {
                continue;
            };
            let visible = viewport.is_rect_visible(&bounds, margin);
            chunk.visible = visible;
            if visible {
                if !chunk.is_mounted() && !self.mount_queue.contains(&index) {
                    self.mount_queue.push_back(index);
                }
            } else if chunk.is_mounted() {
                for id in chunk.mounted.drain(..) {
                    surface.remove(id);
                }
                changed = true;
            }
        }
        if changed {
            surface.request_render();
        }
    }

    /// Mount queued chunks in batches, yielding once the per-frame budget
    /// or batch size is spent. Remaining work carries to the next tick.
    fn pump_mount_queue(&mut self, surface: &mut dyn RenderSurface) {
        if self.mount_queue.is_empty() {
            return;
        }
        let start = Instant::now();
        let budget = Duration::from_millis(FRAME_BUDGET_MS);
        let mut mounted_shapes = 0;
        while let Some(&index) = self.mount_queue.front() {
            if mounted_shapes >= MOUNT_BATCH_SIZE || start.elapsed() >= budget {
                break;
            }
            let Some(chunk) = self.chunks.get_mut(index) else {
                self.mount_queue.pop_front();
                continue;
            };
            if !chunk.visible {
                // Went back out of view while queued.
                self.mount_queue.pop_front();
                continue;
            }
            let next = chunk.mounted.len();
            if next >= chunk.shapes.len() {
                self.mount_queue.pop_front();
                continue;
            }
            let take = chunk
                .shapes
                .len()
                .min(next + MOUNT_BATCH_SIZE - mounted_shapes);
            for shape in &chunk.shapes[next..take] {
                let id = surface.add(spec_for_shape(shape, PrimitiveRole::Import, 1.0));
                chunk.mounted.push(id);
            }
            mounted_shapes += take - next;
            if chunk.mounted.len() >= chunk.shapes.len() {
                self.mount_queue.pop_front();
            }
        }
        if mounted_shapes > 0 {
            surface.request_render();
        }
    }

    /// Unmount and drop everything.
    pub fn clear(&mut self, surface: &mut dyn RenderSurface) {
        let mut removed = false;
        for chunk in &mut self.chunks {
            for id in chunk.mounted.drain(..) {
                surface.remove(id);
                removed = true;
            }
        }
        self.chunks.clear();
        self.mount_queue.clear();
        self.view_dirty_since = None;
        if removed {
            surface.request_render();
        }
    }

    #[must_use]
    pub fn stats(&self) -> ChunkStats {
        let total = self.chunks.iter().map(Chunk::len).sum();
        let mounted = self.chunks.iter().map(|c| c.mounted.len()).sum();
        let visible = self
            .chunks
            .iter()
            .filter(|c| c.visible)
            .map(Chunk::len)
            .sum();
        ChunkStats { total, mounted, visible, fps: self.measured_fps() }
    }

    fn record_frame(&mut self, now: Instant) {
        self.frame_times.push_back(now);
        while self.frame_times.len() > 60 {
            self.frame_times.pop_front();
        }
    }

    fn measured_fps(&self) -> f64 {
        if self.frame_times.len() < 2 {
            return 0.0;
        }
        let first = self.frame_times[0];
        let last = self.frame_times[self.frame_times.len() - 1];
        let span = last.duration_since(first).as_secs_f64();
        if span <= 0.0 {
            return 0.0;
        }
        (self.frame_times.len() - 1) as f64 / span
    }
}

fn debounce() -> Duration {
    Duration::from_millis(VISIBILITY_DEBOUNCE_MS)
}
