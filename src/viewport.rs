//! Pan/zoom viewport state and coordinate conversions.
//!
//! Zoom and pan are screen-space: a world point maps to screen as
//! `world * zoom + pan`. Zoom is clamped to [`MIN_ZOOM`]..[`MAX_ZOOM`].
//! View changes notify registered listeners synchronously and are throttled
//! to animation-frame cadence by [`Viewport::tick_frame`] — at most one
//! applied update per frame, with the final requested state never dropped.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use crate::consts::{FIT_PADDING_PX, MAX_ZOOM, MIN_ZOOM};
use crate::geometry::{Bounds, Point};

/// Identifier for a registered view-change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Applied state of a pending throttled request.
#[derive(Debug, Clone, Copy)]
struct ViewRequest {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
}

/// The viewport: zoom, pan, and render-surface size.
pub struct Viewport {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
    width: f64,
    height: f64,
    listeners: Vec<(ListenerId, Box<dyn FnMut(f64, f64, f64)>)>,
    next_listener: u64,
    /// Whether an update was already applied since the last frame tick.
    applied_this_frame: bool,
    pending: Option<ViewRequest>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            width: 1920.0,
            height: 1080.0,
            listeners: Vec::new(),
            next_listener: 0,
            applied_this_frame: false,
            pending: None,
        }
    }
}

impl Viewport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- State access ---

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn zoom_percent(&self) -> i64 {
        (self.zoom * 100.0).round() as i64
    }

    /// World-space bounds currently visible.
    #[must_use]
    pub fn visible_bounds(&self) -> Bounds {
        Bounds {
            min_x: -self.pan_x / self.zoom,
            min_y: -self.pan_y / self.zoom,
            max_x: (-self.pan_x + self.width) / self.zoom,
            max_y: (-self.pan_y + self.height) / self.zoom,
        }
    }

    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance to world units at the current zoom.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Whether a world-space box overlaps the visible area, expanded by
    /// `margin` world units.
    #[must_use]
    pub fn is_rect_visible(&self, rect: &Bounds, margin: f64) -> bool {
        rect.intersects_with_margin(&self.visible_bounds(), margin)
    }

    // --- Mutation ---

    /// Request a zoom change, optionally anchored so the screen point stays
    /// put. Throttled: the first request in a frame applies immediately,
    /// later ones are deferred to the next [`Self::tick_frame`].
    pub fn set_zoom(&mut self, zoom: f64, anchor: Option<Point>) {
        let clamped = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (clamped - self.zoom).abs() < 0.001 {
            return;
        }
        let (pan_x, pan_y) = if let Some(anchor) = anchor {
            // Keep the world point under the anchor fixed on screen.
            let world_x = (anchor.x - self.pan_x) / self.zoom;
            let world_y = (anchor.y - self.pan_y) / self.zoom;
            (anchor.x - world_x * clamped, anchor.y - world_y * clamped)
        } else {
            (self.pan_x, self.pan_y)
        };
        self.request(ViewRequest { zoom: clamped, pan_x, pan_y });
    }

    pub fn zoom_in(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor, None);
    }

    pub fn zoom_out(&mut self, factor: f64) {
        self.set_zoom(self.zoom / factor, None);
    }

    /// Absolute pan. Throttled like zoom.
    pub fn set_pan(&mut self, x: f64, y: f64) {
        if self.pan_x == x && self.pan_y == y && self.pending.is_none() {
            return;
        }
        self.request(ViewRequest { zoom: self.zoom, pan_x: x, pan_y: y });
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        // Deltas compose against the latest requested state, not the last
        // applied one, so rapid drags don't lose motion.
        let (base_x, base_y) = match self.pending {
            Some(p) => (p.pan_x, p.pan_y),
            None => (self.pan_x, self.pan_y),
        };
        self.set_pan(base_x + dx, base_y + dy);
    }

    pub fn reset_view(&mut self) {
        self.apply(ViewRequest { zoom: 1.0, pan_x: 0.0, pan_y: 0.0 });
    }

    /// Fit `content` into the view with [`FIT_PADDING_PX`] padding on every
    /// side, centered. No-op for degenerate content. Applied immediately.
    pub fn zoom_to_fit(&mut self, content: &Bounds) {
        let content_w = content.width();
        let content_h = content.height();
        if content_w <= 0.0 || content_h <= 0.0 {
            return;
        }
        let avail_w = self.width - FIT_PADDING_PX * 2.0;
        let avail_h = self.height - FIT_PADDING_PX * 2.0;
        let zoom = (avail_w / content_w).min(avail_h / content_h).clamp(MIN_ZOOM, MAX_ZOOM);
        let center = content.center();
        self.apply(ViewRequest {
            zoom,
            pan_x: self.width / 2.0 - center.x * zoom,
            pan_y: self.height / 2.0 - center.y * zoom,
        });
    }

    /// Update the render-surface size in device pixels.
    pub fn set_size(&mut self, width: f64, height: f64) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
    }

    /// Animation-frame tick: applies the trailing throttled request, if any.
    /// Returns true when a deferred update was applied.
    pub fn tick_frame(&mut self) -> bool {
        self.applied_this_frame = false;
        if let Some(req) = self.pending.take() {
            self.apply(req);
            return true;
        }
        false
    }

    // --- Listeners ---

    /// Register a `(zoom, pan_x, pan_y)` listener invoked synchronously
    /// after every applied view change.
    pub fn on_view_change(&mut self, listener: Box<dyn FnMut(f64, f64, f64)>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // --- Internals ---

    /// Leading+trailing throttle: apply now if this frame is still clean,
    /// otherwise overwrite the pending trailing request.
    fn request(&mut self, req: ViewRequest) {
        if self.applied_this_frame {
            self.pending = Some(req);
        } else {
            self.apply(req);
        }
    }

    fn apply(&mut self, req: ViewRequest) {
        self.zoom = req.zoom;
        self.pan_x = req.pan_x;
        self.pan_y = req.pan_y;
        self.applied_this_frame = true;
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in &mut listeners {
            listener(self.zoom, self.pan_x, self.pan_y);
        }
        listeners.extend(self.listeners.drain(..));
        self.listeners = listeners;
    }
}
