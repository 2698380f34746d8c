//! History Engine: undo/redo over full editor snapshots.
//!
//! A snapshot pairs the serialized surface blob with the scene document and
//! selection, so restoring never leaves the surface showing one state and
//! the store holding another. Snapshots form a linear stack with a current
//! index: a fresh save after undoing truncates everything past the index
//! (redo history is lost on a new branch), and depth is bounded to
//! [`MAX_HISTORY`] with oldest-first eviction and index decrement.
//!
//! Restores set `is_restoring` so mutations replayed during a restore do
//! not themselves record history; the flag is reset on every exit path —
//! a stuck flag would silently stop all future recording.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::consts::MAX_HISTORY;
use crate::project::EditorDocument;
use crate::scene::SceneStore;
use crate::shape::ShapeId;
use crate::surface::RenderSurface;

struct Snapshot {
    surface: serde_json::Value,
    document: EditorDocument,
    selection: Vec<ShapeId>,
}

/// Bounded undo/redo stack.
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
    is_restoring: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self { snapshots: Vec::new(), index: 0, is_restoring: false }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Index of the current snapshot. Meaningless while empty.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.snapshots.is_empty() && self.index < self.snapshots.len() - 1
    }

    /// Whether a restore is in progress right now.
    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.is_restoring
    }

    /// Capture the current state and push it as the new current snapshot,
    /// truncating any redo branch. Skipped while restoring.
    pub fn save_state(&mut self, store: &SceneStore, surface: &dyn RenderSurface) {
        if self.is_restoring {
            return;
        }
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.index + 1);
        }
        self.snapshots.push(Snapshot {
            surface: surface.serialize_state(),
            document: store.to_document(),
            selection: store.selection().to_vec(),
        });
        self.index = self.snapshots.len() - 1;
        if self.snapshots.len() > MAX_HISTORY {
            self.snapshots.remove(0);
            self.index -= 1;
        }
    }

    /// Step back one snapshot. Returns false when already at the oldest.
    pub fn undo(&mut self, store: &mut SceneStore, surface: &mut dyn RenderSurface) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        self.restore(store, surface)
    }

    /// Step forward one snapshot. Returns false when already at the newest.
    pub fn redo(&mut self, store: &mut SceneStore, surface: &mut dyn RenderSurface) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.index += 1;
        self.restore(store, surface)
    }

    /// Drop all snapshots.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = 0;
    }

    fn restore(&mut self, store: &mut SceneStore, surface: &mut dyn RenderSurface) -> bool {
        self.is_restoring = true;
        let snapshot = &self.snapshots[self.index];
        let result = surface.restore_state(&snapshot.surface);
        if result.is_ok() {
            let document = snapshot.document.clone();
            let selection = snapshot.selection.clone();
            store.install_document(document, selection);
        }
        // Reset unconditionally: a stuck flag disables all future saves.
        self.is_restoring = false;
        match result {
            Ok(()) => {
                surface.request_render();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, index = self.index, "history restore failed");
                false
            }
        }
    }
}
