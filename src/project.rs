//! Persistence round-trip for the editor document.
//!
//! The backend is a collaborator trait ([`ProjectStore`]); the crate ships a
//! [`MemoryProjectStore`] for hosts without one and for the test suite. The
//! persisted schema is the stable `tabs[] → layers[] → shapes[]` tree
//! ([`EditorDocument`]) plus top-level paths to background assets and the
//! extracted reference geometry used for snapping.
//!
//! Save failures leave the store untouched; load failures fall back to an
//! empty default document. Loading a project whose persisted document
//! predates CAD layers back-fills one into the first tab when reference
//! geometry exists.

#[cfg(test)]
#[path = "project_test.rs"]
mod project_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::import::RawGeometry;
use crate::notify::{Notifier, Severity};
use crate::scene::{ChangeEvent, SceneStore, cad_layer, default_tab};
use crate::shape::{LayerKind, Shape, Tab};

/// Identifier of a stored project.
pub type ProjectId = Uuid;

/// The persisted editor document, schema-stable for compatibility with
/// documents written by earlier versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorDocument {
    pub tabs: Vec<Tab>,
}

/// One stored project as the backend returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, rename = "editorData")]
    pub editor_data: Option<EditorDocument>,
    #[serde(default, rename = "svgPath")]
    pub svg_path: Option<String>,
    #[serde(default, rename = "geoJsonPath")]
    pub geo_json_path: Option<String>,
    #[serde(default, rename = "dxfPath")]
    pub dxf_path: Option<String>,
    #[serde(default, rename = "extractedGeometry")]
    pub extracted_geometry: Option<RawGeometry>,
}

/// Error from the persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project not found: {0}")]
    NotFound(ProjectId),
    #[error("invalid editor document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    #[error("persistence backend: {0}")]
    Backend(String),
}

/// Project read/update collaborator.
pub trait ProjectStore {
    /// Fetch a project record.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::NotFound`] for an unknown id, or a backend
    /// error.
    fn fetch(&mut self, project_id: ProjectId) -> Result<ProjectRecord, ProjectError>;

    /// Replace a project's editor document.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::NotFound`] for an unknown id, or a backend
    /// error.
    fn update_editor_data(
        &mut self,
        project_id: ProjectId,
        document: &EditorDocument,
    ) -> Result<(), ProjectError>;
}

/// In-memory backend for hosts without persistence and for tests.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    records: HashMap<ProjectId, ProjectRecord>,
}

impl MemoryProjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, returning its id.
    pub fn insert(&mut self, record: ProjectRecord) -> ProjectId {
        let id = Uuid::new_v4();
        self.records.insert(id, record);
        id
    }

    #[must_use]
    pub fn record(&self, project_id: ProjectId) -> Option<&ProjectRecord> {
        self.records.get(&project_id)
    }
}

impl ProjectStore for MemoryProjectStore {
    fn fetch(&mut self, project_id: ProjectId) -> Result<ProjectRecord, ProjectError> {
        self.records
            .get(&project_id)
            .cloned()
            .ok_or(ProjectError::NotFound(project_id))
    }

    fn update_editor_data(
        &mut self,
        project_id: ProjectId,
        document: &EditorDocument,
    ) -> Result<(), ProjectError> {
        let record = self
            .records
            .get_mut(&project_id)
            .ok_or(ProjectError::NotFound(project_id))?;
        record.editor_data = Some(document.clone());
        Ok(())
    }
}

impl SceneStore {
    /// Snapshot the current tab tree as a persistable document.
    #[must_use]
    pub fn to_document(&self) -> EditorDocument {
        let mut tabs = self.tabs.clone();
        for tab in &mut tabs {
            tab.active = Some(tab.id) == self.active_tab_id();
        }
        EditorDocument { tabs }
    }

    /// Persist the full document through the backend. On failure the store
    /// keeps its current state and the failure surfaces as a toast.
    pub fn save(
        &mut self,
        project_id: ProjectId,
        backend: &mut dyn ProjectStore,
        notifier: &mut dyn Notifier,
    ) {
        let document = self.to_document();
        match backend.update_editor_data(project_id, &document) {
            Ok(()) => {
                tracing::info!(%project_id, tabs = document.tabs.len(), "project saved");
                notifier.notify(Severity::Success, "Saved", "Project saved.");
            }
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "project save failed");
                notifier.notify(Severity::Error, "Save failed", &e.to_string());
            }
        }
    }

    /// Load the full document from the backend, replacing the current one.
    /// On failure the store resets to an empty default document.
    pub fn load_editor_data(
        &mut self,
        project_id: ProjectId,
        backend: &mut dyn ProjectStore,
        notifier: &mut dyn Notifier,
    ) {
        let record = match backend.fetch(project_id) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "project load failed");
                notifier.notify(Severity::Error, "Load failed", &e.to_string());
                self.install_tabs(vec![default_tab("Tab 1", true, false)]);
                return;
            }
        };
        let has_geometry = record
            .extracted_geometry
            .as_ref()
            .is_some_and(|g| !g.is_empty());
        let mut tabs = match record.editor_data {
            Some(document) if !document.tabs.is_empty() => document.tabs,
            _ => vec![default_tab("Tab 1", true, has_geometry)],
        };
        // Documents persisted before CAD underlays existed lack the layer;
        // back-fill it when the project carries reference geometry.
        if has_geometry {
            if let Some(first) = tabs.first_mut() {
                if !first.layers.iter().any(|l| l.kind == LayerKind::Cad) {
                    first.layers.insert(0, cad_layer());
                }
            }
        }
        self.background_url = record.svg_path;
        self.reference_geometry = record.extracted_geometry;
        let shape_count: usize = tabs
            .iter()
            .flat_map(|t| t.layers.iter())
            .map(|l| l.shapes.len())
            .sum();
        tracing::info!(%project_id, tabs = tabs.len(), shapes = shape_count, "project loaded");
        self.install_tabs(tabs);
    }

    /// Reset the document to a single default tab seeded with `shapes` in
    /// its user layer. Entry point for projects without a persisted
    /// document (e.g. fresh from background extraction).
    pub fn load_from_project(
        &mut self,
        shapes: Vec<Shape>,
        background_url: Option<String>,
        reference_geometry: Option<RawGeometry>,
    ) {
        let has_geometry = reference_geometry.as_ref().is_some_and(|g| !g.is_empty());
        let mut tab = default_tab("Tab 1", true, has_geometry);
        if let Some(layer) = tab.layers.iter_mut().find(|l| l.kind == LayerKind::User) {
            layer.shapes = shapes;
        }
        self.background_url = background_url;
        self.reference_geometry = reference_geometry;
        self.install_tabs(vec![tab]);
    }

    /// Restore a history snapshot: replace the document and re-apply the
    /// selection it carried, dropping ids that no longer resolve.
    pub(crate) fn install_document(
        &mut self,
        document: EditorDocument,
        selection: Vec<crate::shape::ShapeId>,
    ) {
        self.install_tabs(document.tabs);
        let selection: Vec<_> = selection
            .into_iter()
            .filter(|id| self.find_shape(*id).is_some())
            .collect();
        if !selection.is_empty() {
            self.selection = selection;
            self.notify_change(ChangeEvent::Selection);
        }
    }

    /// Replace the tab tree wholesale and re-derive active tab/layer.
    fn install_tabs(&mut self, tabs: Vec<Tab>) {
        debug_assert!(!tabs.is_empty());
        self.tabs = tabs;
        let active = self
            .tabs
            .iter()
            .find(|t| t.active)
            .or(self.tabs.first())
            .map(|t| t.id);
        self.active_tab = active;
        self.active_layer = self.active_tab().and_then(|t| t.layers.first()).map(|l| l.id);
        self.selection.clear();
        self.notify_change(ChangeEvent::ActiveTab);
        self.notify_change(ChangeEvent::ActiveLayer);
        self.notify_change(ChangeEvent::Selection);
        self.notify_change(ChangeEvent::Shapes);
    }
}
