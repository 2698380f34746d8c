//! Formwork-calculation ingestion.
//!
//! Layout optimization itself is an external service consumed as a black
//! box through [`FormworkClient`]. This module owns the request/response
//! DTOs, the meters→centimeters unit conversion at the ingest boundary,
//! and the replace-only-generated rule: ingesting a result removes every
//! shape carrying the generated-provenance flag and leaves user-drawn
//! shapes untouched.

#[cfg(test)]
#[path = "formwork_test.rs"]
mod formwork_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{
    COLOR_GENERATED_AUTO, COLOR_GENERATED_OPTIMAL, COLOR_GENERATED_STROKE, COLOR_PROP_STROKE,
};
use crate::geometry::Point;
use crate::notify::{Notifier, Severity};
use crate::scene::{ChangeEvent, SceneStore};
use crate::shape::{Shape, ShapeId, ShapeKind};

/// Default slab thickness sent with a calculation request (cm).
pub const DEFAULT_SLAB_THICKNESS: f64 = 25.0;

/// Default floor height sent with a calculation request (cm).
pub const DEFAULT_FLOOR_HEIGHT: f64 = 300.0;

/// A calculation request. All geometry is in centimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormworkRequest {
    /// Slab outline in world coordinates.
    pub points: Vec<Point>,
    /// Bounding width of the outline.
    pub width: f64,
    /// Bounding height of the outline.
    pub height: f64,
    #[serde(rename = "slabThickness")]
    pub slab_thickness: f64,
    #[serde(rename = "floorHeight")]
    pub floor_height: f64,
    #[serde(rename = "includeBeams")]
    pub include_beams: bool,
    /// Prefer panels available in warehouse stock.
    #[serde(rename = "optimizeForWarehouse")]
    pub optimize_for_warehouse: bool,
}

/// Panel dimensions as the service reports them (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelDetails {
    pub length: f64,
    pub width: f64,
}

/// Beam dimensions as the service reports them (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamDetails {
    pub length: f64,
}

/// One placed element. Positions are in meters; ingest scales them ×100.
/// The discriminator is validated here at the boundary, not downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "elementType", rename_all = "lowercase")]
pub enum FormworkElement {
    Panel {
        #[serde(rename = "positionX")]
        position_x: f64,
        #[serde(rename = "positionY")]
        position_y: f64,
        #[serde(default)]
        rotation: f64,
        details: PanelDetails,
    },
    Prop {
        #[serde(rename = "positionX")]
        position_x: f64,
        #[serde(rename = "positionY")]
        position_y: f64,
    },
    Beam {
        #[serde(rename = "positionX")]
        position_x: f64,
        #[serde(rename = "positionY")]
        position_y: f64,
        #[serde(default)]
        rotation: f64,
        details: BeamDetails,
    },
}

/// A full calculation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormworkLayout {
    pub elements: Vec<FormworkElement>,
}

/// Error from the calculation service.
#[derive(Debug, thiserror::Error)]
pub enum FormworkError {
    #[error("formwork service: {0}")]
    Service(String),
    #[error("invalid formwork response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Calculation service collaborator.
pub trait FormworkClient {
    /// Run a layout calculation.
    ///
    /// # Errors
    ///
    /// Returns [`FormworkError`] when the service refuses or the response
    /// does not decode.
    fn calculate(&mut self, request: &FormworkRequest) -> Result<FormworkLayout, FormworkError>;
}

impl SceneStore {
    /// Generate a quick panel layout for a slab (by id, or the first slab
    /// found) and ingest the result.
    pub fn generate_auto_layout(
        &mut self,
        shape_id: Option<ShapeId>,
        client: &mut dyn FormworkClient,
        notifier: &mut dyn Notifier,
    ) {
        self.generate_layout(shape_id, false, client, notifier);
    }

    /// Generate a warehouse-stock-optimized layout and ingest the result.
    pub fn generate_optimal_layout(
        &mut self,
        shape_id: Option<ShapeId>,
        client: &mut dyn FormworkClient,
        notifier: &mut dyn Notifier,
    ) {
        notifier.notify(
            Severity::Info,
            "Optimizing",
            "Matching the layout against warehouse stock.",
        );
        self.generate_layout(shape_id, true, client, notifier);
    }

    fn generate_layout(
        &mut self,
        shape_id: Option<ShapeId>,
        optimize_for_warehouse: bool,
        client: &mut dyn FormworkClient,
        notifier: &mut dyn Notifier,
    ) {
        let Some(request) = self.slab_request(shape_id, optimize_for_warehouse) else {
            tracing::warn!("formwork generation without a slab outline");
            notifier.notify(
                Severity::Warn,
                "No slab defined",
                "Trace a slab outline before generating formwork.",
            );
            return;
        };
        let layout = match client.calculate(&request) {
            Ok(layout) => layout,
            Err(e) => {
                tracing::warn!(error = %e, "formwork calculation failed");
                notifier.notify(Severity::Error, "Generation failed", &e.to_string());
                return;
            }
        };
        let count = self.ingest_layout(&layout, optimize_for_warehouse);
        tracing::info!(count, optimize_for_warehouse, "formwork layout ingested");
        notifier.notify(
            Severity::Success,
            "Formwork generated",
            &format!("Placed {count} elements."),
        );
    }

    /// Build a request from a slab shape, by id or first match. `None` when
    /// no slab with at least three points exists.
    fn slab_request(
        &self,
        shape_id: Option<ShapeId>,
        optimize_for_warehouse: bool,
    ) -> Option<FormworkRequest> {
        let is_slab = |s: &&Shape| {
            matches!(s.kind, ShapeKind::Slab | ShapeKind::Polygon)
                && s.points.as_ref().is_some_and(|p| p.len() >= 3)
        };
        let slab = match shape_id {
            Some(id) => self.find_shape(id).filter(is_slab)?,
            None => self.all_shapes().into_iter().find(is_slab)?,
        };
        let points = slab.world_points();
        let bounds = slab.bounds();
        Some(FormworkRequest {
            points,
            width: bounds.width(),
            height: bounds.height(),
            slab_thickness: DEFAULT_SLAB_THICKNESS,
            floor_height: DEFAULT_FLOOR_HEIGHT,
            include_beams: true,
            optimize_for_warehouse,
        })
    }

    /// Replace previously generated shapes with the response elements.
    /// Returns the number of elements placed.
    fn ingest_layout(&mut self, layout: &FormworkLayout, optimal: bool) -> usize {
        let generated: Vec<ShapeId> = self
            .all_shapes()
            .into_iter()
            .filter(|s| s.props().is_generated())
            .map(|s| s.id)
            .collect();
        if let Some(tab) = self.active_tab_mut() {
            for layer in &mut tab.layers {
                layer.shapes.retain(|s| !generated.contains(&s.id));
            }
        }
        let fill = if optimal { COLOR_GENERATED_OPTIMAL } else { COLOR_GENERATED_AUTO };
        let shapes: Vec<Shape> = layout
            .elements
            .iter()
            .map(|e| element_to_shape(e, fill))
            .collect();
        let count = shapes.len();
        let layer_id = self.active_layer_id();
        if let Some(tab) = self.active_tab_mut() {
            let target = match layer_id.and_then(|id| tab.layers.iter().position(|l| l.id == id)) {
                Some(index) => tab.layers.get_mut(index),
                None => tab.layers.last_mut(),
            };
            if let Some(layer) = target {
                layer.shapes.extend(shapes);
            }
        }
        self.notify_change(ChangeEvent::Shapes);
        count
    }
}

/// Convert one response element into a scene shape. Positions scale from
/// meters to centimeters; a 90° panel rotation is folded into swapped
/// dimensions so the stored shape stays axis-aligned.
fn element_to_shape(element: &FormworkElement, fill: &str) -> Shape {
    let properties = |stroke: &str| {
        serde_json::json!({
            "fill": fill,
            "stroke": stroke,
            "isGenerated": true,
        })
    };
    match element {
        FormworkElement::Panel { position_x, position_y, rotation, details } => {
            let (mut width, mut height) = (details.length, details.width);
            let mut rotation = *rotation;
            if (rotation - 90.0).abs() < f64::EPSILON {
                std::mem::swap(&mut width, &mut height);
                rotation = 0.0;
            }
            Shape {
                id: Uuid::new_v4(),
                kind: ShapeKind::Panel,
                x: position_x * 100.0,
                y: position_y * 100.0,
                rotation,
                points: None,
                width: Some(width),
                height: Some(height),
                properties: properties(COLOR_GENERATED_STROKE),
                catalog_code: None,
            }
        }
        FormworkElement::Prop { position_x, position_y } => Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Prop,
            x: position_x * 100.0,
            y: position_y * 100.0,
            rotation: 0.0,
            points: None,
            width: None,
            height: None,
            properties: properties(COLOR_PROP_STROKE),
            catalog_code: None,
        },
        FormworkElement::Beam { position_x, position_y, rotation, details } => Shape {
            id: Uuid::new_v4(),
            kind: ShapeKind::Beam,
            x: position_x * 100.0,
            y: position_y * 100.0,
            rotation: *rotation,
            points: Some(vec![Point::new(0.0, 0.0), Point::new(details.length, 0.0)]),
            width: None,
            height: None,
            properties: properties(COLOR_GENERATED_STROKE),
            catalog_code: None,
        },
    }
}
