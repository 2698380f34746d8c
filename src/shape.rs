//! Document model: shapes, layers, and tabs.
//!
//! A [`Shape`] is one drawable entity; layers group shapes with shared
//! visibility/lock/opacity flags; tabs are ordered pages of layers. The
//! open-ended `props` JSON bag carries styling, labels, and provenance flags
//! and gets a typed accessor ([`Props`]). A sparse-update type
//! ([`PartialShape`]) supports incremental edits without cloning the shape.
//!
//! These types serialize directly into the persisted document schema, so
//! field names are wire-stable.

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::PROP_RADIUS;
use crate::geometry::{Bounds, Point, bounds_of_points};

/// Unique identifier for a shape.
pub type ShapeId = Uuid;

/// Unique identifier for a layer.
pub type LayerId = Uuid;

/// Unique identifier for a tab.
pub type TabId = Uuid;

/// The kind of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Slab outline: a closed polygon that formwork generation targets.
    Slab,
    /// Generic polygon or polyline (two points render as an open line).
    Polygon,
    /// Support beam drawn as a line segment.
    Beam,
    /// Formwork panel: an axis-aligned rectangle, possibly catalog-sized.
    Panel,
    /// Prop: a circular support marker.
    Prop,
    /// Plain rectangle annotation.
    Rectangle,
}

impl ShapeKind {
    /// Whether this kind stores its geometry as a vertex list.
    #[must_use]
    pub fn has_points(self) -> bool {
        matches!(self, Self::Slab | Self::Polygon | Self::Beam)
    }
}

/// A drawable entity as stored in the document and on the wire.
///
/// Origin semantics depend on the kind: top-left corner for panels and
/// rectangles, offset of the vertex list for point-based kinds, center for
/// props.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    /// Vertex list for point-based kinds; closure is implied, not stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Open-ended styling/label/provenance bag.
    #[serde(default = "empty_props")]
    pub properties: serde_json::Value,
    /// Inventory item this shape was stamped from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "catalogCode")]
    pub catalog_code: Option<String>,
}

fn empty_props() -> serde_json::Value {
    serde_json::json!({})
}

impl Shape {
    /// Axis-aligned bounding box in world coordinates. Rotation is ignored
    /// for box kinds — callers needing rotated extents expand by tolerance.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        match self.kind {
            ShapeKind::Slab | ShapeKind::Polygon | ShapeKind::Beam => {
                let points = self.points.as_deref().unwrap_or_default();
                let mut b = bounds_of_points(points)
                    .unwrap_or_else(|| Bounds::new(self.x, self.y, self.x, self.y));
                b.min_x += self.x;
                b.min_y += self.y;
                b.max_x += self.x;
                b.max_y += self.y;
                b
            }
            ShapeKind::Panel | ShapeKind::Rectangle => {
                let w = self.width.unwrap_or(0.0);
                let h = self.height.unwrap_or(0.0);
                Bounds::new(self.x, self.y, self.x + w, self.y + h)
            }
            ShapeKind::Prop => Bounds::new(
                self.x - PROP_RADIUS,
                self.y - PROP_RADIUS,
                self.x + PROP_RADIUS,
                self.y + PROP_RADIUS,
            ),
        }
    }

    /// Vertex list translated by the shape origin.
    #[must_use]
    pub fn world_points(&self) -> Vec<Point> {
        self.points
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| Point::new(p.x + self.x, p.y + self.y))
            .collect()
    }

    /// Typed view over `properties`.
    #[must_use]
    pub fn props(&self) -> Props<'_> {
        Props::new(&self.properties)
    }
}

/// Sparse update for a shape. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialShape {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Props keys to merge; `null` values delete keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_code: Option<String>,
}

impl PartialShape {
    /// Merge this update into `shape`.
    pub fn apply_to(&self, shape: &mut Shape) {
        if let Some(x) = self.x {
            shape.x = x;
        }
        if let Some(y) = self.y {
            shape.y = y;
        }
        if let Some(r) = self.rotation {
            shape.rotation = r;
        }
        if let Some(ref points) = self.points {
            shape.points = Some(points.clone());
        }
        if let Some(w) = self.width {
            shape.width = Some(w);
        }
        if let Some(h) = self.height {
            shape.height = Some(h);
        }
        if let Some(ref code) = self.catalog_code {
            shape.catalog_code = Some(code.clone());
        }
        if let Some(ref props) = self.properties {
            let Some(incoming) = props.as_object() else {
                return;
            };
            if !shape.properties.is_object() {
                shape.properties = serde_json::json!({});
            }
            if let Some(existing) = shape.properties.as_object_mut() {
                for (k, v) in incoming {
                    if v.is_null() {
                        existing.remove(k);
                    } else {
                        existing.insert(k.clone(), v.clone());
                    }
                }
            }
        }
    }
}

/// Typed access to common props fields.
pub struct Props<'a> {
    value: &'a serde_json::Value,
}

impl<'a> Props<'a> {
    #[must_use]
    pub fn new(value: &'a serde_json::Value) -> Self {
        Self { value }
    }

    /// Fill color as a CSS color string, when set.
    #[must_use]
    pub fn fill(&self) -> Option<&str> {
        self.value.get("fill").and_then(|v| v.as_str())
    }

    /// Stroke color as a CSS color string, when set.
    #[must_use]
    pub fn stroke(&self) -> Option<&str> {
        self.value.get("stroke").and_then(|v| v.as_str())
    }

    /// Stroke width in world units. Defaults to `1.0` when absent.
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.value
            .get("strokeWidth")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(1.0)
    }

    /// Label text displayed on the shape. Empty string when absent.
    #[must_use]
    pub fn label(&self) -> &str {
        self.value.get("label").and_then(|v| v.as_str()).unwrap_or("")
    }

    /// Provenance flag: true for shapes produced by formwork generation.
    /// Generation replaces only flagged shapes, never user-drawn ones.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.value
            .get("isGenerated")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Provenance flag: true for shapes materialized from bulk-imported
    /// reference geometry.
    #[must_use]
    pub fn from_import(&self) -> bool {
        self.value
            .get("fromImport")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Layer category. Determines which operations are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Non-deletable, non-renamable.
    System,
    /// Background-derived reference geometry; locked by default and pinned
    /// to the first tab.
    Cad,
    /// Fully editable.
    User,
}

/// A named, orderable group of shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(rename = "isVisible")]
    pub is_visible: bool,
    #[serde(rename = "isLocked")]
    pub is_locked: bool,
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

/// An ordered page of layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub layers: Vec<Layer>,
}

impl Tab {
    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }
}
