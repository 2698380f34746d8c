//! Inventory catalog reference data used to parameterize stamped shapes.

use serde::{Deserialize, Serialize};

/// What a catalog entry stamps onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Panel,
    Prop,
}

/// One inventory item. Not part of the document — only newly stamped shapes
/// reference it, by `code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub code: String,
    pub name: String,
    /// Panel width in cm.
    pub width: f64,
    /// Panel length in cm.
    pub length: f64,
    pub manufacturer: String,
    pub system: String,
    #[serde(rename = "type")]
    pub kind: CatalogKind,
}
