//! Canvas editor core for the formwork layout planner.
//!
//! This crate is the geometric and state subsystem behind the slab-formwork
//! editor: a scene graph of shapes organized into layers and tabs, a pan/zoom
//! viewport, multi-step drawing tools, tolerance-based selection with
//! click-cycling, snapshot undo/redo, and chunked lazy rendering for bulk
//! imported CAD geometry. It is renderer-agnostic — the host supplies a
//! [`surface::RenderSurface`] implementation and feeds pointer/keyboard
//! events into [`engine::Engine`]; everything else lives here.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Canvas orchestrator: event dispatch, store↔surface sync |
//! | [`scene`] | Authoritative document store (tabs → layers → shapes) |
//! | [`shape`] | Shape, layer, and tab data types |
//! | [`drawing`] | Multi-step drawing tool state machine |
//! | [`hit`] | Hit-testing, smallest-wins selection, click-cycling |
//! | [`history`] | Snapshot undo/redo stack |
//! | [`chunk`] | Viewport-driven lazy mounting of bulk geometry |
//! | [`import`] | Incremental parsing of raw reference geometry |
//! | [`viewport`] | Pan/zoom state and coordinate conversions |
//! | [`surface`] | Renderer collaborator trait + headless implementation |
//! | [`project`] | Persisted document schema and project round-trip |
//! | [`formwork`] | Formwork-calculation ingestion (meters → cm) |
//! | [`geometry`] | Pure geometry helpers (distance, healing, polygons) |
//! | [`input`] | Tool, pointer, and keyboard event types |
//! | [`catalog`] | Inventory catalog reference items |
//! | [`notify`] | User-facing notification channel |
//! | [`consts`] | Shared tolerances and limits |

pub mod catalog;
pub mod chunk;
pub mod consts;
pub mod drawing;
pub mod engine;
pub mod formwork;
pub mod geometry;
pub mod history;
pub mod hit;
pub mod import;
pub mod input;
pub mod notify;
pub mod project;
pub mod scene;
pub mod shape;
pub mod surface;
pub mod viewport;
