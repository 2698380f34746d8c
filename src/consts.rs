//! Shared numeric constants for the editor core.
//!
//! The working unit is centimeters: 1 world unit = 1 cm. Tolerances given
//! in "px" are screen pixels and are divided by the current zoom before use.

// ── Viewport ────────────────────────────────────────────────────

/// Lower zoom bound.
pub const MIN_ZOOM: f64 = 0.05;

/// Upper zoom bound.
pub const MAX_ZOOM: f64 = 10.0;

/// Padding around content when fitting the view, in screen pixels.
pub const FIT_PADDING_PX: f64 = 50.0;

// ── Hit-testing / selection ─────────────────────────────────────

/// Screen-space hit slop around shapes, divided by zoom.
pub const HIT_TOLERANCE_PX: f64 = 15.0;

/// Floor for the zoomed hit tolerance in world units.
pub const MIN_HIT_TOLERANCE: f64 = 5.0;

/// Screen-space threshold under which two clicks count as "the same spot"
/// for cycling through overlapping candidates, divided by zoom.
pub const CYCLE_THRESHOLD_PX: f64 = 5.0;

/// Bounding-box areas closer than this are treated as a tie and broken by
/// distance from the pointer.
pub const AREA_TIE_EPSILON: f64 = 5.0;

// ── Drawing ─────────────────────────────────────────────────────

/// World-unit distance from the first accumulated point that closes a
/// polygon in progress.
pub const CLOSE_TOLERANCE: f64 = 20.0;

/// Radius used when scanning reference geometry for a snap vertex.
pub const SNAP_RADIUS: f64 = 25.0;

/// Default panel stamp size when no catalog item is active (cm).
pub const DEFAULT_PANEL_WIDTH: f64 = 120.0;
pub const DEFAULT_PANEL_HEIGHT: f64 = 60.0;

/// Prop stamp radius (cm).
pub const PROP_RADIUS: f64 = 15.0;

/// World-unit offset applied to pasted shapes.
pub const PASTE_OFFSET: f64 = 20.0;

// ── History ─────────────────────────────────────────────────────

/// Maximum retained snapshots; the oldest is evicted past this.
pub const MAX_HISTORY: usize = 50;

// ── Chunked rendering ───────────────────────────────────────────

/// Shapes per chunk when partitioning bulk imports.
pub const CHUNK_SIZE: usize = 500;

/// Maximum shapes mounted per animation frame.
pub const MOUNT_BATCH_SIZE: usize = 100;

/// Per-frame time budget for mount work, in milliseconds.
pub const FRAME_BUDGET_MS: u64 = 16;

/// Debounce applied to viewport-driven visibility updates, in milliseconds.
pub const VISIBILITY_DEBOUNCE_MS: u64 = 50;

/// Screen-space margin around the viewport when testing chunk visibility,
/// divided by zoom.
pub const CHUNK_MARGIN_PX: f64 = 200.0;

/// Imported shapes beyond this count are skipped during full resync to
/// bound worst-case rebuild cost.
pub const RESYNC_IMPORT_CAP: usize = 20_000;

// ── Grid ────────────────────────────────────────────────────────

/// Default grid spacing (cm).
pub const DEFAULT_GRID_SIZE: f64 = 100.0;

// ── Colors ──────────────────────────────────────────────────────

pub const COLOR_BEAM: &str = "#ff6600";
pub const COLOR_POLYGON_FILL: &str = "rgba(100, 149, 237, 0.4)";
pub const COLOR_POLYGON_STROKE: &str = "#1565c0";
pub const COLOR_TRACE_MARKER_FILL: &str = "#fb8c00";
pub const COLOR_TRACE_MARKER_STROKE: &str = "#ef6c00";
pub const COLOR_CLOSING_HINT: &str = "#4caf50";
pub const COLOR_PANEL_FILL: &str = "rgba(200, 230, 201, 0.8)";
pub const COLOR_PANEL_STROKE: &str = "#2e7d32";
pub const COLOR_PROP_FILL: &str = "#ffeb3b";
pub const COLOR_PROP_STROKE: &str = "#f57c00";
pub const COLOR_SNAP_GUIDE: &str = "#f44336";
pub const COLOR_GENERATED_AUTO: &str = "#FFCC00";
pub const COLOR_GENERATED_OPTIMAL: &str = "#4CAF50";
pub const COLOR_GENERATED_STROKE: &str = "#1b5e20";
pub const COLOR_CAD_LAYER: &str = "#666666";
