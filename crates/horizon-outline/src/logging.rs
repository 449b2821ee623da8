//! Tracing targets for the outline table controller.
//!
//! Use these with `tracing` directives to filter logs by subsystem, e.g.
//! `RUST_LOG=horizon_outline::undo=trace`.

pub use horizon_outline_core::logging::{span_names, PerfSpan, TreeFormatOptions, TreeStyle};

/// Target names for log filtering.
pub mod targets {
    /// Table sync and row projection.
    pub const TABLE: &str = "horizon_outline::table";
    /// Undo coordinator and stacks.
    pub const UNDO: &str = "horizon_outline::undo";
    /// Drag and drop engine.
    pub const DRAG: &str = "horizon_outline::drag";
    /// Filter engine.
    pub const FILTER: &str = "horizon_outline::filter";
    /// Snapshot codec.
    pub const CODEC: &str = "horizon_outline::codec";
    /// Workspace context and mutation helpers.
    pub const WORKSPACE: &str = "horizon_outline::workspace";
}
