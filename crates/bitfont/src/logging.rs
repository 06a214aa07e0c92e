//! Tracing targets used by the font subsystem.
//!
//! `bitfont` emits its diagnostics through the `tracing` crate. Install a
//! subscriber in the host application to see them, and use these targets to
//! filter by subsystem:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("bitfont::cache=trace,bitfont::registry=debug")
//!     .init();
//! ```

/// Target names for log filtering.
pub mod targets {
    /// Font registry: loading, selection, unloading.
    pub const REGISTRY: &str = "bitfont::registry";
    /// Atlas discovery, parsing and synthesis.
    pub const ATLAS: &str = "bitfont::atlas";
    /// Per-string draw-command cache and eviction sweeps.
    pub const CACHE: &str = "bitfont::cache";
    /// Layout helpers (wrapping, box placement).
    pub const LAYOUT: &str = "bitfont::layout";
}
