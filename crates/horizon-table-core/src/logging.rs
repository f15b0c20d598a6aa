//! Logging facilities for Horizon Table.
//!
//! Horizon Table uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_table=debug,horizon_table_core=info")
//!         .init();
//! }
//! ```
//!
//! Every log statement in the workspace names one of the [`targets`] below,
//! so a filter directive can isolate a single subsystem (for example only
//! binding resolution failures).

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_table_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_table_core::signal";
    /// Keypath parsing and resolution target.
    pub const KEYPATH: &str = "horizon_table_core::keypath";
    /// Observable collection target.
    pub const COLLECTION: &str = "horizon_table_core::collection";
    /// Binding engine target.
    pub const BINDING: &str = "horizon_table::binding";
    /// Row lifecycle target.
    pub const ROW: &str = "horizon_table::row";
    /// Section and dynamic collection target.
    pub const SECTION: &str = "horizon_table::section";
    /// Data controller target.
    pub const CONTROLLER: &str = "horizon_table::controller";
    /// Widget update pass target.
    pub const UPDATES: &str = "horizon_table::updates";
}

/// Span names used for `tracing` spans around multi-step operations.
pub mod span_names {
    /// Flushing a batch of structural deltas to the widget.
    pub const UPDATE_FLUSH: &str = "horizon_table::update_flush";
    /// Configuring a cell for a row.
    pub const CELL_CONFIGURE: &str = "horizon_table::cell_configure";
    /// Measuring a row height.
    pub const HEIGHT: &str = "horizon_table::height";
}
