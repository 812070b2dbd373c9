//! TailPlot crate root: re-exports and module wiring.
//!
//! TailPlot monitors delimited text files that grow over time, merges new
//! rows into per-source signal tables and keeps a grid of plots in sync:
//! - `data::ingest`: poll cycles, shape validation, incremental merge
//! - `data::signals`: per-name scale and state flags
//! - `data::assignment`: which signals go into which (tab, slot)
//! - `data::render`: drawables, display labels and axis limits per slot
//! - `session`: wires the above to a cooperative per-source scheduler
//! - `app`: the eframe viewer

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod logging;
pub mod scheduler;
pub mod session;

// Public re-exports for a compact external API
pub use app::{run_tailplot, TailPlotApp};
pub use config::{IngestConfig, LayoutConfig, RenderConfig, TailPlotConfig};
pub use data::assignment::{AssignmentModel, SignalRef, DERIVED_SOURCE};
pub use data::axis::AxisLimits;
pub use data::ingest::{IngestEngine, PollOutcome};
pub use data::render::{DrawKind, Drawable, RenderReport, RenderSync, SlotRender};
pub use data::signals::SignalRegistry;
pub use data::source::{SourceState, SourceStatus};
pub use data::table::SignalTable;
pub use data::xaxis::Series;
pub use error::{AssignmentError, ConfigError, IngestError, MergeError, SignalError};
pub use events::{SourceEvent, SourceEventKind};
pub use session::Session;
