//! Core data model: delimited ingestion, per-source buffers, signal
//! settings, assignments and the render-sync engine.

pub mod assignment;
pub mod axis;
pub mod delimited;
pub mod ingest;
pub mod labels;
pub mod render;
pub mod signals;
pub mod source;
pub mod table;
pub mod xaxis;
