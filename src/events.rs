//! Source notifications published by the ingest engine.
//!
//! The UI subscribes with [`EventHub::subscribe`] and drains the returned
//! receiver once per frame. Receivers that were dropped are pruned on the
//! next emit.

use std::sync::mpsc::{Receiver, Sender};

use chrono::{DateTime, Local};

/// What happened to a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEventKind {
    /// First successful read.
    Loaded { rows: usize },
    /// Rows were appended to the buffer.
    Updated { new_rows: usize, rows: usize },
    /// Header/data column counts disagree; polling stopped.
    FormatMismatch(String),
    /// The time-keyed join failed and rows were appended as-is.
    MergeDegraded(String),
    /// No change within the stall timeout; polling stopped.
    TimedOut,
    Stopped,
    Restarted,
}

impl SourceEventKind {
    /// Events the user should see as a warning rather than plain status.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            SourceEventKind::FormatMismatch(_)
                | SourceEventKind::MergeDegraded(_)
                | SourceEventKind::TimedOut
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub source: usize,
    pub kind: SourceEventKind,
    pub at: DateTime<Local>,
}

impl SourceEvent {
    pub fn new(source: usize, kind: SourceEventKind) -> Self {
        Self {
            source,
            kind,
            at: Local::now(),
        }
    }

    /// One-line status text, e.g. `"12:01:02 [run1] timed out"`.
    pub fn describe(&self, label: &str) -> String {
        let what = match &self.kind {
            SourceEventKind::Loaded { rows } => format!("loaded {} rows", rows),
            SourceEventKind::Updated { new_rows, rows } => {
                format!("+{} rows ({} total)", new_rows, rows)
            }
            SourceEventKind::FormatMismatch(msg) => format!("format error: {}", msg),
            SourceEventKind::MergeDegraded(msg) => format!("merge degraded: {}", msg),
            SourceEventKind::TimedOut => "timed out".to_string(),
            SourceEventKind::Stopped => "stopped".to_string(),
            SourceEventKind::Restarted => "restarted".to_string(),
        };
        format!("{} [{}] {}", self.at.format("%H:%M:%S"), label, what)
    }
}

/// Fan-out of [`SourceEvent`]s to any number of receivers.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<Sender<SourceEvent>>,
}

impl EventHub {
    pub fn subscribe(&mut self) -> Receiver<SourceEvent> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: SourceEvent) {
        self.subscribers
            .retain(|sub| sub.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
