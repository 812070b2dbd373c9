//! Ingest engine: per-source poll cycles, incremental merge and the global
//! signal-name set.
//!
//! Every poll is isolated to its own source. Nothing here returns an error to
//! the caller; failures turn into a [`PollOutcome`], a log line and, where the
//! user should know, a [`SourceEvent`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::data::delimited;
use crate::data::source::{FileStamp, Source, SourceRegistry, SourceState, SourceStatus};
use crate::data::table::SignalTable;
use crate::error::IngestError;
use crate::events::{EventHub, SourceEvent, SourceEventKind};

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Source is stopped, timed out, rejected or unknown.
    Skipped,
    /// File missing, empty or unreadable; retried next cycle.
    Unavailable,
    /// Modification time unchanged.
    Unchanged,
    /// Stall timeout reached during this cycle.
    TimedOut,
    /// Re-read, but no new rows.
    NoGrowth,
    /// New rows were merged into the buffer.
    Grew { new_rows: usize },
    /// Shape validation failed.
    Rejected,
}

impl PollOutcome {
    pub fn changed_data(self) -> bool {
        matches!(self, PollOutcome::Grew { .. })
    }
}

/// How new rows were folded into a buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeKind {
    /// Identical column sets: concatenate and re-sort.
    Concatenated,
    /// Different column sets: full outer join on time.
    Joined,
    /// Join failed; rows were appended without alignment.
    Degraded(String),
}

/// Fold `new_rows` into `buffer` and keep it sorted by time.
///
/// A failed join falls back to plain concatenation so ingestion never halts;
/// the caller is told through [`MergeKind::Degraded`].
pub fn merge_rows(buffer: &mut SignalTable, new_rows: &SignalTable) -> MergeKind {
    if buffer.is_empty() && buffer.column_names().is_empty() {
        *buffer = new_rows.clone();
        buffer.sort_by_time();
        return MergeKind::Concatenated;
    }
    if buffer.same_columns(new_rows) {
        buffer.append(new_rows);
        buffer.sort_by_time();
        return MergeKind::Concatenated;
    }
    match buffer.outer_join(new_rows) {
        Ok(joined) => {
            *buffer = joined;
            MergeKind::Joined
        }
        Err(e) => {
            buffer.append(new_rows);
            buffer.sort_by_time();
            MergeKind::Degraded(e.to_string())
        }
    }
}

/// Owner of every source, its buffer and the derived name set.
#[derive(Debug)]
pub struct IngestEngine {
    config: IngestConfig,
    sources: SourceRegistry,
    derived: BTreeSet<String>,
    names: BTreeSet<String>,
    events: EventHub,
}

impl IngestEngine {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config: config.sanitize(),
            sources: SourceRegistry::default(),
            derived: BTreeSet::new(),
            names: BTreeSet::new(),
            events: EventHub::default(),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn subscribe(&mut self) -> Receiver<SourceEvent> {
        self.events.subscribe()
    }

    // ── Source management ───────────────────────────────────────────────────

    pub fn add_source(&mut self, path: impl Into<PathBuf>) -> usize {
        let path = path.into();
        let index = self.sources.add(path.clone());
        info!(source = index, path = %path.display(), "source registered");
        index
    }

    /// Remove all sources and their buffers.
    pub fn clear_sources(&mut self) {
        self.sources.clear();
        self.recompute_names();
        info!("all sources cleared");
    }

    pub fn source(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn table(&self, index: usize) -> Option<&SignalTable> {
        self.sources.get(index).map(Source::table)
    }

    pub fn source_label(&self, index: usize) -> Option<String> {
        self.sources.label(index)
    }

    pub fn status(&self) -> Vec<SourceStatus> {
        self.sources.iter().map(SourceStatus::from).collect()
    }

    /// Stop polling `index`. Idempotent; an in-flight cycle sees the flag at its next checkpoint.
    pub fn stop(&mut self, index: usize) {
        let Some(src) = self.sources.get_mut(index) else {
            return;
        };
        if src.state == SourceState::Stopped {
            return;
        }
        src.state = SourceState::Stopped;
        info!(source = index, "source stopped");
        self.events
            .emit(SourceEvent::new(index, SourceEventKind::Stopped));
    }

    /// Resume a stopped, timed-out or rejected source.
    pub fn restart(&mut self, index: usize, now: Instant) {
        let Some(src) = self.sources.get_mut(index) else {
            return;
        };
        src.restart(now);
        info!(source = index, "source restarted");
        self.events
            .emit(SourceEvent::new(index, SourceEventKind::Restarted));
    }

    /// Restart the stall clock of every source that is still polling.
    ///
    /// Used when live polling begins, so time spent in static mode does not
    /// count as a stall.
    pub fn rearm(&mut self, now: Instant) {
        for src in self.sources.iter_mut().filter(|s| s.state.is_polling()) {
            src.last_update = Some(now);
            src.quiet_for = std::time::Duration::ZERO;
        }
    }

    // ── Derived signals ─────────────────────────────────────────────────────

    /// Add an externally computed signal name (source index `-1`).
    pub fn register_derived(&mut self, name: impl Into<String>) {
        self.derived.insert(name.into());
        self.recompute_names();
    }

    pub fn unregister_derived(&mut self, name: &str) {
        self.derived.remove(name);
        self.recompute_names();
    }

    // ── Name set ────────────────────────────────────────────────────────────

    /// Union of every source's non-time columns plus derived names.
    pub fn signal_names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Rebuild the name set from the current buffers. Never incremental.
    fn recompute_names(&mut self) {
        let mut names: BTreeSet<String> = self.derived.clone();
        for src in self.sources.iter() {
            names.extend(src.table.column_names().iter().cloned());
        }
        self.names = names;
    }

    // ── Poll cycle ──────────────────────────────────────────────────────────

    /// Run one live poll cycle for `index`.
    pub fn poll(&mut self, index: usize, now: Instant) -> PollOutcome {
        let timeout = self.config.stall_timeout();
        let Some(src) = self.sources.get_mut(index) else {
            return PollOutcome::Skipped;
        };
        if !src.state.is_polling() {
            return PollOutcome::Skipped;
        }

        let stamp = match probe(src) {
            Ok(m) => m,
            Err(e) => {
                debug!(source = index, error = %e, "poll skipped");
                return PollOutcome::Unavailable;
            }
        };

        if src.rows > 0 && Some(stamp) == src.stamp {
            let since = now.saturating_duration_since(src.last_update.unwrap_or(now));
            src.quiet_for = since;
            if since > timeout {
                src.state = SourceState::TimedOut;
                info!(source = index, quiet_secs = since.as_secs_f64(), "source timed out");
                self.events
                    .emit(SourceEvent::new(index, SourceEventKind::TimedOut));
                return PollOutcome::TimedOut;
            }
            if src.state == SourceState::Updated {
                src.state = SourceState::Monitoring;
            }
            return PollOutcome::Unchanged;
        }

        self.read_and_merge(index, stamp, now)
    }

    /// One-shot read of every source, used when live mode is off.
    pub fn load_all(&mut self, now: Instant) -> Vec<PollOutcome> {
        (0..self.sources.len())
            .map(|i| self.load(i, now))
            .collect()
    }

    /// One-shot read of `index`, ignoring the stall timer.
    pub fn load(&mut self, index: usize, now: Instant) -> PollOutcome {
        let Some(src) = self.sources.get_mut(index) else {
            return PollOutcome::Skipped;
        };
        if src.state == SourceState::Stopped {
            return PollOutcome::Skipped;
        }
        match probe(src) {
            Ok(stamp) => self.read_and_merge(index, stamp, now),
            Err(e) => {
                debug!(source = index, error = %e, "load skipped");
                PollOutcome::Unavailable
            }
        }
    }

    fn read_and_merge(
        &mut self,
        index: usize,
        stamp: FileStamp,
        now: Instant,
    ) -> PollOutcome {
        let Some(src) = self.sources.get_mut(index) else {
            return PollOutcome::Skipped;
        };
        if src.state == SourceState::Uninitialized {
            src.state = SourceState::Monitoring;
        }

        let parsed = match delimited::read_table(&src.path, &self.config) {
            Ok(t) => t,
            Err(e @ IngestError::FormatMismatch { .. }) => {
                warn!(source = index, error = %e, "rejecting read");
                src.state = SourceState::Rejected;
                self.events.emit(SourceEvent::new(
                    index,
                    SourceEventKind::FormatMismatch(e.to_string()),
                ));
                return PollOutcome::Rejected;
            }
            Err(e) => {
                debug!(source = index, error = %e, recoverable = e.is_recoverable(), "read failed");
                return PollOutcome::Unavailable;
            }
        };

        let outcome = absorb(src, parsed, now);
        src.stamp = Some(stamp);

        match outcome {
            Absorbed::NoGrowth => PollOutcome::NoGrowth,
            Absorbed::Grew { new_rows, merge } => {
                let rows = src.rows;
                let kind = if rows == new_rows {
                    SourceEventKind::Loaded { rows }
                } else {
                    SourceEventKind::Updated { new_rows, rows }
                };
                debug!(source = index, new_rows, rows, "rows merged");
                if let MergeKind::Degraded(msg) = &merge {
                    warn!(
                        source = index,
                        error = %msg,
                        "time-keyed merge failed, rows appended unaligned; buffer may hold duplicate or misaligned rows"
                    );
                    self.events.emit(SourceEvent::new(
                        index,
                        SourceEventKind::MergeDegraded(msg.clone()),
                    ));
                }
                self.events.emit(SourceEvent::new(index, kind));
                self.recompute_names();
                PollOutcome::Grew { new_rows }
            }
        }
    }
}

enum Absorbed {
    NoGrowth,
    Grew { new_rows: usize, merge: MergeKind },
}

/// Check that the file exists, is a regular file and is non-empty; return its stamp.
fn probe(src: &Source) -> Result<FileStamp, IngestError> {
    let meta = std::fs::metadata(&src.path).map_err(|e| IngestError::SourceUnavailable {
        path: src.path.clone(),
        reason: e.to_string(),
    })?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(IngestError::SourceUnavailable {
            path: src.path.clone(),
            reason: "not a non-empty regular file".to_string(),
        });
    }
    Ok(FileStamp {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

/// Slice the rows beyond the recorded count and merge them into the buffer.
fn absorb(src: &mut Source, mut parsed: SignalTable, now: Instant) -> Absorbed {
    parsed.sort_by_time();
    let prior = src.rows;
    let total = parsed.len();
    if total <= prior {
        if total < prior {
            debug!(source = src.index, prior, total, "source shrank, ignoring");
        }
        return Absorbed::NoGrowth;
    }
    let new_rows = total - prior;
    let merge = if prior == 0 {
        src.table = parsed;
        MergeKind::Concatenated
    } else {
        let tail = parsed.slice_from(prior);
        merge_rows(&mut src.table, &tail)
    };
    src.rows = total;
    src.rate = src.table.rate();
    src.last_update = Some(now);
    src.quiet_for = std::time::Duration::ZERO;
    src.state = SourceState::Updated;
    Absorbed::Grew { new_rows, merge }
}
