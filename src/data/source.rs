//! Source registry: one entry per monitored delimited file.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use crate::data::table::SignalTable;

/// Lifecycle of one source.
///
/// `Uninitialized → Monitoring ⇄ Updated`, `Monitoring → TimedOut` on stall,
/// `Any → Stopped` on user stop, `Any → Rejected` on a format mismatch.
/// The last three are terminal until [`Source::restart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    Uninitialized,
    Monitoring,
    Updated,
    TimedOut,
    Stopped,
    Rejected,
}

impl SourceState {
    /// Whether poll cycles should still run for this state.
    pub fn is_polling(self) -> bool {
        matches!(
            self,
            SourceState::Uninitialized | SourceState::Monitoring | SourceState::Updated
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceState::Uninitialized => "waiting",
            SourceState::Monitoring => "monitoring",
            SourceState::Updated => "updated",
            SourceState::TimedOut => "timed out",
            SourceState::Stopped => "stopped",
            SourceState::Rejected => "format error",
        }
    }
}

/// What a poll compares to decide whether a file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// One delimited data source and its buffer.
#[derive(Debug, Clone)]
pub struct Source {
    pub index: usize,
    pub(crate) path: PathBuf,
    pub(crate) stamp: Option<FileStamp>,
    pub(crate) rows: usize,
    pub(crate) last_update: Option<Instant>,
    pub(crate) quiet_for: Duration,
    pub(crate) rate: f64,
    pub(crate) state: SourceState,
    pub(crate) table: SignalTable,
}

impl Source {
    pub fn new(index: usize, path: PathBuf) -> Self {
        Self {
            index,
            path,
            stamp: None,
            rows: 0,
            last_update: None,
            quiet_for: Duration::ZERO,
            rate: 0.0,
            state: SourceState::Uninitialized,
            table: SignalTable::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows recorded at the last successful read.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Time since the last observed change, as of the last poll.
    pub fn quiet_for(&self) -> Duration {
        self.quiet_for
    }

    pub fn table(&self) -> &SignalTable {
        &self.table
    }

    /// File stem, falling back to the full path.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Leave a terminal state and restart the stall clock. The buffer is kept.
    pub fn restart(&mut self, now: Instant) {
        self.state = if self.rows == 0 {
            SourceState::Uninitialized
        } else {
            SourceState::Monitoring
        };
        self.last_update = Some(now);
        self.quiet_for = Duration::ZERO;
        // Force a re-read on the next cycle.
        self.stamp = None;
    }
}

/// Snapshot of one source for status display.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub index: usize,
    pub path: PathBuf,
    pub state: SourceState,
    pub rows: usize,
    pub rate: f64,
}

impl From<&Source> for SourceStatus {
    fn from(s: &Source) -> Self {
        Self {
            index: s.index,
            path: s.path.clone(),
            state: s.state,
            rows: s.rows,
            rate: s.rate,
        }
    }
}

/// Ordered collection of sources, addressed by stable index.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn add(&mut self, path: PathBuf) -> usize {
        let index = self.sources.len();
        self.sources.push(Source::new(index, path));
        index
    }

    pub fn get(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Source> {
        self.sources.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Source> {
        self.sources.iter_mut()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    /// Human-readable label for `index`: the file stem, or `stem#index`
    /// when another source shares the same stem.
    pub fn label(&self, index: usize) -> Option<String> {
        let src = self.sources.get(index)?;
        let stem = src.stem();
        let shared = self
            .sources
            .iter()
            .any(|o| o.index != index && o.stem() == stem);
        Some(if shared {
            format!("{}#{}", stem, index)
        } else {
            stem
        })
    }
}
