//! Session: the single owner that wires ingest, signal settings,
//! assignments, rendering and scheduling together.
//!
//! All mutation goes through `&mut Session` on one thread, so the
//! components need no locking. The viewer calls [`Session::tick`] every
//! frame and [`Session::refresh_all`] when something changed.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::TailPlotConfig;
use crate::data::assignment::AssignmentModel;
use crate::data::ingest::{IngestEngine, PollOutcome};
use crate::data::render::{RenderInputs, RenderReport, RenderSync};
use crate::data::signals::SignalRegistry;
use crate::events::SourceEvent;
use crate::scheduler::PollScheduler;

#[derive(Debug)]
pub struct Session {
    config: TailPlotConfig,
    ingest: IngestEngine,
    signals: SignalRegistry,
    assignments: AssignmentModel,
    render: RenderSync,
    scheduler: PollScheduler,
    live: bool,
}

impl Session {
    pub fn new(config: TailPlotConfig) -> Self {
        let config = config.sanitize();
        let mut render = RenderSync::new(config.render.clone());
        render.set_live(config.live);
        Self {
            ingest: IngestEngine::new(config.ingest.clone()),
            signals: SignalRegistry::default(),
            assignments: AssignmentModel::new(config.layout.tabs, config.layout.slots_per_tab),
            render,
            scheduler: PollScheduler::new(config.ingest.poll_interval()),
            live: config.live,
            config,
        }
    }

    pub fn config(&self) -> &TailPlotConfig {
        &self.config
    }

    pub fn ingest(&self) -> &IngestEngine {
        &self.ingest
    }

    pub fn signals(&self) -> &SignalRegistry {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut SignalRegistry {
        &mut self.signals
    }

    pub fn assignments(&self) -> &AssignmentModel {
        &self.assignments
    }

    pub fn assignments_mut(&mut self) -> &mut AssignmentModel {
        &mut self.assignments
    }

    pub fn render(&self) -> &RenderSync {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut RenderSync {
        &mut self.render
    }

    pub fn subscribe(&mut self) -> Receiver<SourceEvent> {
        self.ingest.subscribe()
    }

    pub fn signal_names(&self) -> &BTreeSet<String> {
        self.ingest.signal_names()
    }

    // ── Sources ─────────────────────────────────────────────────────────────

    /// Register a source. In static mode it is read immediately.
    pub fn add_source(&mut self, path: impl Into<PathBuf>, now: Instant) -> usize {
        let index = self.ingest.add_source(path);
        self.scheduler.add(now);
        if !self.live {
            self.ingest.load(index, now);
            self.reconcile();
        }
        index
    }

    pub fn clear_sources(&mut self) {
        self.ingest.clear_sources();
        self.scheduler.clear();
        self.assignments.drop_sources_from(0);
        // Older grids may name indices that new sources will reuse.
        self.assignments.clear_history();
        self.render.reset();
        self.reconcile();
    }

    pub fn stop(&mut self, index: usize) {
        self.ingest.stop(index);
        self.scheduler.cancel(index);
    }

    pub fn restart(&mut self, index: usize, now: Instant) {
        self.ingest.restart(index, now);
        self.scheduler.resume(index, now);
    }

    pub fn register_derived(&mut self, name: impl Into<String>) {
        self.ingest.register_derived(name);
        self.reconcile();
    }

    pub fn unregister_derived(&mut self, name: &str) {
        self.ingest.unregister_derived(name);
        self.reconcile();
    }

    // ── Mode ────────────────────────────────────────────────────────────────

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Switch between live polling and a one-shot static load.
    pub fn set_live(&mut self, live: bool, now: Instant) {
        if live == self.live {
            return;
        }
        self.live = live;
        self.render.set_live(live);
        info!(live, "mode changed");
        if live {
            self.ingest.rearm(now);
            self.sync_tickers(now);
        } else {
            self.ingest.load_all(now);
            self.reconcile();
        }
    }

    /// Align every ticker with its source: polling sources run, the rest stay cancelled.
    fn sync_tickers(&mut self, now: Instant) {
        for index in 0..self.ingest.source_count() {
            let polling = self
                .ingest
                .source(index)
                .is_some_and(|s| s.state().is_polling());
            if polling {
                self.scheduler.resume(index, now);
            } else {
                self.scheduler.cancel(index);
            }
        }
    }

    // ── Cycle ───────────────────────────────────────────────────────────────

    /// Run every due poll cycle. Returns `true` if any buffer grew.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.live {
            return false;
        }
        let ingest = &mut self.ingest;
        let mut outcomes: Vec<(usize, PollOutcome)> = Vec::new();
        self.scheduler.run_due(now, |index| {
            outcomes.push((index, ingest.poll(index, now)));
        });

        let mut grew = false;
        for (index, outcome) in outcomes {
            grew |= outcome.changed_data();
            let terminal = self
                .ingest
                .source(index)
                .map_or(true, |s| !s.state().is_polling());
            if terminal {
                debug!(source = index, ?outcome, "polling ceased");
                self.scheduler.cancel(index);
            }
        }
        if grew {
            self.reconcile();
        }
        grew
    }

    /// Shortest wait until the next poll is due, for repaint scheduling.
    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        if self.live {
            self.scheduler.next_wake(now)
        } else {
            None
        }
    }

    /// Bring the signal registry in line with the current name set.
    pub fn reconcile(&mut self) {
        self.signals.reconcile(self.ingest.signal_names());
    }

    // ── Render ──────────────────────────────────────────────────────────────

    pub fn refresh(&mut self, tabs: &[usize]) -> RenderReport {
        let inputs = RenderInputs {
            ingest: &self.ingest,
            signals: &self.signals,
            assignments: &self.assignments,
        };
        self.render.refresh(inputs, tabs)
    }

    pub fn refresh_all(&mut self) -> RenderReport {
        let tabs: Vec<usize> = (0..self.assignments.tab_count()).collect();
        self.refresh(&tabs)
    }
}
