//! Cooperative per-source scheduling.
//!
//! There are no timer threads. The frame loop calls
//! [`PollScheduler::run_due`] with the current instant; every source whose
//! [`Ticker`] is due runs one cycle to completion. A ticker that is still
//! marked in flight refuses to start again, so a cycle never overlaps itself.
//! Ticks missed while busy are skipped rather than queued.

use std::time::{Duration, Instant};

/// Periodic schedule of one task.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Instant,
    in_flight: bool,
    cancelled: bool,
}

impl Ticker {
    /// First tick is due immediately.
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: now,
            in_flight: false,
            cancelled: false,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_due(&self, now: Instant) -> bool {
        !self.cancelled && !self.in_flight && now >= self.next_due
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Enter a cycle. Returns `false` if not due, cancelled or already running.
    pub fn begin(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.in_flight = true;
        // Skip any ticks that elapsed while we were late.
        while self.next_due <= now {
            self.next_due += self.period;
        }
        true
    }

    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    /// Idempotent. An in-flight cycle still finishes.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn resume(&mut self, now: Instant) {
        self.cancelled = false;
        self.next_due = now;
    }

    /// Time until the next tick, zero when due.
    pub fn until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

/// One ticker per source, indexed like the source registry.
#[derive(Debug, Clone, Default)]
pub struct PollScheduler {
    tickers: Vec<Ticker>,
    period: Duration,
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            tickers: Vec::new(),
            period,
        }
    }

    /// Add a ticker for the next source index.
    pub fn add(&mut self, now: Instant) -> usize {
        self.tickers.push(Ticker::new(self.period, now));
        self.tickers.len() - 1
    }

    pub fn clear(&mut self) {
        self.tickers.clear();
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn ticker(&self, index: usize) -> Option<&Ticker> {
        self.tickers.get(index)
    }

    pub fn cancel(&mut self, index: usize) {
        if let Some(t) = self.tickers.get_mut(index) {
            t.cancel();
        }
    }

    pub fn resume(&mut self, index: usize, now: Instant) {
        if let Some(t) = self.tickers.get_mut(index) {
            t.resume(now);
        }
    }

    /// Number of tickers that have not been cancelled.
    pub fn active(&self) -> usize {
        self.tickers.iter().filter(|t| !t.is_cancelled()).count()
    }

    /// Run `task` once for every due ticker. Returns how many ran.
    pub fn run_due<F>(&mut self, now: Instant, mut task: F) -> usize
    where
        F: FnMut(usize),
    {
        let mut ran = 0;
        for (index, ticker) in self.tickers.iter_mut().enumerate() {
            if ticker.begin(now) {
                task(index);
                ticker.finish();
                ran += 1;
            }
        }
        ran
    }

    /// Shortest wait until any active ticker is due.
    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        self.tickers
            .iter()
            .filter(|t| !t.is_cancelled())
            .map(|t| t.until_due(now))
            .min()
    }
}
