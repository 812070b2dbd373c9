//! Render-sync engine: turns assignments, source buffers and signal settings
//! into per-slot drawables and axis limits.
//!
//! The engine keeps one [`SlotRender`] cache per (tab, slot). In live mode a
//! slot that already shows data is patched: drawables are matched by display
//! label, keep their id and only get new points. Every other refresh clears
//! the slot and rebuilds it.
//!
//! Nothing is borrowed across refreshes; every pass re-reads the buffers
//! through [`RenderInputs`].

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::data::assignment::{AssignmentModel, SignalRef};
use crate::data::axis::{self, AxisLimits, DataBox};
use crate::data::ingest::IngestEngine;
use crate::data::labels;
use crate::data::signals::SignalRegistry;
use crate::data::xaxis::{self, Series};
use crate::error::SignalError;

/// Expands a slot's assigned list with linked companion signals.
pub type LinkFn = Box<dyn Fn(&[SignalRef]) -> Vec<SignalRef>>;
/// Returns the series of a derived signal, or an empty series if unknown.
pub type DerivedFn = Box<dyn Fn(&str) -> Series>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    /// Continuous line through every sample.
    Line,
    /// One vertical marker per value change.
    StateMarkers,
}

/// One drawn object of a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    /// Stable across live patches of the same label.
    pub id: u64,
    pub label: String,
    pub signal: SignalRef,
    pub kind: DrawKind,
    /// `[x, y]` pairs. For state markers, one pair per change.
    pub points: Vec<[f64; 2]>,
}

/// Cached render state of one slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotRender {
    pub drawables: Vec<Drawable>,
    pub limits: Option<AxisLimits>,
    /// At least one drawable with points was produced.
    pub has_data: bool,
    /// `limits` were fitted to real data rather than the neutral placeholder.
    pub fitted: bool,
    /// Signal used as the horizontal axis instead of time.
    pub x_override: Option<SignalRef>,
}

impl SlotRender {
    pub fn drawable(&self, label: &str) -> Option<&Drawable> {
        self.drawables.iter().find(|d| d.label == label)
    }

    /// Display label resolved for `signal`, if it was drawn.
    pub fn label_for(&self, signal: &SignalRef) -> Option<&str> {
        self.drawables
            .iter()
            .find(|d| &d.signal == signal)
            .map(|d| d.label.as_str())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.drawables.iter().map(|d| d.label.as_str()).collect()
    }
}

/// Read-only views handed to one refresh pass.
#[derive(Clone, Copy)]
pub struct RenderInputs<'a> {
    pub ingest: &'a IngestEngine,
    pub signals: &'a SignalRegistry,
    pub assignments: &'a AssignmentModel,
}

/// A signal that could not be resolved during a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFailure {
    pub tab: usize,
    pub slot: usize,
    pub signal: SignalRef,
    pub error: SignalError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub redrawn: usize,
    pub patched: usize,
    pub failures: Vec<RenderFailure>,
}

pub struct RenderSync {
    slots: BTreeMap<(usize, usize), SlotRender>,
    config: RenderConfig,
    live: bool,
    next_id: u64,
    linker: Option<LinkFn>,
    derived: Option<DerivedFn>,
}

impl std::fmt::Debug for RenderSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSync")
            .field("slots", &self.slots.len())
            .field("live", &self.live)
            .field("linker", &self.linker.is_some())
            .field("derived", &self.derived.is_some())
            .finish()
    }
}

impl RenderSync {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            slots: BTreeMap::new(),
            config,
            live: false,
            next_id: 0,
            linker: None,
            derived: None,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    pub fn set_linker(&mut self, linker: Option<LinkFn>) {
        self.linker = linker;
    }

    pub fn set_derived_accessor(&mut self, accessor: Option<DerivedFn>) {
        self.derived = accessor;
    }

    pub fn slot(&self, tab: usize, slot: usize) -> Option<&SlotRender> {
        self.slots.get(&(tab, slot))
    }

    pub fn set_x_override(&mut self, tab: usize, slot: usize, signal: Option<SignalRef>) {
        self.slots.entry((tab, slot)).or_default().x_override = signal;
    }

    pub fn x_override(&self, tab: usize, slot: usize) -> Option<&SignalRef> {
        self.slots.get(&(tab, slot))?.x_override.as_ref()
    }

    /// Drop every cached slot, including overrides.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    /// Refresh every slot of every listed tab.
    pub fn refresh(&mut self, inputs: RenderInputs<'_>, tabs: &[usize]) -> RenderReport {
        let global: Vec<SignalRef> = inputs.assignments.all_refs().cloned().collect();
        let mut report = RenderReport::default();
        for &tab in tabs {
            let count = inputs.assignments.slot_count(tab);
            self.slots.retain(|&(t, s), _| t != tab || s < count);
            for slot in 0..count {
                self.refresh_slot(inputs, &global, tab, slot, &mut report);
            }
        }
        report
    }

    /// Refresh every tab of the assignment model.
    pub fn refresh_all(&mut self, inputs: RenderInputs<'_>) -> RenderReport {
        let tabs: Vec<usize> = (0..inputs.assignments.tab_count()).collect();
        self.refresh(inputs, &tabs)
    }

    fn refresh_slot(
        &mut self,
        inputs: RenderInputs<'_>,
        global: &[SignalRef],
        tab: usize,
        slot: usize,
        report: &mut RenderReport,
    ) {
        let Ok(assigned) = inputs.assignments.slot(tab, slot) else {
            return;
        };
        let expanded = match &self.linker {
            Some(link) => link(assigned),
            None => assigned.to_vec(),
        };
        let resolved_labels = labels::disambiguate(&expanded, global, |i| {
            usize::try_from(i)
                .ok()
                .and_then(|i| inputs.ingest.source_label(i))
                .unwrap_or_else(|| format!("#{}", i))
        });

        let state = self.slots.entry((tab, slot)).or_default();
        let patch = self.live && state.has_data;
        let x_override = state.x_override.clone();
        let override_series = x_override
            .as_ref()
            .map(|r| resolve_series(inputs, self.derived.as_ref(), r));

        let mut fresh: Vec<(String, SignalRef, DrawKind, Vec<[f64; 2]>)> = Vec::new();
        for (signal, label) in expanded.into_iter().zip(resolved_labels) {
            let series = match resolve_series(inputs, self.derived.as_ref(), &signal) {
                Ok(s) => s,
                Err(error) => {
                    warn!(tab, slot, signal = %signal, error = %error, "signal skipped");
                    report.failures.push(RenderFailure {
                        tab,
                        slot,
                        signal,
                        error,
                    });
                    continue;
                }
            };

            if inputs.signals.state(&signal.name) {
                let points = state_changes(&series, self.config.state_change_tolerance);
                fresh.push((label, signal, DrawKind::StateMarkers, points));
                continue;
            }

            let points = match &override_series {
                None => series.points(),
                Some(Ok(x)) => match xaxis::align(&series, x) {
                    Ok(p) => p,
                    Err(error) => {
                        warn!(tab, slot, signal = %signal, error = %error, "x override failed, using time axis");
                        report.failures.push(RenderFailure {
                            tab,
                            slot,
                            signal: signal.clone(),
                            error,
                        });
                        series.points()
                    }
                },
                Some(Err(error)) => {
                    warn!(tab, slot, signal = %signal, error = %error, "x override unavailable, using time axis");
                    report.failures.push(RenderFailure {
                        tab,
                        slot,
                        signal: signal.clone(),
                        error: error.clone(),
                    });
                    series.points()
                }
            };
            fresh.push((label, signal, DrawKind::Line, points));
        }

        let mut existing: HashMap<String, u64> = if patch {
            state
                .drawables
                .iter()
                .map(|d| (d.label.clone(), d.id))
                .collect()
        } else {
            HashMap::new()
        };

        let mut drawables = Vec::with_capacity(fresh.len());
        let mut data = DataBox::default();
        for (label, signal, kind, points) in fresh {
            for p in &points {
                data.include_point(*p);
            }
            let id = match existing.remove(&label) {
                Some(id) => id,
                None => {
                    self.next_id += 1;
                    self.next_id
                }
            };
            drawables.push(Drawable {
                id,
                label,
                signal,
                kind,
                points,
            });
        }
        if patch {
            if !existing.is_empty() {
                debug!(tab, slot, removed = existing.len(), "stale drawables removed");
            }
            report.patched += 1;
        } else {
            report.redrawn += 1;
        }

        let neutral = self.config.neutral_limits;
        let shown = state.limits.filter(|_| state.fitted);
        state.limits = Some(if self.live {
            axis::grow(
                shown,
                &data,
                self.config.live_x_padding,
                self.config.live_y_padding,
                neutral,
            )
        } else {
            axis::autofit(&data, neutral)
        });
        state.fitted = !data.is_empty() || (self.live && shown.is_some());
        state.has_data = drawables.iter().any(|d| !d.points.is_empty());
        state.drawables = drawables;
    }
}

/// Scaled, finite samples of one signal.
fn resolve_series(
    inputs: RenderInputs<'_>,
    derived: Option<&DerivedFn>,
    signal: &SignalRef,
) -> Result<Series, SignalError> {
    let raw = if signal.is_derived() {
        let s = derived.map(|f| f(&signal.name)).unwrap_or_default();
        Series::from_pairs(&s.time, &s.values)
    } else {
        let table = signal
            .source_index()
            .and_then(|i| inputs.ingest.table(i))
            .ok_or(SignalError::UnknownSource(signal.source))?;
        let column = table
            .column(&signal.name)
            .ok_or_else(|| SignalError::UnknownSignal {
                index: signal.source,
                name: signal.name.clone(),
            })?;
        Series::from_pairs(table.time(), column)
    };
    Ok(raw.scaled(inputs.signals.scale(&signal.name)))
}

/// Positions where the value moves by more than `tolerance` from the
/// previous sample. The first sample is not a change.
pub fn state_changes(series: &Series, tolerance: f64) -> Vec<[f64; 2]> {
    series
        .time
        .windows(2)
        .zip(series.values.windows(2))
        .filter(|(_, v)| (v[1] - v[0]).abs() > tolerance)
        .map(|(t, v)| [t[1], v[1]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_changes_ignore_jitter() {
        let s = Series::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1e-12, 1.0, 1.0]);
        assert_eq!(state_changes(&s, 1e-9), vec![[2.0, 1.0]]);
    }
}
