//! Assignment model: a grid of (tab, slot) cells, each holding an ordered,
//! duplicate-free list of signal references.
//!
//! Every cell that was ever created keeps an entry (possibly empty); only
//! [`AssignmentModel::resize`] and [`AssignmentModel::set_layout`] change
//! the slot count of a tab.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AssignmentError;

/// Source index reserved for externally supplied derived signals.
pub const DERIVED_SOURCE: i32 = -1;

/// Identity of one signal: source index plus base (column) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalRef {
    pub source: i32,
    pub name: String,
}

impl SignalRef {
    pub fn new(source: i32, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
        }
    }

    pub fn derived(name: impl Into<String>) -> Self {
        Self::new(DERIVED_SOURCE, name)
    }

    pub fn is_derived(&self) -> bool {
        self.source == DERIVED_SOURCE
    }

    /// Index into the source registry, `None` for derived signals.
    pub fn source_index(&self) -> Option<usize> {
        usize::try_from(self.source).ok()
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.name)
    }
}

type Grid = Vec<Vec<Vec<SignalRef>>>;

/// Owned copy of the grid, used for undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSnapshot(Grid);

const UNDO_DEPTH: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct AssignmentModel {
    tabs: Grid,
    current: (usize, usize),
    undo: VecDeque<Grid>,
}

impl AssignmentModel {
    pub fn new(tabs: usize, slots_per_tab: usize) -> Self {
        let mut model = Self::default();
        model.set_layout(tabs, slots_per_tab);
        model
    }

    /// Establish a uniform layout, padding or truncating tabs and slots.
    pub fn set_layout(&mut self, tabs: usize, slots_per_tab: usize) {
        self.tabs.resize_with(tabs, Vec::new);
        for tab in 0..tabs {
            self.resize(tab, slots_per_tab);
        }
        self.clamp_current();
    }

    /// Change the slot count of `tab`, padding with empty lists or truncating.
    ///
    /// Creates the tab (and any tabs before it) if needed.
    pub fn resize(&mut self, tab: usize, slots: usize) {
        if tab >= self.tabs.len() {
            self.tabs.resize_with(tab + 1, Vec::new);
        }
        self.tabs[tab].resize_with(slots, Vec::new);
        self.clamp_current();
    }

    fn clamp_current(&mut self) {
        let (mut tab, mut slot) = self.current;
        if self.tabs.is_empty() {
            self.current = (0, 0);
            return;
        }
        tab = tab.min(self.tabs.len() - 1);
        slot = slot.min(self.tabs[tab].len().saturating_sub(1));
        self.current = (tab, slot);
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn slot_count(&self, tab: usize) -> usize {
        self.tabs.get(tab).map_or(0, Vec::len)
    }

    /// The externally tracked "current slot" pointer, always in range.
    pub fn current(&self) -> (usize, usize) {
        self.current
    }

    pub fn set_current(&mut self, tab: usize, slot: usize) {
        self.current = (tab, slot);
        self.clamp_current();
    }

    pub fn slot(&self, tab: usize, slot: usize) -> Result<&[SignalRef], AssignmentError> {
        self.tabs
            .get(tab)
            .and_then(|t| t.get(slot))
            .map(Vec::as_slice)
            .ok_or(AssignmentError::SlotOutOfRange { tab, slot })
    }

    /// All slots of `tab`; empty for an unknown tab.
    pub fn slots(&self, tab: usize) -> &[Vec<SignalRef>] {
        self.tabs.get(tab).map_or(&[], Vec::as_slice)
    }

    fn slot_mut(&mut self, tab: usize, slot: usize) -> Result<&mut Vec<SignalRef>, AssignmentError> {
        self.tabs
            .get_mut(tab)
            .and_then(|t| t.get_mut(slot))
            .ok_or(AssignmentError::SlotOutOfRange { tab, slot })
    }

    /// Replace the slot's list. Duplicates in `signals` keep their first occurrence.
    pub fn assign(
        &mut self,
        tab: usize,
        slot: usize,
        signals: Vec<SignalRef>,
    ) -> Result<(), AssignmentError> {
        self.slot(tab, slot)?;
        let mut deduped: Vec<SignalRef> = Vec::with_capacity(signals.len());
        for s in signals {
            if !deduped.contains(&s) {
                deduped.push(s);
            }
        }
        self.record();
        *self.slot_mut(tab, slot)? = deduped;
        Ok(())
    }

    /// Append `signal` unless already present. Returns whether it was added.
    pub fn add(&mut self, tab: usize, slot: usize, signal: SignalRef) -> Result<bool, AssignmentError> {
        if self.slot(tab, slot)?.contains(&signal) {
            return Ok(false);
        }
        self.record();
        self.slot_mut(tab, slot)?.push(signal);
        Ok(true)
    }

    /// Remove `signal` if present. Returns whether it was removed.
    pub fn remove(
        &mut self,
        tab: usize,
        slot: usize,
        signal: &SignalRef,
    ) -> Result<bool, AssignmentError> {
        if !self.slot(tab, slot)?.contains(signal) {
            return Ok(false);
        }
        self.record();
        self.slot_mut(tab, slot)?.retain(|s| s != signal);
        Ok(true)
    }

    pub fn clear_slot(&mut self, tab: usize, slot: usize) -> Result<(), AssignmentError> {
        if self.slot(tab, slot)?.is_empty() {
            return Ok(());
        }
        self.record();
        self.slot_mut(tab, slot)?.clear();
        Ok(())
    }

    /// Empty every cell, keeping the layout.
    pub fn clear_all(&mut self) {
        if self.all_refs().next().is_none() {
            return;
        }
        self.record();
        for tab in self.tabs.iter_mut() {
            for slot in tab.iter_mut() {
                slot.clear();
            }
        }
    }

    /// Remove every reference to source indices at or above `count`
    /// (used after sources are cleared).
    pub fn drop_sources_from(&mut self, count: usize) {
        for tab in self.tabs.iter_mut() {
            for slot in tab.iter_mut() {
                slot.retain(|s| s.source_index().map_or(true, |i| i < count));
            }
        }
    }

    /// Every reference in the model, in tab/slot order.
    pub fn all_refs(&self) -> impl Iterator<Item = &SignalRef> {
        self.tabs.iter().flatten().flatten()
    }

    // ── Undo ────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> AssignmentSnapshot {
        AssignmentSnapshot(self.tabs.clone())
    }

    pub fn restore(&mut self, snapshot: AssignmentSnapshot) {
        self.tabs = snapshot.0;
        self.clamp_current();
    }

    fn record(&mut self) {
        if self.undo.len() == UNDO_DEPTH {
            self.undo.pop_front();
        }
        self.undo.push_back(self.tabs.clone());
    }

    /// Revert the last edit. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo.pop_back() {
            Some(prev) => {
                self.tabs = prev;
                self.clamp_current();
                true
            }
            None => false,
        }
    }

    /// Forget every recorded edit.
    pub fn clear_history(&mut self) {
        self.undo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut m = AssignmentModel::new(1, 2);
        let s = SignalRef::new(0, "a");
        assert!(m.add(0, 0, s.clone()).unwrap());
        assert!(!m.add(0, 0, s.clone()).unwrap());
        assert_eq!(m.slot(0, 0).unwrap(), &[s]);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut m = AssignmentModel::new(1, 1);
        assert_eq!(
            m.add(0, 3, SignalRef::new(0, "a")),
            Err(AssignmentError::SlotOutOfRange { tab: 0, slot: 3 })
        );
    }

    #[test]
    fn resize_pads_truncates_and_clamps_current() {
        let mut m = AssignmentModel::new(1, 4);
        m.add(0, 3, SignalRef::new(0, "a")).unwrap();
        m.set_current(0, 3);
        m.resize(0, 2);
        assert_eq!(m.slot_count(0), 2);
        assert_eq!(m.current(), (0, 1));
        m.resize(0, 3);
        assert!(m.slot(0, 2).unwrap().is_empty());
    }

    #[test]
    fn undo_restores_previous_grid() {
        let mut m = AssignmentModel::new(1, 1);
        m.add(0, 0, SignalRef::new(0, "a")).unwrap();
        m.add(0, 0, SignalRef::new(1, "a")).unwrap();
        assert!(m.undo());
        assert_eq!(m.slot(0, 0).unwrap(), &[SignalRef::new(0, "a")]);
        assert!(m.undo());
        assert!(m.slot(0, 0).unwrap().is_empty());
        assert!(!m.undo());
    }

    #[test]
    fn assign_drops_duplicates() {
        let mut m = AssignmentModel::new(1, 1);
        let a = SignalRef::new(0, "a");
        m.assign(0, 0, vec![a.clone(), a.clone(), SignalRef::derived("d")])
            .unwrap();
        assert_eq!(m.slot(0, 0).unwrap().len(), 2);
    }
}
