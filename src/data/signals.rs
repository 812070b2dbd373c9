//! Signal registry: per-name scale factor and state (discrete) flag.

use std::collections::{BTreeMap, BTreeSet};

/// Display settings of one signal name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSettings {
    /// Multiplicative factor applied to values. Finite and non-zero.
    pub scale: f64,
    /// Draw as value-change markers instead of a line.
    pub state: bool,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            state: false,
        }
    }
}

/// Settings keyed by base name, shared by every source that carries the name.
#[derive(Debug, Default, Clone)]
pub struct SignalRegistry {
    entries: BTreeMap<String, SignalSettings>,
}

/// Coerce a user-entered scale to a usable factor.
pub fn sanitize_scale(value: f64) -> f64 {
    if value.is_finite() && value != 0.0 {
        value
    } else {
        1.0
    }
}

impl SignalRegistry {
    /// Ensure every name has an entry without touching existing ones.
    pub fn register_all<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for n in names {
            let n = n.as_ref();
            if !self.entries.contains_key(n) {
                self.entries.insert(n.to_string(), SignalSettings::default());
            }
        }
    }

    /// Drop entries whose name is no longer current.
    pub fn prune(&mut self, current: &BTreeSet<String>) {
        self.entries.retain(|name, _| current.contains(name));
    }

    /// `register_all` followed by `prune`.
    pub fn reconcile(&mut self, current: &BTreeSet<String>) {
        self.register_all(current.iter());
        self.prune(current);
    }

    pub fn get(&self, name: &str) -> SignalSettings {
        self.entries.get(name).copied().unwrap_or_default()
    }

    pub fn scale(&self, name: &str) -> f64 {
        self.get(name).scale
    }

    /// Store a scale; non-finite or zero values become `1.0`. Returns the stored value.
    pub fn set_scale(&mut self, name: &str, value: f64) -> f64 {
        let scale = sanitize_scale(value);
        self.entries.entry(name.to_string()).or_default().scale = scale;
        scale
    }

    pub fn state(&self, name: &str) -> bool {
        self.get(name).state
    }

    pub fn set_state(&mut self, name: &str, state: bool) {
        self.entries.entry(name.to_string()).or_default().state = state;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignalSettings)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
