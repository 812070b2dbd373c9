//! Display-label disambiguation for signals that share a base name.
//!
//! Within one slot, signals are grouped by base name. A group collides when
//! it has more than one member, or when the same base name is assigned from
//! a different source anywhere in the assignment model. Colliding labels get
//! a `_{suffix}`:
//!
//! * every instance comes from one source: a 1-based ordinal in first-seen
//!   order (`Speed_{1}`, `Speed_{2}`);
//! * instances come from several sources: the source label, with an ordinal
//!   appended when that source contributes more than one instance
//!   (`Speed_{run1}`, `Speed_{run2_1}`, `Speed_{run2_2}`).
//!
//! The same inputs in the same order always yield the same labels.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::data::assignment::SignalRef;

/// Source label used for derived signals (source index `-1`).
pub const DERIVED_LABEL: &str = "derived";

fn suffixed(name: &str, suffix: &str) -> String {
    format!("{}_{{{}}}", name, suffix)
}

/// Resolve one display label per entry of `slot`, in the same order.
///
/// `global` is every reference currently held by the assignment model;
/// `source_label` maps a source index to its human-readable label.
pub fn disambiguate<'a, G, F>(slot: &'a [SignalRef], global: G, source_label: F) -> Vec<String>
where
    G: IntoIterator<Item = &'a SignalRef>,
    F: Fn(i32) -> String,
{
    // Sources carrying each base name anywhere in the model.
    let mut sources_by_name: HashMap<&str, BTreeSet<i32>> = HashMap::new();
    for r in global.into_iter().chain(slot.iter()) {
        sources_by_name
            .entry(r.name.as_str())
            .or_default()
            .insert(r.source);
    }

    let mut in_slot: HashMap<&str, usize> = HashMap::new();
    let mut per_source: HashMap<(&str, i32), usize> = HashMap::new();
    for r in slot {
        *in_slot.entry(r.name.as_str()).or_default() += 1;
        *per_source.entry((r.name.as_str(), r.source)).or_default() += 1;
    }

    let mut seen_in_group: HashMap<&str, usize> = HashMap::new();
    let mut seen_per_source: HashMap<(&str, i32), usize> = HashMap::new();
    let mut labels = Vec::with_capacity(slot.len());
    let mut label_cache: BTreeMap<i32, String> = BTreeMap::new();

    for r in slot {
        let name = r.name.as_str();
        let sources = sources_by_name.get(name).map_or(1, BTreeSet::len);
        let members = in_slot.get(name).copied().unwrap_or(1);

        let group_ord = seen_in_group.entry(name).or_default();
        *group_ord += 1;
        let source_ord = seen_per_source.entry((name, r.source)).or_default();
        *source_ord += 1;

        if members <= 1 && sources <= 1 {
            labels.push(r.name.clone());
            continue;
        }

        if sources <= 1 {
            labels.push(suffixed(name, &group_ord.to_string()));
            continue;
        }

        let label = label_cache
            .entry(r.source)
            .or_insert_with(|| {
                if r.is_derived() {
                    DERIVED_LABEL.to_string()
                } else {
                    source_label(r.source)
                }
            })
            .clone();
        let from_source = per_source.get(&(name, r.source)).copied().unwrap_or(1);
        if from_source > 1 {
            labels.push(suffixed(name, &format!("{}_{}", label, source_ord)));
        } else {
            labels.push(suffixed(name, &label));
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(i: i32) -> String {
        format!("src{}", i)
    }

    #[test]
    fn unique_names_are_bare() {
        let slot = vec![SignalRef::new(0, "a"), SignalRef::new(1, "b")];
        assert_eq!(disambiguate(&slot, &slot, label), vec!["a", "b"]);
    }

    #[test]
    fn collision_elsewhere_in_model_counts() {
        let slot = vec![SignalRef::new(0, "a")];
        let global = vec![SignalRef::new(0, "a"), SignalRef::new(1, "a")];
        assert_eq!(disambiguate(&slot, &global, label), vec!["a_{src0}"]);
    }

    #[test]
    fn derived_uses_fixed_label() {
        let slot = vec![SignalRef::new(0, "a"), SignalRef::derived("a")];
        assert_eq!(
            disambiguate(&slot, &slot, label),
            vec!["a_{src0}", "a_{derived}"]
        );
    }
}
