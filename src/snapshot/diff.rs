//! Three-way diffs between a baseline capture and the live registries
//!
//! These functions only plan; [`super::ProcessSnapshot`] applies the plan and
//! reports each change.

use crate::runtime::{Handle, Listener};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One change needed to bring a keyed registry back to its baseline
#[derive(Debug, PartialEq)]
pub enum KeyedChange<V: ?Sized> {
    /// Key was deleted since the baseline
    Restore { key: String, value: Handle<V> },
    /// Key exists in both but now points at a different value
    Replace { key: String, value: Handle<V> },
    /// Key was added since the baseline
    Remove { key: String },
}

/// Plan the changes for a keyed registry.
///
/// Baseline keys come first in baseline order, then added keys in current order.
pub fn diff_keyed<V: ?Sized>(
    baseline: &[(String, Handle<V>)],
    current: &[(String, Handle<V>)],
) -> Vec<KeyedChange<V>> {
    let live: HashMap<&str, &Handle<V>> = current
        .iter()
        .map(|(key, value)| (key.as_str(), value))
        .collect();
    let known: HashSet<&str> = baseline.iter().map(|(key, _)| key.as_str()).collect();

    let mut changes = Vec::new();

    for (key, value) in baseline {
        match live.get(key.as_str()) {
            None => changes.push(KeyedChange::Restore {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(now) if !now.ptr_eq(value) => changes.push(KeyedChange::Replace {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(_) => {}
        }
    }

    for (key, _) in current {
        if !known.contains(key.as_str()) {
            changes.push(KeyedChange::Remove { key: key.clone() });
        }
    }

    changes
}

/// Occurrences in `from` not matched by an occurrence in `minus`, by identity.
///
/// Each occurrence in `minus` cancels at most one occurrence in `from`, so a
/// listener registered twice and removed once still leaves one behind.
pub fn multiset_difference(from: &[Listener], minus: &[Listener]) -> Vec<Listener> {
    let mut budget: HashMap<usize, usize> = HashMap::new();
    for listener in minus {
        *budget.entry(listener.id()).or_default() += 1;
    }

    from.iter()
        .filter(|listener| match budget.get_mut(&listener.id()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Listener changes for a single event
#[derive(Debug)]
pub struct ListenerDiff {
    pub event: String,
    /// Baseline had no listeners for this event at all
    pub baseline_empty: bool,
    pub added: Vec<Listener>,
    pub removed: Vec<Listener>,
}

impl ListenerDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Plan listener changes for every event in the baseline or the live registry.
///
/// Events are visited in baseline order, then events that only exist now.
/// Events with nothing to change are omitted.
pub fn diff_listeners(
    baseline: &[(String, Vec<Listener>)],
    current: &[(String, Vec<Listener>)],
) -> Vec<ListenerDiff> {
    let mut seen = BTreeSet::new();
    let events = baseline
        .iter()
        .chain(current.iter())
        .map(|(event, _)| event.as_str())
        .filter(|event| seen.insert(*event));

    let listeners_of = |side: &[(String, Vec<Listener>)], event: &str| -> Vec<Listener> {
        side.iter()
            .find(|(name, _)| name == event)
            .map(|(_, listeners)| listeners.clone())
            .unwrap_or_default()
    };

    events
        .map(|event| {
            let before = listeners_of(baseline, event);
            let now = listeners_of(current, event);
            ListenerDiff {
                event: event.to_string(),
                baseline_empty: before.is_empty(),
                added: multiset_difference(&now, &before),
                removed: multiset_difference(&before, &now),
            }
        })
        .filter(|diff| !diff.is_empty())
        .collect()
}

/// Names present now that were absent at the baseline, in current order
pub fn added_names(baseline: &BTreeSet<String>, current: &[String]) -> Vec<String> {
    current
        .iter()
        .filter(|name| !baseline.contains(*name))
        .cloned()
        .collect()
}
