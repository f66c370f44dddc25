//! Ordered list of past queries, most recent first, with a selection slot
//! that is tracked separately from list order.
//!
//! Consumers learn about mutations through [`HistoryChange`] notifications,
//! drained with [`HistoryModel::drain_changes`]. Structural changes and
//! selection changes are reported on distinct variants so a list widget can
//! refresh its items without treating the refresh as a user pick.

use crate::query::Query;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryChange {
    /// Membership or order changed.
    Reordered,
    /// The selection slot changed. `suppressed` is set when the model moved the
    /// selection itself; listeners that issue lookups must ignore those.
    SelectionChanged {
        selected: Option<Query>,
        suppressed: bool,
    },
}

#[derive(Debug, Default)]
pub struct HistoryModel {
    entries: Vec<Query>,
    selected: Option<Query>,
    updating: bool,
    changes: Vec<HistoryChange>,
}

impl HistoryModel {
    /// Builds the model from a persisted list. Later duplicates are dropped.
    pub fn new(initial: Vec<Query>) -> Self {
        let mut entries: Vec<Query> = Vec::with_capacity(initial.len());
        for query in initial {
            if !entries.contains(&query) {
                entries.push(query);
            }
        }

        HistoryModel {
            entries,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[Query] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Query> {
        self.entries.get(index)
    }

    pub fn position(&self, query: &Query) -> Option<usize> {
        self.entries.iter().position(|q| q == query)
    }

    pub fn selected(&self) -> Option<&Query> {
        self.selected.as_ref()
    }

    /// Moves `query` to the front, inserting it if absent, then points the
    /// selection at the new top entry without waking selection listeners.
    pub fn record_success(&mut self, query: Query) {
        if let Some(pos) = self.position(&query) {
            self.entries.remove(pos);
        }
        self.entries.insert(0, query.clone());
        self.changes.push(HistoryChange::Reordered);

        self.updating = true;
        self.select_without_fetch(query);
        self.updating = false;
    }

    /// Sets the selection slot. Never triggers a lookup on its own.
    pub fn select_without_fetch(&mut self, query: Query) {
        self.selected = Some(query.clone());
        self.changes.push(HistoryChange::SelectionChanged {
            selected: Some(query),
            suppressed: self.updating,
        });
    }

    /// Drops entries past `max`. Only reports a change when something was removed.
    pub fn truncate(&mut self, max: usize) {
        if self.entries.len() > max {
            self.entries.truncate(max);
            self.changes.push(HistoryChange::Reordered);
        }
    }

    pub fn drain_changes(&mut self) -> Vec<HistoryChange> {
        std::mem::take(&mut self.changes)
    }
}
