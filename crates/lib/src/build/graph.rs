//! Derivation graph between entries.
//!
//! Each successful task records that its target was derived from its
//! sources. The graph answers both directions: what an entry was built from,
//! and what has to be rebuilt when an entry changes. The executor also asks it
//! whether a task has to run, which adds a changed input set to the
//! timestamp comparison of [`BuildTask::is_stale`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::BuildTask;
use crate::path::{Entry, EntryKey};

#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
  /// child -> the entries it was derived from
  parents: BTreeMap<EntryKey, BTreeSet<EntryKey>>,
  /// parent -> the entries derived from it
  children: BTreeMap<EntryKey, BTreeSet<EntryKey>>,
}

impl BuildGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record that `target` was derived from `sources`, replacing earlier edges of `target`.
  pub fn record(&mut self, target: EntryKey, sources: impl IntoIterator<Item = EntryKey>) {
    if let Some(previous) = self.parents.remove(&target) {
      for parent in previous {
        if let Some(children) = self.children.get_mut(&parent) {
          children.remove(&target);
          if children.is_empty() {
            self.children.remove(&parent);
          }
        }
      }
    }

    let sources: BTreeSet<EntryKey> = sources.into_iter().collect();
    for source in &sources {
      self.children.entry(source.clone()).or_default().insert(target.clone());
    }
    self.parents.insert(target, sources);
  }

  pub fn record_task(&mut self, task: &BuildTask) {
    self.record(task.target().key(), task.sources().iter().map(|s| s.key()));
  }

  /// Whether `task` has to run.
  ///
  /// True when a source is newer than the target, or when the target was last
  /// derived from a different set of entries than the task now names.
  pub fn needs_build(&self, task: &BuildTask) -> bool {
    if task.is_stale() {
      return true;
    }
    let Some(recorded) = self.parents.get(&task.target().key()) else {
      return false;
    };
    let current: BTreeSet<EntryKey> = task.sources().iter().map(Entry::key).collect();
    *recorded != current
  }

  /// Direct parents of `key`.
  pub fn derived_from(&self, key: &EntryKey) -> Vec<EntryKey> {
    self.parents.get(key).map(|set| set.iter().cloned().collect()).unwrap_or_default()
  }

  /// Entries derived directly from `key`.
  pub fn children(&self, key: &EntryKey) -> Vec<EntryKey> {
    self.children.get(key).map(|set| set.iter().cloned().collect()).unwrap_or_default()
  }

  /// Everything transitively derived from `key`, i.e. what a change to `key` invalidates.
  pub fn descendants(&self, key: &EntryKey) -> Vec<EntryKey> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<&EntryKey> = VecDeque::from([key]);

    while let Some(current) = queue.pop_front() {
      for child in self.children.get(current).into_iter().flatten() {
        if child != key && seen.insert(child.clone()) {
          queue.push_back(child);
        }
      }
    }

    seen.into_iter().collect()
  }

  /// Number of derived entries.
  pub fn len(&self) -> usize {
    self.parents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.parents.is_empty()
  }
}
