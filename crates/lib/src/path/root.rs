use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use super::{Entry, PathError, PathId, Selector};
use crate::content::ContentType;

/// A storage backend exposing a namespace of entries.
///
/// Roots are shared across build threads behind `Arc<dyn Root>`, so every
/// operation takes `&self` and implementations lock internally.
pub trait Root: Send + Sync {
  fn name(&self) -> &str;

  fn is_read_only(&self) -> bool;

  /// The entry with this id and content type, if present.
  fn get(&self, id: &PathId, content_type: &ContentType) -> Option<Entry>;

  /// Every entry the selector accepts, ordered by id then suffix.
  fn get_all(&self, selector: &Selector) -> Vec<Entry>;

  /// Ids of the entries the selector accepts, without duplicates.
  fn match_ids(&self, selector: &Selector) -> Vec<PathId> {
    let ids: BTreeSet<PathId> = self.get_all(selector).into_iter().map(|e| e.id().clone()).collect();
    ids.into_iter().collect()
  }

  /// The existing entry, or a new empty one.
  fn create(&self, id: &PathId, content_type: &ContentType) -> Result<Entry, PathError>;

  /// Re-enumerate the backing store. Entries with unflushed edits survive.
  fn refresh(&self) -> Result<(), PathError>;

  /// Persist every dirty entry.
  fn flush(&self) -> Result<(), PathError>;
}

/// Entries of one root, bucketed by (id, suffix).
///
/// Content types compare by identity, so two distinct types sharing a suffix
/// are separate entries in the same bucket.
#[derive(Debug, Default)]
pub(crate) struct EntryTable {
  entries: BTreeMap<(PathId, String), Vec<Entry>>,
}

fn key_of(id: &PathId, content_type: &ContentType) -> (PathId, String) {
  (id.clone(), content_type.suffix().to_string())
}

impl EntryTable {
  pub(crate) fn get(&self, id: &PathId, content_type: &ContentType) -> Option<Entry> {
    self
      .entries
      .get(&key_of(id, content_type))?
      .iter()
      .find(|entry| entry.content_type() == content_type)
      .cloned()
  }

  /// Add `entry`, replacing one of the same id and type.
  pub(crate) fn insert(&mut self, entry: Entry) -> Entry {
    let bucket = self.entries.entry(key_of(entry.id(), entry.content_type())).or_default();
    match bucket.iter_mut().find(|known| known.content_type() == entry.content_type()) {
      Some(slot) => *slot = entry.clone(),
      None => bucket.push(entry.clone()),
    }
    entry
  }

  pub(crate) fn select(&self, selector: &Selector) -> Vec<Entry> {
    self
      .entries()
      .filter(|entry| selector.matches(entry.id(), entry.content_type()))
      .cloned()
      .collect()
  }

  pub(crate) fn entries(&self) -> impl Iterator<Item = &Entry> {
    self.entries.values().flatten()
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.values().map(Vec::len).sum()
  }

  /// Merge a fresh enumeration of the backing store.
  ///
  /// Known entries are reloaded in place so handles held elsewhere stay valid.
  /// Entries that vanished are dropped unless they are dirty.
  pub(crate) fn reconcile(
    &mut self,
    found: Vec<(PathId, ContentType, Option<SystemTime>)>,
    mut make: impl FnMut(PathId, ContentType, Option<SystemTime>) -> Entry,
  ) {
    let mut previous = std::mem::take(&mut self.entries);

    for (id, content_type, modified) in found {
      let key = key_of(&id, &content_type);
      let known = previous.get_mut(&key).and_then(|bucket| {
        let index = bucket.iter().position(|entry| entry.content_type() == &content_type)?;
        Some(bucket.swap_remove(index))
      });
      let entry = match known {
        Some(existing) => {
          existing.reload(modified);
          existing
        }
        None => make(id, content_type, modified),
      };
      self.insert(entry);
    }

    for entry in previous.into_values().flatten() {
      if entry.is_dirty() && self.get(entry.id(), entry.content_type()).is_none() {
        self.insert(entry);
      }
    }
  }
}
