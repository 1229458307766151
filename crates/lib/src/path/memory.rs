use std::sync::RwLock;

use super::entry::Backing;
use super::root::EntryTable;
use super::{Entry, PathError, PathId, Root, Selector};
use crate::content::ContentType;
use crate::util::{read, write};

/// Fully mutable root with no backing store.
///
/// Refresh has nothing to reload, and flush only clears dirty flags.
pub struct MemoryRoot {
  name: String,
  table: RwLock<EntryTable>,
}

impl MemoryRoot {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      table: RwLock::new(EntryTable::default()),
    }
  }
}

impl Root for MemoryRoot {
  fn name(&self) -> &str {
    &self.name
  }

  fn is_read_only(&self) -> bool {
    false
  }

  fn get(&self, id: &PathId, content_type: &ContentType) -> Option<Entry> {
    read(&self.table).get(id, content_type)
  }

  fn get_all(&self, selector: &Selector) -> Vec<Entry> {
    read(&self.table).select(selector)
  }

  fn create(&self, id: &PathId, content_type: &ContentType) -> Result<Entry, PathError> {
    let mut table = write(&self.table);
    if let Some(existing) = table.get(id, content_type) {
      return Ok(existing);
    }
    let entry = Entry::new(id.clone(), content_type.clone(), &self.name, Backing::Memory, false, None);
    Ok(table.insert(entry))
  }

  fn refresh(&self) -> Result<(), PathError> {
    Ok(())
  }

  fn flush(&self) -> Result<(), PathError> {
    for entry in read(&self.table).entries() {
      entry.flush()?;
    }
    Ok(())
  }
}
