use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, trace};
use walkdir::WalkDir;

use super::entry::Backing;
use super::root::EntryTable;
use super::{Entry, PathError, PathId, Root, Selector};
use crate::content::{ContentRegistry, ContentType};
use crate::util::{read, write};

/// Mutable root mirroring a directory tree.
///
/// `a/b/foo.src` on disk is the entry `a/b/foo` of whatever type is registered
/// for `src`. Files with unregistered suffixes are invisible. The directory is
/// created on first flush if it does not exist yet.
pub struct DirectoryRoot {
  name: String,
  base: PathBuf,
  content: ContentRegistry,
  table: RwLock<EntryTable>,
}

impl DirectoryRoot {
  pub fn open(name: impl Into<String>, base: impl AsRef<Path>, content: ContentRegistry) -> Result<Self, PathError> {
    let base = base.as_ref();
    let base = dunce::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());

    let root = Self {
      name: name.into(),
      base,
      content,
      table: RwLock::new(EntryTable::default()),
    };
    root.refresh()?;
    Ok(root)
  }

  pub fn base(&self) -> &Path {
    &self.base
  }

  fn scan(&self) -> Result<Vec<(PathId, ContentType, Option<std::time::SystemTime>)>, PathError> {
    let mut found = Vec::new();
    if !self.base.is_dir() {
      return Ok(found);
    }

    for item in WalkDir::new(&self.base).follow_links(false).sort_by_file_name() {
      let item = item.map_err(|source| PathError::Walk {
        path: self.base.clone(),
        source,
      })?;
      if !item.file_type().is_file() {
        continue;
      }

      let Ok(relative) = item.path().strip_prefix(&self.base) else {
        continue;
      };
      let Some((id, content_type)) = self.content.classify(relative) else {
        trace!(root = %self.name, path = %relative.display(), "skipping unclassified file");
        continue;
      };

      let modified = item.metadata().ok().and_then(|m| m.modified().ok());
      found.push((id, content_type, modified));
    }

    Ok(found)
  }

  fn file_entry(&self, id: PathId, content_type: ContentType, modified: Option<std::time::SystemTime>) -> Entry {
    let path = self.base.join(id.to_relative_path(content_type.suffix()));
    Entry::new(id, content_type, &self.name, Backing::File(path), false, modified)
  }
}

impl Root for DirectoryRoot {
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
    if id.is_root() {
      return Err(PathError::InvalidId {
        id: String::new(),
        reason: "the root id cannot name an entry".to_string(),
      });
    }
    Ok(table.insert(self.file_entry(id.clone(), content_type.clone(), None)))
  }

  fn refresh(&self) -> Result<(), PathError> {
    let found = self.scan()?;
    let mut table = write(&self.table);
    table.reconcile(found, |id, content_type, modified| self.file_entry(id, content_type, modified));
    debug!(root = %self.name, entries = table.len(), "refreshed directory root");
    Ok(())
  }

  fn flush(&self) -> Result<(), PathError> {
    let table = read(&self.table);
    let mut written = 0;
    for entry in table.entries() {
      if entry.flush()? {
        written += 1;
      }
    }
    if written > 0 {
      debug!(root = %self.name, written, "flushed directory root");
    }
    Ok(())
  }
}
