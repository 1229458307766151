use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use tracing::debug;

use super::entry::Backing;
use super::root::EntryTable;
use super::{Entry, PathError, PathId, Root, Selector};
use crate::content::{ContentRegistry, ContentType};
use crate::util::{read, write};

/// Read-only root over a zip or jar container.
///
/// Members are enumerated when the root is opened and again on refresh. Every
/// entry reports the archive file's modification time, and content is
/// decompressed only when an entry is first read.
pub struct ArchiveRoot {
  name: String,
  archive: PathBuf,
  content: ContentRegistry,
  table: RwLock<EntryTable>,
}

impl ArchiveRoot {
  pub fn open(name: impl Into<String>, archive: impl AsRef<Path>, content: ContentRegistry) -> Result<Self, PathError> {
    let archive = archive.as_ref();
    let archive = dunce::canonicalize(archive).map_err(|e| PathError::io(archive, e))?;

    let root = Self {
      name: name.into(),
      archive,
      content,
      table: RwLock::new(EntryTable::default()),
    };
    root.refresh()?;
    Ok(root)
  }

  pub fn archive(&self) -> &Path {
    &self.archive
  }

  fn scan(&self) -> Result<Vec<(PathId, ContentType, Option<SystemTime>)>, PathError> {
    let file = File::open(&self.archive).map_err(|e| PathError::io(&self.archive, e))?;
    let modified = file.metadata().and_then(|m| m.modified()).ok();
    let mut zip = zip::ZipArchive::new(file).map_err(|source| PathError::Archive {
      path: self.archive.clone(),
      source,
    })?;

    let mut found = Vec::new();
    for index in 0..zip.len() {
      let member = zip.by_index_raw(index).map_err(|source| PathError::Archive {
        path: self.archive.clone(),
        source,
      })?;
      if member.is_dir() {
        continue;
      }
      if let Some((id, content_type)) = self.content.classify_name(member.name()) {
        found.push((id, content_type, modified));
      }
    }

    Ok(found)
  }

  fn member_entry(&self, id: PathId, content_type: ContentType, modified: Option<SystemTime>) -> Entry {
    let name = id.to_name(content_type.suffix());
    let backing = Backing::Archive {
      archive: self.archive.clone(),
      name,
    };
    Entry::new(id, content_type, &self.name, backing, true, modified)
  }
}

impl Root for ArchiveRoot {
  fn name(&self) -> &str {
    &self.name
  }

  fn is_read_only(&self) -> bool {
    true
  }

  fn get(&self, id: &PathId, content_type: &ContentType) -> Option<Entry> {
    read(&self.table).get(id, content_type)
  }

  fn get_all(&self, selector: &Selector) -> Vec<Entry> {
    read(&self.table).select(selector)
  }

  fn create(&self, id: &PathId, content_type: &ContentType) -> Result<Entry, PathError> {
    read(&self.table)
      .get(id, content_type)
      .ok_or_else(|| PathError::UnsupportedOperation {
        root: self.name.clone(),
        operation: "create",
      })
  }

  fn refresh(&self) -> Result<(), PathError> {
    let found = self.scan()?;
    let mut table = write(&self.table);
    table.reconcile(found, |id, content_type, modified| self.member_entry(id, content_type, modified));
    debug!(root = %self.name, archive = %self.archive.display(), entries = table.len(), "refreshed archive root");
    Ok(())
  }

  fn flush(&self) -> Result<(), PathError> {
    Ok(())
  }
}
