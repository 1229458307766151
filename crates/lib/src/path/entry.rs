use std::fmt;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde::Serialize;

use super::{PathError, PathId};
use crate::content::{CodecError, Content, ContentError, ContentType};
use crate::util::lock;

/// Where an entry's bytes live.
#[derive(Debug, Clone)]
pub(crate) enum Backing {
  File(PathBuf),
  Archive { archive: PathBuf, name: String },
  Memory,
}

#[derive(Debug, Default)]
struct EntryState {
  content: Option<Content>,
  dirty: bool,
  last_modified: Option<SystemTime>,
}

struct EntryInner {
  id: PathId,
  content_type: ContentType,
  root: String,
  backing: Backing,
  read_only: bool,
  state: Mutex<EntryState>,
}

/// A single artifact in a root.
///
/// Entries are shared handles: the owning root and any number of build tasks
/// may hold clones, and all of them observe the same content. Content is read
/// from the backing store on first access and cached until the root refreshes.
#[derive(Clone)]
pub struct Entry(Arc<EntryInner>);

/// Stable, comparable name of an entry, used by the build graph and reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryKey {
  pub root: String,
  pub id: PathId,
  pub suffix: String,
}

impl fmt::Display for EntryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.id, self.suffix)
  }
}

impl Entry {
  pub(crate) fn new(
    id: PathId,
    content_type: ContentType,
    root: &str,
    backing: Backing,
    read_only: bool,
    last_modified: Option<SystemTime>,
  ) -> Self {
    Self(Arc::new(EntryInner {
      id,
      content_type,
      root: root.to_string(),
      backing,
      read_only,
      state: Mutex::new(EntryState {
        last_modified,
        ..EntryState::default()
      }),
    }))
  }

  pub fn id(&self) -> &PathId {
    &self.0.id
  }

  pub fn content_type(&self) -> &ContentType {
    &self.0.content_type
  }

  /// Name of the root that owns this entry.
  pub fn root_name(&self) -> &str {
    &self.0.root
  }

  pub fn is_read_only(&self) -> bool {
    self.0.read_only
  }

  pub fn key(&self) -> EntryKey {
    EntryKey {
      root: self.0.root.clone(),
      id: self.0.id.clone(),
      suffix: self.0.content_type.suffix().to_string(),
    }
  }

  /// Whether both handles refer to the same entry.
  pub fn same_entry(&self, other: &Entry) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  /// Time of the last write, or `None` if the entry was never written.
  pub fn last_modified(&self) -> Option<SystemTime> {
    lock(&self.0.state).last_modified
  }

  /// Whether the entry holds edits not yet flushed.
  pub fn is_dirty(&self) -> bool {
    lock(&self.0.state).dirty
  }

  /// Decoded content, loading it from the backing store on first access.
  ///
  /// An entry whose backing file does not exist yet reads as empty.
  pub fn read(&self) -> Result<Content, PathError> {
    let mut state = lock(&self.0.state);
    if let Some(content) = &state.content {
      return Ok(content.clone());
    }

    let bytes = self.load()?;
    let content = self.0.content_type.decode(bytes)?;
    state.content = Some(content.clone());
    Ok(content)
  }

  pub fn read_bytes(&self) -> Result<Vec<u8>, PathError> {
    let content = self.read()?;
    Ok(self.0.content_type.encode(&content)?)
  }

  pub fn read_text(&self) -> Result<String, PathError> {
    match self.read()? {
      Content::Text(text) => Ok(text),
      Content::Binary(bytes) => String::from_utf8(bytes).map_err(|e| {
        PathError::Content(ContentError::Codec {
          content_type: self.0.content_type.name().to_string(),
          source: CodecError::InvalidUtf8(e),
        })
      }),
    }
  }

  /// Replace the content and mark the entry dirty.
  pub fn write(&self, content: Content) -> Result<(), PathError> {
    if self.0.read_only {
      return Err(PathError::UnsupportedOperation {
        root: self.0.root.clone(),
        operation: "write",
      });
    }

    let mut state = lock(&self.0.state);
    state.content = Some(content);
    state.dirty = true;
    state.last_modified = Some(SystemTime::now());
    Ok(())
  }

  pub fn write_text(&self, text: impl Into<String>) -> Result<(), PathError> {
    self.write(Content::Text(text.into()))
  }

  /// Write raw bytes, decoding them with the entry's content type.
  pub fn write_bytes(&self, bytes: Vec<u8>) -> Result<(), PathError> {
    let content = self.0.content_type.decode(bytes)?;
    self.write(content)
  }

  fn load(&self) -> Result<Vec<u8>, PathError> {
    match &self.0.backing {
      Backing::Memory => Ok(Vec::new()),
      Backing::File(path) => match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(PathError::io(path, e)),
      },
      Backing::Archive { archive, name } => {
        let to_error = |source| PathError::Archive {
          path: archive.clone(),
          source,
        };
        let file = fs::File::open(archive).map_err(|e| PathError::io(archive, e))?;
        let mut zip = zip::ZipArchive::new(file).map_err(to_error)?;
        let mut member = zip.by_name(name).map_err(to_error)?;
        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes).map_err(|e| PathError::io(archive, e))?;
        Ok(bytes)
      }
    }
  }

  /// Persist pending edits. Returns whether anything was written.
  pub(crate) fn flush(&self) -> Result<bool, PathError> {
    let mut state = lock(&self.0.state);
    if !state.dirty {
      return Ok(false);
    }

    if let Backing::File(path) = &self.0.backing {
      let Some(content) = &state.content else {
        return Ok(false);
      };
      let bytes = self.0.content_type.encode(content)?;
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PathError::io(parent, e))?;
      }
      fs::write(path, bytes).map_err(|e| PathError::io(path, e))?;
      let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
      state.last_modified = modified.or(state.last_modified);
    }

    state.dirty = false;
    Ok(true)
  }

  /// Pick up a new timestamp from the backing store and drop cached content.
  ///
  /// Dirty entries keep their edits untouched.
  pub(crate) fn reload(&self, last_modified: Option<SystemTime>) {
    let mut state = lock(&self.0.state);
    if state.dirty {
      return;
    }
    state.content = None;
    state.last_modified = last_modified;
  }
}

impl fmt::Debug for Entry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Entry")
      .field("root", &self.0.root)
      .field("id", &self.0.id)
      .field("content_type", &self.0.content_type.name())
      .field("backing", &self.0.backing)
      .finish()
  }
}

impl fmt::Display for Entry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.0.id, self.0.content_type.suffix())
  }
}
