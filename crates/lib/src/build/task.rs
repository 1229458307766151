use std::fmt;
use std::sync::Arc;

use super::TaskError;
use crate::path::{Entry, EntryKey};

/// Zero-argument unit of work produced by [`Transform::initialise`].
///
/// Returns `Ok(true)` on success. `Ok(false)` and `Err` both mark the task failed.
pub type Unit = Box<dyn FnOnce() -> Result<bool, TaskError> + Send>;

/// Turns source entries into a target entry.
pub trait Transform: Send + Sync {
  fn id(&self) -> &str;

  /// Prepare the work for one task.
  ///
  /// Anything that may block on other tasks (reading sources) belongs here;
  /// the returned unit only computes and writes the target.
  fn initialise(&self, sources: &[Entry], target: &Entry) -> Result<Unit, TaskError>;
}

/// A transform bound to concrete sources and one target.
#[derive(Clone)]
pub struct BuildTask {
  sources: Vec<Entry>,
  target: Entry,
  transform: Arc<dyn Transform>,
}

/// Structural identity of a task, comparable across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskSignature {
  pub transform: String,
  pub sources: Vec<EntryKey>,
  pub target: EntryKey,
}

impl BuildTask {
  /// Bind `transform` to its inputs and output. The target may not be one of the sources.
  pub fn new(sources: Vec<Entry>, target: Entry, transform: Arc<dyn Transform>) -> Result<Self, TaskError> {
    if sources.iter().any(|source| source.same_entry(&target)) {
      return Err(TaskError::SelfDerivation {
        target: target.to_string(),
      });
    }
    Ok(Self {
      sources,
      target,
      transform,
    })
  }

  pub fn sources(&self) -> &[Entry] {
    &self.sources
  }

  pub fn target(&self) -> &Entry {
    &self.target
  }

  pub fn transform_id(&self) -> &str {
    self.transform.id()
  }

  /// Whether some source was modified after the target.
  ///
  /// A target that was never written is older than everything.
  pub fn is_stale(&self) -> bool {
    let Some(built) = self.target.last_modified() else {
      return true;
    };
    self
      .sources
      .iter()
      .any(|source| source.last_modified().is_some_and(|modified| modified > built))
  }

  pub fn initialise(&self) -> Result<Unit, TaskError> {
    self.transform.initialise(&self.sources, &self.target)
  }

  pub fn signature(&self) -> TaskSignature {
    TaskSignature {
      transform: self.transform.id().to_string(),
      sources: self.sources.iter().map(Entry::key).collect(),
      target: self.target.key(),
    }
  }
}

impl PartialEq for BuildTask {
  fn eq(&self, other: &Self) -> bool {
    self.signature() == other.signature()
  }
}

impl Eq for BuildTask {}

impl fmt::Debug for BuildTask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuildTask")
      .field("transform", &self.transform.id())
      .field("sources", &self.sources.iter().map(ToString::to_string).collect::<Vec<_>>())
      .field("target", &self.target.to_string())
      .finish()
  }
}

impl fmt::Display for BuildTask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {}", self.transform.id(), self.target)
  }
}
