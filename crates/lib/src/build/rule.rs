//! Rules turn matching entries into build tasks.
//!
//! A rule only describes work. [`BuildRule::apply`] appends tasks to a sink;
//! running them is the executor's job.

use std::sync::Arc;

use tracing::trace;

use super::{BuildError, BuildTask, Transform};
use crate::content::ContentType;
use crate::path::{Entry, PathId, Root, Selector};

pub trait BuildRule: Send + Sync {
  /// Append the tasks this rule derives from the current root contents.
  fn apply(&self, sink: &mut Vec<BuildTask>) -> Result<(), BuildError>;
}

/// One task per matching source entry.
///
/// The target id is the source id with `source_prefix` replaced by
/// `target_prefix`, so with prefixes `""` and `"bin"` the source `foo` maps to
/// `bin/foo`. Sources outside `source_prefix` are ignored.
pub struct TransformRule {
  source: Arc<dyn Root>,
  selector: Selector,
  transform: Arc<dyn Transform>,
  target: Arc<dyn Root>,
  target_type: ContentType,
  source_prefix: PathId,
  target_prefix: PathId,
}

impl TransformRule {
  pub fn new(
    source: Arc<dyn Root>,
    selector: impl Into<Selector>,
    transform: Arc<dyn Transform>,
    target: Arc<dyn Root>,
    target_type: ContentType,
  ) -> Self {
    Self {
      source,
      selector: selector.into(),
      transform,
      target,
      target_type,
      source_prefix: PathId::root(),
      target_prefix: PathId::root(),
    }
  }

  /// Map ids under `from` to ids under `to`.
  pub fn with_prefix(mut self, from: PathId, to: PathId) -> Self {
    self.source_prefix = from;
    self.target_prefix = to;
    self
  }

  fn target_id(&self, source: &PathId) -> Option<PathId> {
    let relative = source.strip_prefix(&self.source_prefix)?;
    if relative.is_root() {
      return None;
    }
    Some(self.target_prefix.join(&relative))
  }
}

impl BuildRule for TransformRule {
  fn apply(&self, sink: &mut Vec<BuildTask>) -> Result<(), BuildError> {
    for source in self.source.get_all(&self.selector) {
      let Some(target_id) = self.target_id(source.id()) else {
        trace!(source = %source, prefix = %self.source_prefix, "source outside rule prefix");
        continue;
      };

      let target = self.target.create(&target_id, &self.target_type)?;
      let task = BuildTask::new(vec![source], target.clone(), self.transform.clone()).map_err(|source| BuildError::Task {
        target: target.to_string(),
        source,
      })?;
      sink.push(task);
    }
    Ok(())
  }
}

/// A single task over every matching entry, producing one named target.
///
/// Suits link and archive steps. Sources are passed in id order. No task is
/// produced when nothing matches.
pub struct AggregateRule {
  source: Arc<dyn Root>,
  selector: Selector,
  transform: Arc<dyn Transform>,
  target: Arc<dyn Root>,
  target_id: PathId,
  target_type: ContentType,
}

impl AggregateRule {
  pub fn new(
    source: Arc<dyn Root>,
    selector: impl Into<Selector>,
    transform: Arc<dyn Transform>,
    target: Arc<dyn Root>,
    target_id: PathId,
    target_type: ContentType,
  ) -> Self {
    Self {
      source,
      selector: selector.into(),
      transform,
      target,
      target_id,
      target_type,
    }
  }
}

impl BuildRule for AggregateRule {
  fn apply(&self, sink: &mut Vec<BuildTask>) -> Result<(), BuildError> {
    let mut sources: Vec<Entry> = self.source.get_all(&self.selector);
    if sources.is_empty() {
      return Ok(());
    }
    sources.sort_by(|a, b| a.id().cmp(b.id()).then_with(|| a.content_type().suffix().cmp(b.content_type().suffix())));

    let target = self.target.create(&self.target_id, &self.target_type)?;
    let task = BuildTask::new(sources, target.clone(), self.transform.clone()).map_err(|source| BuildError::Task {
      target: target.to_string(),
      source,
    })?;
    sink.push(task);
    Ok(())
  }
}
