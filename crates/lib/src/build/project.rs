use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::{BuildError, BuildGraph, BuildRegistry, BuildRule, BuildTask, Platform, Repository};
use crate::content::ContentRegistry;
use crate::execute::{self, BuildHandle, ExecuteConfig};
use crate::path::{CompositeRoot, Root};
use crate::util::lock;
use crate::version::SemanticVersion;

/// Roots, rules and the tasks derived from them.
///
/// The project root is a [`CompositeRoot`] over every added root. Rules are
/// applied in the order they were added on each [`refresh`](Self::refresh).
pub struct BuildProject {
  root: Arc<CompositeRoot>,
  rules: Vec<Box<dyn BuildRule>>,
  tasks: Vec<BuildTask>,
  graph: Arc<Mutex<BuildGraph>>,
}

impl BuildProject {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      root: Arc::new(CompositeRoot::new(name)),
      rules: Vec::new(),
      tasks: Vec::new(),
      graph: Arc::new(Mutex::new(BuildGraph::new())),
    }
  }

  /// Assemble a project from `platform`: source and target roots plus the platform's rules.
  pub fn from_platform(
    name: impl Into<String>,
    platform: &dyn Platform,
    registry: &BuildRegistry,
    source_dir: &Path,
    output_dir: &Path,
    content: &ContentRegistry,
  ) -> Result<Self, BuildError> {
    registry.check_platform(platform)?;

    let source = platform.source_root(source_dir, content)?;
    let target = platform.target_root(output_dir, content)?;
    let rules = platform.rules(source.clone(), target.clone(), registry)?;

    let mut project = Self::new(name);
    project.add_root(target)?;
    project.add_root(source)?;
    for rule in rules {
      project.add_rule(rule);
    }

    info!(
      platform = platform.id(),
      source = %source_dir.display(),
      output = %output_dir.display(),
      "assembled build project"
    );
    Ok(project)
  }

  /// Composite view over every root of the project.
  pub fn root(&self) -> Arc<CompositeRoot> {
    self.root.clone()
  }

  /// Mount `root`. Root names must be unique within the project.
  pub fn add_root(&mut self, root: Arc<dyn Root>) -> Result<(), BuildError> {
    if self.root.delegate(root.name()).is_some() {
      return Err(BuildError::DuplicateRoot(root.name().to_string()));
    }
    debug!(root = root.name(), read_only = root.is_read_only(), "added root");
    self.root.push(root);
    Ok(())
  }

  pub fn add_rule(&mut self, rule: Box<dyn BuildRule>) {
    self.rules.push(rule);
  }

  /// Mount the library root `repository` resolves for `name` at `version`.
  pub fn add_dependency(
    &mut self,
    repository: &dyn Repository,
    name: &str,
    version: &SemanticVersion,
  ) -> Result<(), BuildError> {
    let root = repository.resolve(name, version)?;
    info!(package = name, version = %version, "added dependency");
    self.add_root(root)
  }

  /// Refresh every root, re-apply the rules and order the resulting tasks.
  ///
  /// Without intervening changes two refreshes yield equal task lists.
  pub fn refresh(&mut self) -> Result<(), BuildError> {
    self.root.refresh()?;

    let mut tasks = Vec::new();
    for rule in &self.rules {
      rule.apply(&mut tasks)?;
    }
    self.tasks = execute::order_tasks(tasks)?;

    debug!(tasks = self.tasks.len(), "refreshed build project");
    Ok(())
  }

  /// Tasks from the last refresh, in dependency order.
  pub fn tasks(&self) -> &[BuildTask] {
    &self.tasks
  }

  pub fn graph(&self) -> Arc<Mutex<BuildGraph>> {
    self.graph.clone()
  }

  /// Snapshot of the derivation graph.
  pub fn derivations(&self) -> BuildGraph {
    lock(&self.graph).clone()
  }

  /// Start executing the current tasks on the ambient tokio runtime.
  pub fn build(&self, config: &ExecuteConfig) -> Result<BuildHandle, BuildError> {
    info!(tasks = self.tasks.len(), mode = %config.mode, "starting build");
    Ok(execute::spawn_build(self.tasks.clone(), self.graph.clone(), config.clone())?)
  }

  /// Write pending changes of every writable root back to storage.
  pub fn flush(&self) -> Result<(), BuildError> {
    self.root.flush()?;
    Ok(())
  }
}
