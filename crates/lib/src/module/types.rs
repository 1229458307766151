//! Module descriptors, lifecycle states and errors.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::extension::ExtensionError;
use crate::version::{Dependency, SemanticVersion, VersionError};

/// Identity and requirements of a module, as declared by its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
  name: String,
  id: String,
  version: SemanticVersion,
  location: Option<PathBuf>,
  activator: String,
  dependencies: Vec<Dependency>,
}

impl ModuleDescriptor {
  /// A descriptor with no dependencies, named after its id.
  pub fn new(id: impl Into<String>, version: SemanticVersion, activator: impl Into<String>) -> Self {
    let id = id.into();
    Self {
      name: id.clone(),
      id,
      version,
      location: None,
      activator: activator.into(),
      dependencies: Vec::new(),
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
    self.location = Some(location.into());
    self
  }

  pub fn with_dependency(mut self, dependency: Dependency) -> Self {
    self.dependencies.push(dependency);
    self
  }

  pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
    self.dependencies.extend(dependencies);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn version(&self) -> &SemanticVersion {
    &self.version
  }

  /// Archive the module was discovered in. `None` for statically linked modules.
  pub fn location(&self) -> Option<&Path> {
    self.location.as_deref()
  }

  /// Key of the activator factory in the [`ActivatorCatalog`](super::ActivatorCatalog).
  pub fn activator(&self) -> &str {
    &self.activator
  }

  pub fn dependencies(&self) -> &[Dependency] {
    &self.dependencies
  }
}

impl fmt::Display for ModuleDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.id, self.version)
  }
}

/// Lifecycle state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
  /// Descriptor known, not yet ordered.
  Discovered,
  /// Placed in dependency order, waiting for activation.
  Ordered,
  /// Activator started successfully.
  Activated,
  /// Activator missing or its start hook failed.
  Failed,
  /// Stop hook invoked. Terminal.
  Deactivated,
}

impl fmt::Display for ModuleState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      ModuleState::Discovered => "discovered",
      ModuleState::Ordered => "ordered",
      ModuleState::Activated => "activated",
      ModuleState::Failed => "failed",
      ModuleState::Deactivated => "deactivated",
    };
    f.write_str(label)
  }
}

/// Snapshot of one module for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
  pub id: String,
  pub name: String,
  pub version: String,
  pub state: ModuleState,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<PathBuf>,
  pub dependencies: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Outcome of starting or stopping the module set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleReport {
  /// Modules whose hook succeeded, in invocation order.
  pub succeeded: Vec<String>,
  /// Modules whose hook failed, with the error message.
  pub failed: Vec<(String, String)>,
}

impl LifecycleReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }
}

/// Errors raised while discovering, ordering and activating modules.
#[derive(Debug, Error)]
pub enum ModuleError {
  #[error("I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read module archive {}: {source}", path.display())]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("module archive {} has no manifest", path.display())]
  MissingManifest { path: PathBuf },

  #[error("invalid manifest in {location}: {reason}")]
  InvalidManifest { location: String, reason: String },

  #[error("malformed manifest in {location}: {source}")]
  MalformedVersion {
    location: String,
    #[source]
    source: VersionError,
  },

  #[error("module '{id}' is defined twice ({first} and {second})")]
  DuplicateModule { id: String, first: String, second: String },

  #[error("module '{module}' requires '{dependency}', which is not available")]
  MissingDependency { module: String, dependency: String },

  #[error("module '{module}' requires '{dependency}' {required}, found {found}")]
  IncompatibleVersion {
    module: String,
    dependency: String,
    required: String,
    found: SemanticVersion,
  },

  #[error("cyclic module dependency: {cycle}")]
  CyclicDependency { cycle: String },

  #[error("module '{module}' names unknown activator '{activator}'")]
  UnknownActivator { module: String, activator: String },

  #[error("module '{module}' failed to activate: {reason}")]
  Activation { module: String, reason: String },

  #[error(transparent)]
  Extension(#[from] ExtensionError),
}

impl ModuleError {
  /// Whether discovery should log this error and move on to the next archive.
  pub fn is_skippable(&self) -> bool {
    matches!(
      self,
      ModuleError::Io { .. } | ModuleError::Archive { .. } | ModuleError::MissingManifest { .. }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_fills_defaults() {
    let descriptor = ModuleDescriptor::new("kiln.lang", SemanticVersion::new(1, 0, 0), "lang.Activator");
    assert_eq!(descriptor.name(), "kiln.lang");
    assert!(descriptor.location().is_none());
    assert!(descriptor.dependencies().is_empty());
    assert_eq!(descriptor.to_string(), "kiln.lang 1.0.0");

    let descriptor = descriptor
      .with_name("Kiln Language")
      .with_dependency(Dependency::new("kiln.core"));
    assert_eq!(descriptor.name(), "Kiln Language");
    assert_eq!(descriptor.dependencies()[0].id(), "kiln.core");
  }

  #[test]
  fn state_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ModuleState::Activated).unwrap(), "\"activated\"");
    assert_eq!(ModuleState::Failed.to_string(), "failed");
  }
}
