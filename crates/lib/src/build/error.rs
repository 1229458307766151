use thiserror::Error;

use crate::content::ContentError;
use crate::execute::ExecuteError;
use crate::extension::ExtensionError;
use crate::path::PathError;
use crate::version::SemanticVersion;

/// Failure of a single build task.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error(transparent)]
  Path(#[from] PathError),

  #[error(transparent)]
  Content(#[from] ContentError),

  #[error("{0}")]
  Failed(String),

  #[error("task reported failure")]
  Unsuccessful,

  #[error("task panicked: {0}")]
  Panicked(String),

  #[error("{target} cannot be derived from itself")]
  SelfDerivation { target: String },
}

/// Errors raised while assembling or refreshing a build project.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Path(#[from] PathError),

  #[error(transparent)]
  Extension(#[from] ExtensionError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error("cannot create task for {target}: {source}")]
  Task {
    target: String,
    #[source]
    source: TaskError,
  },

  #[error("unknown transform '{0}'")]
  UnknownTransform(String),

  #[error("unknown build platform '{0}'")]
  UnknownPlatform(String),

  #[error("platform '{platform}' requires transform '{transform}', which is not registered")]
  MissingTransform { platform: String, transform: String },

  #[error("project already has a root named '{0}'")]
  DuplicateRoot(String),

  #[error("package {name} {version} not found: {reason}")]
  PackageNotFound {
    name: String,
    version: SemanticVersion,
    reason: String,
  },
}
