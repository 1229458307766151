use std::path::PathBuf;

use thiserror::Error;

use crate::content::ContentError;

/// Errors raised by namespace ids, filters, roots and entries.
#[derive(Debug, Error)]
pub enum PathError {
  #[error("invalid path id '{id}': {reason}")]
  InvalidId { id: String, reason: String },

  #[error("invalid path pattern '{pattern}': {reason}")]
  InvalidPattern { pattern: String, reason: String },

  #[error("root '{root}' does not support {operation}")]
  UnsupportedOperation { root: String, operation: &'static str },

  #[error("I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to walk {}: {source}", path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read archive {}: {source}", path.display())]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error(transparent)]
  Content(#[from] ContentError),
}

impl PathError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    PathError::Io {
      path: path.into(),
      source,
    }
  }
}
