use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::BuildError;
use crate::content::ContentRegistry;
use crate::path::{ArchiveRoot, Root};
use crate::version::SemanticVersion;

/// Source of library roots for project dependencies.
pub trait Repository: Send + Sync {
  fn resolve(&self, name: &str, version: &SemanticVersion) -> Result<Arc<dyn Root>, BuildError>;
}

/// Directory of `<name>-<version>.zip` packages.
pub struct LocalRepository {
  dir: PathBuf,
  content: ContentRegistry,
}

impl LocalRepository {
  pub fn new(dir: impl Into<PathBuf>, content: ContentRegistry) -> Self {
    Self {
      dir: dir.into(),
      content,
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn package_path(&self, name: &str, version: &SemanticVersion) -> PathBuf {
    self.dir.join(format!("{name}-{version}.zip"))
  }
}

impl Repository for LocalRepository {
  fn resolve(&self, name: &str, version: &SemanticVersion) -> Result<Arc<dyn Root>, BuildError> {
    let path = self.package_path(name, version);
    if !path.is_file() {
      return Err(BuildError::PackageNotFound {
        name: name.to_string(),
        version: version.clone(),
        reason: format!("{} does not exist", path.display()),
      });
    }

    debug!(package = name, version = %version, path = %path.display(), "resolved package");
    let root = ArchiveRoot::open(format!("{name}-{version}"), &path, self.content.clone())?;
    Ok(Arc::new(root))
  }
}
