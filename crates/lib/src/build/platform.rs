use std::path::Path;
use std::sync::Arc;

use super::{BuildError, BuildRegistry, BuildRule};
use crate::content::ContentRegistry;
use crate::path::{DirectoryRoot, Filter, PathError, Root};

/// A build target contributed through the build-platform extension point.
///
/// A platform describes which entries it consumes and produces, where they
/// live, which transforms it needs, and the rules connecting them.
pub trait Platform: Send + Sync {
  fn id(&self) -> &str;

  /// Entries the platform consumes.
  fn source_filter(&self) -> Filter;

  /// Entries the platform produces.
  fn target_filter(&self) -> Filter;

  /// Root holding the project's sources.
  fn source_root(&self, base: &Path, content: &ContentRegistry) -> Result<Arc<dyn Root>, PathError> {
    Ok(Arc::new(DirectoryRoot::open("source", base, content.clone())?))
  }

  /// Root receiving build outputs.
  fn target_root(&self, base: &Path, content: &ContentRegistry) -> Result<Arc<dyn Root>, PathError> {
    Ok(Arc::new(DirectoryRoot::open("target", base, content.clone())?))
  }

  /// Ids of the transforms the rules rely on.
  fn required_transforms(&self) -> Vec<String>;

  /// Rules wiring `source` to `target`. Required transforms are looked up in `registry`.
  fn rules(
    &self,
    source: Arc<dyn Root>,
    target: Arc<dyn Root>,
    registry: &BuildRegistry,
  ) -> Result<Vec<Box<dyn BuildRule>>, BuildError>;
}
