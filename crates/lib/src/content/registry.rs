use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::{ContentError, ContentType};
use crate::consts::CONTENT_TYPE_POINT;
use crate::extension::{ExtensionError, ExtensionRegistry, Feature};
use crate::path::PathId;
use crate::util::{read, write};

/// Suffix to content type table consulted by every root.
///
/// Clones share the same table, so a registry handed to roots before module
/// activation sees the types modules register afterwards.
#[derive(Clone, Default)]
pub struct ContentRegistry {
  types: Arc<RwLock<BTreeMap<String, ContentType>>>,
}

impl ContentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Associate `content_type` with its suffix.
  ///
  /// Registering the same type twice is a no-op. A different type claiming a
  /// taken suffix is rejected.
  pub fn register(&self, content_type: ContentType) -> Result<(), ContentError> {
    let mut types = write(&self.types);
    if let Some(existing) = types.get(content_type.suffix()) {
      if *existing == content_type {
        return Ok(());
      }
      return Err(ContentError::DuplicateSuffix {
        suffix: content_type.suffix().to_string(),
        existing: existing.name().to_string(),
      });
    }

    debug!(name = content_type.name(), suffix = content_type.suffix(), "registered content type");
    types.insert(content_type.suffix().to_string(), content_type);
    Ok(())
  }

  pub fn lookup(&self, suffix: &str) -> Option<ContentType> {
    read(&self.types).get(suffix).cloned()
  }

  /// All registered types, ordered by suffix.
  pub fn types(&self) -> Vec<ContentType> {
    read(&self.types).values().cloned().collect()
  }

  /// Classify a slash separated name such as `a/b/foo.src`.
  ///
  /// Returns the entry id (`a/b/foo`) and the type registered for the suffix,
  /// or `None` when the suffix is unknown or the name is not a valid id.
  pub fn classify_name(&self, name: &str) -> Option<(PathId, ContentType)> {
    let (dir, file) = match name.rsplit_once('/') {
      Some((dir, file)) => (Some(dir), file),
      None => (None, name),
    };

    let (stem, suffix) = file.rsplit_once('.')?;
    if stem.is_empty() {
      return None;
    }

    let content_type = self.lookup(suffix)?;
    let id = match dir {
      Some(dir) => PathId::parse(&format!("{dir}/{stem}")).ok()?,
      None => PathId::parse(stem).ok()?,
    };

    Some((id, content_type))
  }

  /// Classify a path relative to a root directory.
  pub fn classify(&self, relative: &Path) -> Option<(PathId, ContentType)> {
    let mut segments = Vec::new();
    for component in relative.components() {
      match component {
        Component::Normal(segment) => segments.push(segment.to_str()?),
        _ => return None,
      }
    }
    self.classify_name(&segments.join("/"))
  }

  /// Create the content-type extension point, feeding registrations into this table.
  pub fn install(&self, extensions: &mut ExtensionRegistry) -> Result<(), ExtensionError> {
    let registry = self.clone();
    extensions.create(CONTENT_TYPE_POINT, move |feature| match feature {
      Feature::ContentType(content_type) => registry.register(content_type).map_err(|e| ExtensionError::Rejected {
        point: CONTENT_TYPE_POINT.to_string(),
        reason: e.to_string(),
      }),
      other => Err(ExtensionError::TypeMismatch {
        point: CONTENT_TYPE_POINT.to_string(),
        expected: "content type",
        found: other.kind(),
      }),
    })
  }
}
