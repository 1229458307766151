use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::{BuildError, Platform, Transform};
use crate::consts::{BUILD_PLATFORM_POINT, BUILD_TASK_POINT};
use crate::extension::{ExtensionError, ExtensionRegistry, Feature};
use crate::util::{read, write};

/// Transforms and platforms contributed by modules, shared between clones.
#[derive(Clone, Default)]
pub struct BuildRegistry {
  transforms: Arc<RwLock<BTreeMap<String, Arc<dyn Transform>>>>,
  platforms: Arc<RwLock<BTreeMap<String, Arc<dyn Platform>>>>,
}

impl BuildRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_transform(&self, transform: Arc<dyn Transform>) -> Result<(), ExtensionError> {
    let mut transforms = write(&self.transforms);
    if transforms.contains_key(transform.id()) {
      return Err(ExtensionError::Rejected {
        point: BUILD_TASK_POINT.to_string(),
        reason: format!("transform '{}' is already registered", transform.id()),
      });
    }
    debug!(transform = transform.id(), "registered transform");
    transforms.insert(transform.id().to_string(), transform);
    Ok(())
  }

  pub fn register_platform(&self, platform: Arc<dyn Platform>) -> Result<(), ExtensionError> {
    let mut platforms = write(&self.platforms);
    if platforms.contains_key(platform.id()) {
      return Err(ExtensionError::Rejected {
        point: BUILD_PLATFORM_POINT.to_string(),
        reason: format!("platform '{}' is already registered", platform.id()),
      });
    }
    debug!(platform = platform.id(), "registered platform");
    platforms.insert(platform.id().to_string(), platform);
    Ok(())
  }

  pub fn transform(&self, id: &str) -> Result<Arc<dyn Transform>, BuildError> {
    read(&self.transforms)
      .get(id)
      .cloned()
      .ok_or_else(|| BuildError::UnknownTransform(id.to_string()))
  }

  pub fn platform(&self, id: &str) -> Result<Arc<dyn Platform>, BuildError> {
    read(&self.platforms)
      .get(id)
      .cloned()
      .ok_or_else(|| BuildError::UnknownPlatform(id.to_string()))
  }

  pub fn transform_ids(&self) -> Vec<String> {
    read(&self.transforms).keys().cloned().collect()
  }

  pub fn platform_ids(&self) -> Vec<String> {
    read(&self.platforms).keys().cloned().collect()
  }

  /// Fail unless every transform `platform` requires is registered.
  pub fn check_platform(&self, platform: &dyn Platform) -> Result<(), BuildError> {
    let transforms = read(&self.transforms);
    for required in platform.required_transforms() {
      if !transforms.contains_key(&required) {
        return Err(BuildError::MissingTransform {
          platform: platform.id().to_string(),
          transform: required,
        });
      }
    }
    Ok(())
  }

  /// Create the build-task and build-platform extension points.
  pub fn install(&self, extensions: &mut ExtensionRegistry) -> Result<(), ExtensionError> {
    let registry = self.clone();
    extensions.create(BUILD_TASK_POINT, move |feature| match feature {
      Feature::Transform(transform) => registry.register_transform(transform),
      other => Err(ExtensionError::TypeMismatch {
        point: BUILD_TASK_POINT.to_string(),
        expected: "transform",
        found: other.kind(),
      }),
    })?;

    let registry = self.clone();
    extensions.create(BUILD_PLATFORM_POINT, move |feature| match feature {
      Feature::Platform(platform) => registry.register_platform(platform),
      other => Err(ExtensionError::TypeMismatch {
        point: BUILD_PLATFORM_POINT.to_string(),
        expected: "platform",
        found: other.kind(),
      }),
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::build::{BuildRule, TaskError, Unit};
  use crate::content::ContentType;
  use crate::path::{Entry, Filter, Root};

  struct Named(&'static str);

  impl Transform for Named {
    fn id(&self) -> &str {
      self.0
    }

    fn initialise(&self, _: &[Entry], _: &Entry) -> Result<Unit, TaskError> {
      Ok(Box::new(|| Ok(true)))
    }
  }

  struct Needs(Vec<String>);

  impl Platform for Needs {
    fn id(&self) -> &str {
      "needs"
    }
    fn source_filter(&self) -> Filter {
      Filter::any()
    }
    fn target_filter(&self) -> Filter {
      Filter::any()
    }
    fn required_transforms(&self) -> Vec<String> {
      self.0.clone()
    }
    fn rules(&self, _: Arc<dyn Root>, _: Arc<dyn Root>, _: &BuildRegistry) -> Result<Vec<Box<dyn BuildRule>>, BuildError> {
      Ok(Vec::new())
    }
  }

  #[test]
  fn extension_points_feed_the_registry() {
    let registry = BuildRegistry::new();
    let mut extensions = ExtensionRegistry::new();
    registry.install(&mut extensions).unwrap();

    extensions
      .register(BUILD_TASK_POINT, Feature::Transform(Arc::new(Named("compile"))))
      .unwrap();
    extensions
      .register(BUILD_PLATFORM_POINT, Feature::Platform(Arc::new(Needs(vec!["compile".into()]))))
      .unwrap();

    assert_eq!(registry.transform_ids(), vec!["compile"]);
    assert_eq!(registry.platform("needs").unwrap().id(), "needs");
    assert!(matches!(registry.transform("link"), Err(BuildError::UnknownTransform(_))));

    let err = extensions
      .register(BUILD_TASK_POINT, Feature::ContentType(ContentType::text("source", "src")))
      .unwrap_err();
    assert!(matches!(err, ExtensionError::TypeMismatch { expected: "transform", .. }));

    let err = extensions
      .register(BUILD_TASK_POINT, Feature::Transform(Arc::new(Named("compile"))))
      .unwrap_err();
    assert!(matches!(err, ExtensionError::Rejected { .. }));
  }

  #[test]
  fn platform_requirements_are_checked() {
    let registry = BuildRegistry::new();
    registry.register_transform(Arc::new(Named("compile"))).unwrap();

    registry.check_platform(&Needs(vec!["compile".into()])).unwrap();
    let err = registry.check_platform(&Needs(vec!["compile".into(), "link".into()])).unwrap_err();
    assert!(matches!(err, BuildError::MissingTransform { ref transform, .. } if transform == "link"));
  }
}
