//! The core module linked into every host.
//!
//! `kiln.core` contributes a plain-text content type, a `copy` transform, a
//! `copy` build platform and a few utility functions. It doubles as the
//! reference for how a module's activator wires features into the
//! [`ExtensionRegistry`].

use std::sync::Arc;

use tracing::debug;

use crate::build::{BuildError, BuildRegistry, BuildRule, Platform, TaskError, Transform, TransformRule, Unit};
use crate::consts::{BUILD_PLATFORM_POINT, BUILD_TASK_POINT, CONTENT_TYPE_POINT, FUNCTION_POINT};
use crate::content::{ContentRegistry, ContentType};
use crate::extension::{ExtensionError, ExtensionRegistry, Feature, FunctionDef, FunctionRegistry};
use crate::module::{Activator, ActivatorCatalog, ModuleContext, ModuleDescriptor, ModuleError};
use crate::path::{Entry, Filter, PathId, Root, Selector};
use crate::version::SemanticVersion;

pub const CORE_MODULE: &str = "kiln.core";

/// Activator reference of the core module.
pub const CORE_ACTIVATOR: &str = "kiln.core.Activator";

/// Id shared by the copy transform and the copy platform.
pub const COPY: &str = "copy";

/// Add the activators shipped in this crate to `catalog`.
pub fn register_activators(catalog: &mut ActivatorCatalog) {
  catalog.register(CORE_ACTIVATOR, || Box::new(CoreActivator));
}

/// Descriptor of the core module, for hosts that add it without discovery.
pub fn core_descriptor() -> ModuleDescriptor {
  ModuleDescriptor::new(CORE_MODULE, SemanticVersion::new(0, 3, 0), CORE_ACTIVATOR).with_name("Kiln Core")
}

/// The registries a host exposes to modules.
#[derive(Clone, Default)]
pub struct Registries {
  pub content: ContentRegistry,
  pub build: BuildRegistry,
  pub functions: FunctionRegistry,
}

impl Registries {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create the content-type, build-task, build-platform and function points.
  pub fn install(&self, extensions: &mut ExtensionRegistry) -> Result<(), ExtensionError> {
    self.content.install(extensions)?;
    self.build.install(extensions)?;
    self.functions.install(extensions)
  }
}

struct CoreActivator;

impl Activator for CoreActivator {
  fn start(&mut self, context: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
    let text = ContentType::text("text", "txt");

    context.register(CONTENT_TYPE_POINT, Feature::ContentType(text.clone()))?;
    context.register(BUILD_TASK_POINT, Feature::Transform(Arc::new(CopyTransform)))?;
    context.register(BUILD_PLATFORM_POINT, Feature::Platform(Arc::new(CopyPlatform { text })))?;
    context.register(FUNCTION_POINT, Feature::Function(FunctionDef::new("path.join", join_ids)))?;
    context.register(FUNCTION_POINT, Feature::Function(FunctionDef::new("path.parent", parent_id)))?;

    debug!(module = %context.descriptor().id(), "core features registered");
    Ok(())
  }
}

/// Concatenates its sources into the target.
struct CopyTransform;

impl Transform for CopyTransform {
  fn id(&self) -> &str {
    COPY
  }

  fn initialise(&self, sources: &[Entry], target: &Entry) -> Result<Unit, TaskError> {
    let mut bytes = Vec::new();
    for source in sources {
      bytes.extend(source.read_bytes()?);
    }
    let target = target.clone();
    Ok(Box::new(move || {
      target.write_bytes(bytes)?;
      Ok(true)
    }))
  }
}

/// Copies `src/**/*.txt` to the same relative location in the output root.
struct CopyPlatform {
  text: ContentType,
}

impl CopyPlatform {
  fn source_prefix() -> PathId {
    PathId::parse("src").unwrap_or_default()
  }
}

impl Platform for CopyPlatform {
  fn id(&self) -> &str {
    COPY
  }

  fn source_filter(&self) -> Filter {
    Filter::path("src/**", Some(self.text.clone())).unwrap_or_else(|_| Filter::of_type(self.text.clone()))
  }

  fn target_filter(&self) -> Filter {
    Filter::of_type(self.text.clone())
  }

  fn required_transforms(&self) -> Vec<String> {
    vec![COPY.to_string()]
  }

  fn rules(
    &self,
    source: Arc<dyn Root>,
    target: Arc<dyn Root>,
    registry: &BuildRegistry,
  ) -> Result<Vec<Box<dyn BuildRule>>, BuildError> {
    let rule = TransformRule::new(
      source,
      Selector::new(self.source_filter()),
      registry.transform(COPY)?,
      target,
      self.text.clone(),
    )
    .with_prefix(Self::source_prefix(), PathId::root());
    Ok(vec![Box::new(rule) as Box<dyn BuildRule>])
  }
}

/// `path.join a b/c` -> `a/b/c`
fn join_ids(args: &[String]) -> Result<String, String> {
  let mut joined = PathId::root();
  for arg in args {
    let id = PathId::parse(arg).map_err(|e| e.to_string())?;
    joined = joined.join(&id);
  }
  Ok(joined.to_string())
}

/// `path.parent a/b/c` -> `a/b`
fn parent_id(args: &[String]) -> Result<String, String> {
  let [arg] = args else {
    return Err(format!("expected 1 argument, got {}", args.len()));
  };
  let id = PathId::parse(arg).map_err(|e| e.to_string())?;
  Ok(id.parent().map(|p| p.to_string()).unwrap_or_default())
}
