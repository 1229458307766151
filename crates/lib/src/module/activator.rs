//! Activators and the catalog they are instantiated from.
//!
//! A module's manifest names its activator by string. Rather than loading
//! code at runtime, the host links activators in and lists them in an
//! [`ActivatorCatalog`] keyed by that string.

use std::collections::BTreeMap;

use super::{ModuleDescriptor, ModuleError};
use crate::extension::{ExtensionError, ExtensionRegistry, Feature};

/// What an activator sees while starting.
pub struct ModuleContext<'a> {
  descriptor: &'a ModuleDescriptor,
  extensions: &'a mut ExtensionRegistry,
}

impl<'a> ModuleContext<'a> {
  pub fn new(descriptor: &'a ModuleDescriptor, extensions: &'a mut ExtensionRegistry) -> Self {
    Self { descriptor, extensions }
  }

  pub fn descriptor(&self) -> &ModuleDescriptor {
    self.descriptor
  }

  pub fn extensions(&mut self) -> &mut ExtensionRegistry {
    &mut *self.extensions
  }

  /// Shorthand for registering against the shared extension registry.
  pub fn register(&mut self, point: &str, feature: Feature) -> Result<(), ExtensionError> {
    self.extensions.register(point, feature)
  }
}

/// Lifecycle hooks of a module.
pub trait Activator: Send {
  /// Contribute extension points and features.
  fn start(&mut self, context: &mut ModuleContext<'_>) -> Result<(), ModuleError>;

  /// Release whatever `start` acquired.
  fn stop(&mut self, _descriptor: &ModuleDescriptor) -> Result<(), ModuleError> {
    Ok(())
  }
}

pub type ActivatorFactory = Box<dyn Fn() -> Box<dyn Activator> + Send + Sync>;

/// Activator reference to factory table.
#[derive(Default)]
pub struct ActivatorCatalog {
  factories: BTreeMap<String, ActivatorFactory>,
}

impl ActivatorCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Catalog preloaded with the activators shipped in this crate.
  pub fn with_builtins() -> Self {
    let mut catalog = Self::new();
    crate::builtin::register_activators(&mut catalog);
    catalog
  }

  /// Add or replace the factory for `reference`.
  pub fn register<F>(&mut self, reference: impl Into<String>, factory: F)
  where
    F: Fn() -> Box<dyn Activator> + Send + Sync + 'static,
  {
    self.factories.insert(reference.into(), Box::new(factory));
  }

  pub fn contains(&self, reference: &str) -> bool {
    self.factories.contains_key(reference)
  }

  pub fn references(&self) -> Vec<String> {
    self.factories.keys().cloned().collect()
  }

  pub fn instantiate(&self, reference: &str) -> Option<Box<dyn Activator>> {
    self.factories.get(reference).map(|factory| factory())
  }
}
