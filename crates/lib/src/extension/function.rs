use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::{ExtensionError, ExtensionRegistry, Feature};
use crate::consts::FUNCTION_POINT;
use crate::util::{read, write};

/// Callable contributed through the function extension point.
pub type Function = Arc<dyn Fn(&[String]) -> Result<String, String> + Send + Sync>;

/// A named [`Function`].
#[derive(Clone)]
pub struct FunctionDef {
  name: String,
  function: Function,
}

impl FunctionDef {
  pub fn new<F>(name: impl Into<String>, function: F) -> Self
  where
    F: Fn(&[String]) -> Result<String, String> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      function: Arc::new(function),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Debug for FunctionDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FunctionDef").field("name", &self.name).finish()
  }
}

/// Functions callable by name, shared between clones.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
  functions: Arc<RwLock<BTreeMap<String, Function>>>,
}

impl FunctionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&self, def: FunctionDef) -> Result<(), ExtensionError> {
    let mut functions = write(&self.functions);
    if functions.contains_key(&def.name) {
      return Err(ExtensionError::Rejected {
        point: FUNCTION_POINT.to_string(),
        reason: format!("function '{}' is already registered", def.name),
      });
    }
    debug!(function = %def.name, "registered function");
    functions.insert(def.name, def.function);
    Ok(())
  }

  pub fn contains(&self, name: &str) -> bool {
    read(&self.functions).contains_key(name)
  }

  pub fn names(&self) -> Vec<String> {
    read(&self.functions).keys().cloned().collect()
  }

  /// Invoke function `name` with `args`.
  pub fn call(&self, name: &str, args: &[String]) -> Result<String, ExtensionError> {
    let function = read(&self.functions)
      .get(name)
      .cloned()
      .ok_or_else(|| ExtensionError::UnknownFunction(name.to_string()))?;

    function(args).map_err(|message| ExtensionError::FunctionFailed {
      name: name.to_string(),
      message,
    })
  }

  /// Create the function extension point, feeding registrations into this table.
  pub fn install(&self, extensions: &mut ExtensionRegistry) -> Result<(), ExtensionError> {
    let registry = self.clone();
    extensions.create(FUNCTION_POINT, move |feature| match feature {
      Feature::Function(def) => registry.register(def),
      other => Err(ExtensionError::TypeMismatch {
        point: FUNCTION_POINT.to_string(),
        expected: "function",
        found: other.kind(),
      }),
    })
  }
}
