mod build;
mod modules;

use std::path::PathBuf;

use anyhow::{Context, Result};
use kiln_lib::builtin::{Registries, core_descriptor};
use kiln_lib::config::KilnConfig;
use kiln_lib::extension::ExtensionRegistry;
use kiln_lib::module::{ActivatorCatalog, LifecycleReport, ModuleManager};
use tracing::warn;

pub use build::{BuildArgs, cmd_build};
pub use modules::cmd_modules;

/// A started module set and the registries its modules contributed to.
pub struct Host {
  pub registries: Registries,
  pub manager: ModuleManager,
  pub report: LifecycleReport,
}

impl Drop for Host {
  fn drop(&mut self) {
    let report = self.manager.stop();
    for (id, error) in &report.failed {
      warn!(module = %id, error = %error, "module failed to stop");
    }
  }
}

/// Add the core module, discover modules in `extra` then the configured
/// locations, and start them all.
pub fn start_host(extra: &[PathBuf], config: &KilnConfig) -> Result<Host> {
  let registries = Registries::new();
  let mut extensions = ExtensionRegistry::new();
  registries
    .install(&mut extensions)
    .context("Failed to create host extension points")?;

  let mut manager = ModuleManager::new(ActivatorCatalog::with_builtins());
  manager.add_module(core_descriptor())?;

  let locations: Vec<PathBuf> = extra.iter().chain(&config.module_paths).cloned().collect();
  manager.discover(&locations).context("Module discovery failed")?;

  let report = manager.start(&mut extensions).context("Failed to start modules")?;
  for (id, error) in &report.failed {
    warn!(module = %id, error = %error, "module failed to activate");
  }

  Ok(Host {
    registries,
    manager,
    report,
  })
}
