use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::activator::{Activator, ActivatorCatalog, ModuleContext};
use super::manifest::read_archive;
use super::resolve::resolve_order;
use super::{LifecycleReport, ModuleDescriptor, ModuleError, ModuleState, ModuleSummary};
use crate::consts::MODULE_ARCHIVE_EXTENSIONS;
use crate::extension::ExtensionRegistry;

struct ModuleRecord {
  descriptor: ModuleDescriptor,
  state: ModuleState,
  activator: Option<Box<dyn Activator>>,
  error: Option<String>,
}

/// Discovers, orders, activates and stops modules.
///
/// Typical use:
///
/// ```no_run
/// # fn main() -> Result<(), kiln_lib::module::ModuleError> {
/// use std::path::PathBuf;
///
/// use kiln_lib::extension::ExtensionRegistry;
/// use kiln_lib::module::{ActivatorCatalog, ModuleManager};
///
/// let mut manager = ModuleManager::new(ActivatorCatalog::with_builtins());
/// manager.discover(&[PathBuf::from("/opt/kiln/modules")])?;
/// let mut extensions = ExtensionRegistry::new();
/// manager.start(&mut extensions)?;
/// # Ok(())
/// # }
/// ```
pub struct ModuleManager {
  catalog: ActivatorCatalog,
  modules: Vec<ModuleRecord>,
  order: Option<Vec<usize>>,
  activated: Vec<usize>,
}

impl ModuleManager {
  pub fn new(catalog: ActivatorCatalog) -> Self {
    Self {
      catalog,
      modules: Vec::new(),
      order: None,
      activated: Vec::new(),
    }
  }

  /// Add a statically linked module.
  pub fn add_module(&mut self, descriptor: ModuleDescriptor) -> Result<(), ModuleError> {
    if let Some(existing) = self.modules.iter().find(|m| m.descriptor.id() == descriptor.id()) {
      return Err(ModuleError::DuplicateModule {
        id: descriptor.id().to_string(),
        first: origin(&existing.descriptor),
        second: origin(&descriptor),
      });
    }

    debug!(module = %descriptor, "module discovered");
    self.modules.push(ModuleRecord {
      descriptor,
      state: ModuleState::Discovered,
      activator: None,
      error: None,
    });
    self.order = None;
    Ok(())
  }

  /// Scan each location, non-recursively, for module archives.
  ///
  /// Locations and archives that cannot be read are logged and skipped. A
  /// manifest that is present but malformed aborts discovery. Returns the
  /// number of modules added.
  pub fn discover(&mut self, locations: &[PathBuf]) -> Result<usize, ModuleError> {
    let mut added = 0;

    for location in locations {
      let mut archives = match list_archives(location) {
        Ok(archives) => archives,
        Err(e) => {
          warn!(location = %location.display(), error = %e, "skipping unreadable module location");
          continue;
        }
      };
      archives.sort();

      for archive in archives {
        match read_archive(&archive) {
          Ok(descriptor) => {
            self.add_module(descriptor)?;
            added += 1;
          }
          Err(e) if e.is_skippable() => {
            warn!(archive = %archive.display(), error = %e, "skipping module archive");
          }
          Err(e) => return Err(e),
        }
      }
    }

    info!(added, total = self.modules.len(), "module discovery complete");
    Ok(added)
  }

  /// Compute the activation order. Returns module ids in that order.
  pub fn resolve(&mut self) -> Result<Vec<String>, ModuleError> {
    let descriptors: Vec<ModuleDescriptor> = self.modules.iter().map(|m| m.descriptor.clone()).collect();
    let order = resolve_order(&descriptors)?;

    for &index in &order {
      let record = &mut self.modules[index];
      if record.state == ModuleState::Discovered {
        record.state = ModuleState::Ordered;
      }
    }

    let ids: Vec<String> = order.iter().map(|&i| self.modules[i].descriptor.id().to_string()).collect();
    debug!(order = ?ids, "resolved module order");
    self.order = Some(order);
    Ok(ids)
  }

  /// Activate every ordered module, dependencies first.
  ///
  /// Resolution errors are returned before any activator runs. Activation
  /// failures are logged and recorded, and the remaining modules still start.
  pub fn start(&mut self, extensions: &mut ExtensionRegistry) -> Result<LifecycleReport, ModuleError> {
    if self.order.is_none() {
      self.resolve()?;
    }
    let order = self.order.clone().unwrap_or_default();

    let mut report = LifecycleReport::default();

    for index in order {
      if self.modules[index].state != ModuleState::Ordered {
        continue;
      }

      let failed_dependencies: Vec<String> = self.modules[index]
        .descriptor
        .dependencies()
        .iter()
        .filter(|dep| {
          self
            .modules
            .iter()
            .any(|m| m.descriptor.id() == dep.id() && m.state == ModuleState::Failed)
        })
        .map(|dep| dep.id().to_string())
        .collect();

      let record = &mut self.modules[index];
      let module = record.descriptor.id().to_string();
      if !failed_dependencies.is_empty() {
        warn!(module = %module, dependencies = ?failed_dependencies, "dependencies failed to activate");
      }

      match activate(&self.catalog, &record.descriptor, extensions) {
        Ok(activator) => {
          info!(module = %record.descriptor, "module activated");
          record.activator = Some(activator);
          record.state = ModuleState::Activated;
          self.activated.push(index);
          report.succeeded.push(module);
        }
        Err(e) => {
          error!(module = %module, error = %e, "module activation failed");
          record.state = ModuleState::Failed;
          record.error = Some(e.to_string());
          report.failed.push((module, e.to_string()));
        }
      }
    }

    Ok(report)
  }

  /// Stop activated modules in reverse activation order.
  ///
  /// A failing stop hook is logged and does not prevent the others from running.
  pub fn stop(&mut self) -> LifecycleReport {
    let mut report = LifecycleReport::default();

    while let Some(index) = self.activated.pop() {
      let record = &mut self.modules[index];
      let module = record.descriptor.id().to_string();

      if let Some(mut activator) = record.activator.take() {
        match activator.stop(&record.descriptor) {
          Ok(()) => report.succeeded.push(module.clone()),
          Err(e) => {
            warn!(module = %module, error = %e, "module stop hook failed");
            report.failed.push((module.clone(), e.to_string()));
          }
        }
      }

      record.state = ModuleState::Deactivated;
      debug!(module = %module, "module deactivated");
    }

    report
  }

  pub fn descriptor(&self, id: &str) -> Option<&ModuleDescriptor> {
    self.find(id).map(|m| &m.descriptor)
  }

  pub fn state(&self, id: &str) -> Option<ModuleState> {
    self.find(id).map(|m| m.state)
  }

  /// All known modules, in activation order once resolved, else discovery order.
  pub fn modules(&self) -> Vec<ModuleSummary> {
    let indices: Vec<usize> = match &self.order {
      Some(order) => order.clone(),
      None => (0..self.modules.len()).collect(),
    };

    indices
      .into_iter()
      .map(|index| {
        let record = &self.modules[index];
        let descriptor = &record.descriptor;
        ModuleSummary {
          id: descriptor.id().to_string(),
          name: descriptor.name().to_string(),
          version: descriptor.version().to_string(),
          state: record.state,
          location: descriptor.location().map(Path::to_path_buf),
          dependencies: descriptor.dependencies().iter().map(ToString::to_string).collect(),
          error: record.error.clone(),
        }
      })
      .collect()
  }

  fn find(&self, id: &str) -> Option<&ModuleRecord> {
    self.modules.iter().find(|m| m.descriptor.id() == id)
  }
}

impl Drop for ModuleManager {
  fn drop(&mut self) {
    if !self.activated.is_empty() {
      self.stop();
    }
  }
}

fn activate(
  catalog: &ActivatorCatalog,
  descriptor: &ModuleDescriptor,
  extensions: &mut ExtensionRegistry,
) -> Result<Box<dyn Activator>, ModuleError> {
  let mut activator = catalog
    .instantiate(descriptor.activator())
    .ok_or_else(|| ModuleError::UnknownActivator {
      module: descriptor.id().to_string(),
      activator: descriptor.activator().to_string(),
    })?;

  extensions.begin();
  let started = activator.start(&mut ModuleContext::new(descriptor, extensions));
  match started {
    Ok(()) => extensions.commit()?,
    Err(e) => {
      extensions.rollback();
      return Err(e);
    }
  }
  Ok(activator)
}

fn list_archives(location: &Path) -> std::io::Result<Vec<PathBuf>> {
  let mut archives = Vec::new();
  for entry in fs::read_dir(location)? {
    let path = entry?.path();
    let is_archive = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| MODULE_ARCHIVE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)));
    if is_archive && path.is_file() {
      archives.push(path);
    }
  }
  Ok(archives)
}

fn origin(descriptor: &ModuleDescriptor) -> String {
  match descriptor.location() {
    Some(location) => location.display().to_string(),
    None => "built-in".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use std::fs::File;
  use std::io::Write;
  use std::sync::{Arc, Mutex};

  use tempfile::TempDir;
  use tracing_test::traced_test;
  use zip::write::SimpleFileOptions;

  use super::*;
  use crate::consts::MODULE_MANIFEST_PATH;
  use crate::extension::{ExtensionError, Feature, FunctionDef};
  use crate::version::{Dependency, SemanticVersion};

  type Journal = Arc<Mutex<Vec<String>>>;

  /// Records its lifecycle calls and optionally creates or uses a point.
  struct Recording {
    journal: Journal,
    creates: Option<&'static str>,
    uses: Option<&'static str>,
    fail_stop: bool,
  }

  impl Activator for Recording {
    fn start(&mut self, context: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
      let id = context.descriptor().id().to_string();
      self.journal.lock().unwrap().push(format!("start {id}"));
      if let Some(point) = self.uses {
        context.register(point, Feature::Function(crate::extension::FunctionDef::new(id.clone(), |_| Ok(String::new()))))?;
      }
      if let Some(point) = self.creates {
        context.extensions().create(point, |_| Ok(()))?;
      }
      Ok(())
    }

    fn stop(&mut self, descriptor: &ModuleDescriptor) -> Result<(), ModuleError> {
      self.journal.lock().unwrap().push(format!("stop {}", descriptor.id()));
      if self.fail_stop {
        return Err(ModuleError::Activation {
          module: descriptor.id().to_string(),
          reason: "stop failed".to_string(),
        });
      }
      Ok(())
    }
  }

  fn catalog(journal: &Journal) -> ActivatorCatalog {
    let mut catalog = ActivatorCatalog::new();
    for (name, creates, uses, fail_stop) in [
      ("plain", None, None, false),
      ("provider", Some("widgets"), None, false),
      ("consumer", None, Some("widgets"), false),
      ("broken-stop", None, None, true),
    ] {
      let journal = journal.clone();
      catalog.register(name, move || {
        Box::new(Recording {
          journal: journal.clone(),
          creates,
          uses,
          fail_stop,
        })
      });
    }
    catalog
  }

  fn v(s: &str) -> SemanticVersion {
    SemanticVersion::parse(s).unwrap()
  }

  fn write_module(dir: &Path, file: &str, manifest: &str) -> PathBuf {
    let path = dir.join(file);
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    zip.start_file(MODULE_MANIFEST_PATH, SimpleFileOptions::default()).unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    zip.finish().unwrap();
    path
  }

  fn manifest(id: &str, version: &str, activator: &str, requires: Option<&str>) -> String {
    let mut text = format!("Bundle-SymbolicName: {id}\nBundle-Version: {version}\nBundle-Activator: {activator}\n");
    if let Some(requires) = requires {
      text.push_str(&format!("Require-Bundle: {requires}\n"));
    }
    text
  }

  #[test]
  fn a_starts_before_b() {
    let journal = Journal::default();
    let mut manager = ModuleManager::new(catalog(&journal));
    manager
      .add_module(
        ModuleDescriptor::new("B", v("1.0.0"), "plain").with_dependency(Dependency::new("A").at_least(v("1.0.0"))),
      )
      .unwrap();
    manager.add_module(ModuleDescriptor::new("A", v("1.2.0"), "plain")).unwrap();

    assert_eq!(manager.resolve().unwrap(), vec!["A", "B"]);

    let mut extensions = ExtensionRegistry::new();
    let report = manager.start(&mut extensions).unwrap();
    assert_eq!(report.succeeded, vec!["A", "B"]);
    assert_eq!(*journal.lock().unwrap(), vec!["start A", "start B"]);
    assert_eq!(manager.state("A"), Some(ModuleState::Activated));
  }

  #[test]
  fn stop_runs_in_reverse_and_tolerates_failures() {
    let journal = Journal::default();
    let mut manager = ModuleManager::new(catalog(&journal));
    manager.add_module(ModuleDescriptor::new("a", v("1.0.0"), "plain")).unwrap();
    manager
      .add_module(ModuleDescriptor::new("b", v("1.0.0"), "broken-stop").with_dependency(Dependency::new("a")))
      .unwrap();
    manager
      .add_module(ModuleDescriptor::new("c", v("1.0.0"), "plain").with_dependency(Dependency::new("b")))
      .unwrap();

    manager.start(&mut ExtensionRegistry::new()).unwrap();
    journal.lock().unwrap().clear();

    let report = manager.stop();
    assert_eq!(*journal.lock().unwrap(), vec!["stop c", "stop b", "stop a"]);
    assert_eq!(report.succeeded, vec!["c", "a"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(manager.state("b"), Some(ModuleState::Deactivated));

    assert!(manager.stop().succeeded.is_empty());
  }

  #[test]
  fn drop_stops_active_modules() {
    let journal = Journal::default();
    {
      let mut manager = ModuleManager::new(catalog(&journal));
      manager.add_module(ModuleDescriptor::new("a", v("1.0.0"), "plain")).unwrap();
      manager.start(&mut ExtensionRegistry::new()).unwrap();
    }
    assert_eq!(*journal.lock().unwrap(), vec!["start a", "stop a"]);
  }

  #[test]
  #[traced_test]
  fn failed_module_leaves_its_points_absent() {
    let journal = Journal::default();
    let mut manager = ModuleManager::new(catalog(&journal));
    manager.add_module(ModuleDescriptor::new("provider", v("1.0.0"), "no.such.Activator")).unwrap();
    manager
      .add_module(ModuleDescriptor::new("consumer", v("1.0.0"), "consumer").with_dependency(Dependency::new("provider")))
      .unwrap();
    manager.add_module(ModuleDescriptor::new("bystander", v("1.0.0"), "plain")).unwrap();

    let mut extensions = ExtensionRegistry::new();
    let report = manager.start(&mut extensions).unwrap();

    assert_eq!(report.succeeded, vec!["bystander"]);
    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["provider", "consumer"]);
    assert!(report.failed[1].1.contains("unknown extension point 'widgets'"));
    assert!(!extensions.contains("widgets"));
    assert_eq!(manager.state("consumer"), Some(ModuleState::Failed));

    assert!(logs_contain("module activation failed"));
    assert!(logs_contain("dependencies failed to activate"));
  }

  /// Creates a point and feeds a host point, then fails.
  struct HalfStart;

  impl Activator for HalfStart {
    fn start(&mut self, context: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
      context.extensions().create("widgets", |_| Ok(()))?;
      context.register("host", Feature::Function(FunctionDef::new("half", |_| Ok(String::new()))))?;
      Err(ModuleError::Activation {
        module: context.descriptor().id().to_string(),
        reason: "boom".to_string(),
      })
    }
  }

  #[test]
  fn failed_start_rolls_back_its_changes() {
    let journal = Journal::default();
    let mut catalog = catalog(&journal);
    catalog.register("half", || Box::new(HalfStart));
    let mut manager = ModuleManager::new(catalog);
    manager.add_module(ModuleDescriptor::new("p", v("1.0.0"), "half")).unwrap();
    manager
      .add_module(ModuleDescriptor::new("consumer", v("1.0.0"), "consumer").with_dependency(Dependency::new("p")))
      .unwrap();

    let received = Arc::new(Mutex::new(0));
    let sink = received.clone();
    let mut extensions = ExtensionRegistry::new();
    extensions
      .create("host", move |_| {
        *sink.lock().unwrap() += 1;
        Ok(())
      })
      .unwrap();

    let report = manager.start(&mut extensions).unwrap();

    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["p", "consumer"]);
    assert!(report.failed[0].1.contains("boom"));
    assert!(report.failed[1].1.contains("unknown extension point 'widgets'"));
    assert!(!extensions.contains("widgets"));
    assert_eq!(*received.lock().unwrap(), 0);
  }

  #[test]
  fn provider_points_are_visible_to_consumers() {
    let journal = Journal::default();
    let mut manager = ModuleManager::new(catalog(&journal));
    manager.add_module(ModuleDescriptor::new("provider", v("1.0.0"), "provider")).unwrap();
    manager
      .add_module(ModuleDescriptor::new("consumer", v("1.0.0"), "consumer").with_dependency(Dependency::new("provider")))
      .unwrap();

    let mut extensions = ExtensionRegistry::new();
    let report = manager.start(&mut extensions).unwrap();
    assert!(report.is_success());
    assert!(extensions.contains("widgets"));
  }

  #[test]
  fn resolution_errors_stop_activation_entirely() {
    let journal = Journal::default();
    let mut manager = ModuleManager::new(catalog(&journal));
    manager
      .add_module(ModuleDescriptor::new("a", v("1.0.0"), "plain").with_dependency(Dependency::new("b")))
      .unwrap();
    manager
      .add_module(ModuleDescriptor::new("b", v("1.0.0"), "plain").with_dependency(Dependency::new("a")))
      .unwrap();

    let err = manager.start(&mut ExtensionRegistry::new()).unwrap_err();
    assert!(matches!(err, ModuleError::CyclicDependency { .. }));
    assert!(journal.lock().unwrap().is_empty());
  }

  #[test]
  fn duplicate_module_is_rejected() {
    let mut manager = ModuleManager::new(ActivatorCatalog::new());
    manager.add_module(ModuleDescriptor::new("a", v("1.0.0"), "x")).unwrap();
    let err = manager.add_module(ModuleDescriptor::new("a", v("2.0.0"), "x")).unwrap_err();
    assert!(matches!(err, ModuleError::DuplicateModule { .. }));
  }

  #[test]
  #[traced_test]
  fn discovers_archives_and_skips_unreadable_input() {
    let temp = TempDir::new().unwrap();
    write_module(temp.path(), "a.jar", &manifest("a", "1.2.0", "plain", None));
    write_module(
      temp.path(),
      "b.zip",
      &manifest("b", "1.0.0", "plain", Some("a;bundle-version=\"1.0.0\"")),
    );
    std::fs::write(temp.path().join("corrupt.zip"), b"garbage").unwrap();
    std::fs::write(temp.path().join("notes.txt"), b"not a module").unwrap();
    std::fs::create_dir(temp.path().join("nested.zip")).unwrap();

    let journal = Journal::default();
    let mut manager = ModuleManager::new(catalog(&journal));
    let added = manager
      .discover(&[temp.path().to_path_buf(), temp.path().join("does-not-exist")])
      .unwrap();

    assert_eq!(added, 2);
    assert!(logs_contain("skipping module archive"));
    assert!(logs_contain("skipping unreadable module location"));

    let a = manager.descriptor("a").unwrap();
    assert_eq!(a.location(), Some(temp.path().join("a.jar").as_path()));
    assert_eq!(manager.resolve().unwrap(), vec!["a", "b"]);

    let summaries = manager.modules();
    assert_eq!(summaries[1].dependencies, vec!["a >= 1.0.0"]);
    assert_eq!(summaries[1].state, ModuleState::Ordered);
  }

  #[test]
  fn malformed_manifest_aborts_discovery() {
    let temp = TempDir::new().unwrap();
    write_module(temp.path(), "bad.jar", "Bundle-SymbolicName: bad\nBundle-Version: one\nBundle-Activator: x\n");

    let mut manager = ModuleManager::new(ActivatorCatalog::new());
    let err = manager.discover(&[temp.path().to_path_buf()]).unwrap_err();
    assert!(matches!(err, ModuleError::MalformedVersion { .. }));
  }

  #[test]
  fn unknown_point_from_activator_surfaces_as_extension_error() {
    let err: ModuleError = ExtensionError::UnknownPoint("X".into()).into();
    assert_eq!(err.to_string(), "unknown extension point 'X'");
  }
}
