//! Module discovery, resolution and activation.

use std::sync::{Arc, Mutex};

use kiln_lib::builtin::{CORE_ACTIVATOR, Registries};
use kiln_lib::extension::{ExtensionError, ExtensionRegistry, Feature, FunctionDef};
use kiln_lib::module::{Activator, ActivatorCatalog, ModuleContext, ModuleError, ModuleManager, ModuleState};
use tempfile::TempDir;

use super::common::{manifest, write_module};

type Journal = Arc<Mutex<Vec<String>>>;

/// Creates `<id>.hooks` and registers against the points named in `uses`.
struct Hooked {
  journal: Journal,
  uses: Vec<&'static str>,
}

impl Activator for Hooked {
  fn start(&mut self, context: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
    let id = context.descriptor().id().to_string();
    self.journal.lock().unwrap().push(id.clone());

    for point in &self.uses {
      context.register(point, Feature::Function(FunctionDef::new(format!("{id}.hook"), |_| Ok(String::new()))))?;
    }

    let journal = self.journal.clone();
    context.extensions().create(&format!("{id}.hooks"), move |feature| {
      journal.lock().unwrap().push(format!("received {}", feature.kind()));
      Ok(())
    })?;
    Ok(())
  }
}

fn catalog(journal: &Journal) -> ActivatorCatalog {
  let mut catalog = ActivatorCatalog::with_builtins();
  for (reference, uses) in [("a.Activator", vec![]), ("b.Activator", vec!["a.hooks"])] {
    let journal = journal.clone();
    catalog.register(reference, move || {
      Box::new(Hooked {
        journal: journal.clone(),
        uses: uses.clone(),
      })
    });
  }
  catalog
}

#[test]
fn discovered_modules_activate_dependencies_first() {
  let temp = TempDir::new().unwrap();
  write_module(
    temp.path(),
    "b.jar",
    &manifest("B", "1.0.0", "b.Activator", Some("A;bundle-version=\"1.0.0\"")),
  );
  write_module(temp.path(), "a.zip", &manifest("A", "1.2.0", "a.Activator", None));
  std::fs::write(temp.path().join("notes.txt"), "not a module").unwrap();

  let journal = Journal::default();
  let mut manager = ModuleManager::new(catalog(&journal));
  assert_eq!(manager.discover(&[temp.path().to_path_buf()]).unwrap(), 2);
  assert_eq!(manager.resolve().unwrap(), vec!["A", "B"]);

  let mut extensions = ExtensionRegistry::new();
  let report = manager.start(&mut extensions).unwrap();

  assert!(report.is_success(), "{report:?}");
  assert_eq!(*journal.lock().unwrap(), vec!["A", "B", "received function"]);
  assert!(extensions.contains("a.hooks"));
  assert!(extensions.contains("b.hooks"));
}

#[test]
fn registering_against_an_unknown_point_fails() {
  let mut extensions = ExtensionRegistry::new();
  let err = extensions
    .register("X", Feature::Function(FunctionDef::new("f", |_| Ok(String::new()))))
    .unwrap_err();
  assert!(matches!(err, ExtensionError::UnknownPoint(ref point) if point == "X"));
}

#[test]
fn failed_provider_leaves_its_points_absent() {
  let temp = TempDir::new().unwrap();
  write_module(temp.path(), "a.zip", &manifest("A", "1.2.0", "missing.Activator", None));
  write_module(temp.path(), "b.zip", &manifest("B", "1.0.0", "b.Activator", Some("A")));
  write_module(temp.path(), "core.zip", &manifest("kiln.core", "0.3.0", CORE_ACTIVATOR, None));

  let registries = Registries::new();
  let mut extensions = ExtensionRegistry::new();
  registries.install(&mut extensions).unwrap();

  let journal = Journal::default();
  let mut manager = ModuleManager::new(catalog(&journal));
  manager.discover(&[temp.path().to_path_buf()]).unwrap();
  let report = manager.start(&mut extensions).unwrap();

  let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
  assert_eq!(failed, vec!["A", "B"]);
  assert!(report.failed[1].1.contains("unknown extension point 'a.hooks'"), "{report:?}");
  assert_eq!(report.succeeded, vec!["kiln.core"]);
  assert_eq!(manager.state("B"), Some(ModuleState::Failed));
  assert!(registries.build.platform("copy").is_ok());
}

#[test]
fn cycles_are_reported_by_name() {
  let temp = TempDir::new().unwrap();
  write_module(temp.path(), "a.zip", &manifest("A", "1.0.0", "a.Activator", Some("B")));
  write_module(temp.path(), "b.zip", &manifest("B", "1.0.0", "b.Activator", Some("A")));

  let mut manager = ModuleManager::new(ActivatorCatalog::new());
  manager.discover(&[temp.path().to_path_buf()]).unwrap();

  let err = manager.resolve().unwrap_err();
  assert!(matches!(err, ModuleError::CyclicDependency { .. }));
  let message = err.to_string();
  assert!(message.contains("A -> B -> A"), "{message}");
}

#[test]
fn incompatible_versions_are_fatal() {
  let temp = TempDir::new().unwrap();
  write_module(temp.path(), "a.zip", &manifest("A", "0.9.0", "a.Activator", None));
  write_module(
    temp.path(),
    "b.zip",
    &manifest("B", "1.0.0", "b.Activator", Some("A;bundle-version=\"[1.0.0,2.0.0]\"")),
  );

  let mut manager = ModuleManager::new(ActivatorCatalog::new());
  manager.discover(&[temp.path().to_path_buf()]).unwrap();
  assert!(matches!(
    manager.start(&mut ExtensionRegistry::new()),
    Err(ModuleError::IncompatibleVersion { .. })
  ));
}

#[test]
fn module_summaries_serialize() {
  let temp = TempDir::new().unwrap();
  write_module(temp.path(), "a.zip", &manifest("A", "1.2.0", "a.Activator", None));

  let journal = Journal::default();
  let mut manager = ModuleManager::new(catalog(&journal));
  manager.discover(&[temp.path().to_path_buf()]).unwrap();
  manager.start(&mut ExtensionRegistry::new()).unwrap();

  let json = serde_json::to_value(manager.modules()).unwrap();
  assert_eq!(json[0]["id"], "A");
  assert_eq!(json[0]["version"], "1.2.0");
  assert_eq!(json[0]["state"], "activated");
}
