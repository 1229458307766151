//! Build projects over real directories.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use kiln_lib::build::{BuildProject, TaskError, Transform, TransformRule, Unit};
use kiln_lib::builtin::{COPY, Registries, core_descriptor};
use kiln_lib::content::{ContentRegistry, ContentType};
use kiln_lib::execute::ExecuteConfig;
use kiln_lib::extension::ExtensionRegistry;
use kiln_lib::module::{ActivatorCatalog, ModuleManager};
use kiln_lib::path::{DirectoryRoot, Entry, Filter, PathId, Root};
use tempfile::TempDir;

use super::common::{age_file, write_file};

/// Reverses the bytes of its single source.
struct Reverse;

impl Transform for Reverse {
  fn id(&self) -> &str {
    "reverse"
  }

  fn initialise(&self, sources: &[Entry], target: &Entry) -> Result<Unit, TaskError> {
    let mut bytes = sources[0].read_bytes()?;
    bytes.reverse();
    let target = target.clone();
    Ok(Box::new(move || {
      target.write_bytes(bytes)?;
      Ok(true)
    }))
  }
}

fn id(s: &str) -> PathId {
  PathId::parse(s).unwrap()
}

struct Fixture {
  _temp: TempDir,
  project: BuildProject,
  root: Arc<DirectoryRoot>,
  bin: ContentType,
}

/// A directory holding `foo.src` and an older `bin/foo.bin`, with a rule mapping `*.src` to `bin/*.bin`.
fn fixture() -> Fixture {
  let temp = TempDir::new().unwrap();
  let source = write_file(temp.path(), "foo.src", "hello");
  let target = write_file(temp.path(), "bin/foo.bin", "stale");
  age_file(&target, Duration::from_secs(120));
  age_file(&source, Duration::from_secs(60));

  let content = ContentRegistry::new();
  let src = ContentType::text("source", "src");
  let bin = ContentType::binary("object", "bin");
  content.register(src.clone()).unwrap();
  content.register(bin.clone()).unwrap();

  let root = Arc::new(DirectoryRoot::open("project", temp.path(), content).unwrap());
  let mut project = BuildProject::new("fixture");
  project.add_root(root.clone()).unwrap();
  project.add_rule(Box::new(
    TransformRule::new(root.clone(), Filter::of_type(src), Arc::new(Reverse), root.clone(), bin.clone())
      .with_prefix(PathId::root(), id("bin")),
  ));

  Fixture {
    _temp: temp,
    project,
    root,
    bin,
  }
}

#[tokio::test]
async fn newer_source_makes_target_stale_until_built() {
  let mut f = fixture();
  f.project.refresh().unwrap();

  let tasks = f.project.tasks().to_vec();
  assert_eq!(tasks.len(), 1);
  assert_eq!(tasks[0].target().to_string(), "bin/foo.bin");
  assert!(tasks[0].is_stale());

  let report = f.project.build(&ExecuteConfig::default()).unwrap().await.unwrap();
  assert_eq!(report.built.len(), 1);
  f.project.flush().unwrap();
  f.project.refresh().unwrap();

  let task = &f.project.tasks()[0];
  let source_time = task.sources()[0].last_modified().unwrap();
  let target_time = task.target().last_modified().unwrap();
  assert!(target_time >= source_time);
  assert!(!task.is_stale());
  assert_eq!(fs::read(f.root.base().join("bin/foo.bin")).unwrap(), b"olleh");

  let again = f.project.build(&ExecuteConfig::sequential()).unwrap().await.unwrap();
  assert!(again.built.is_empty());
  assert_eq!(again.up_to_date.len(), 1);
}

#[test]
fn refresh_without_changes_is_idempotent() {
  let mut f = fixture();
  f.project.refresh().unwrap();
  let first = f.project.tasks().to_vec();
  f.project.refresh().unwrap();
  f.project.refresh().unwrap();
  assert_eq!(first, f.project.tasks());
}

#[test]
fn flushed_edits_survive_a_fresh_root() {
  let f = fixture();
  let entry = f.root.create(&id("bin/extra"), &f.bin).unwrap();
  entry.write_bytes(vec![1, 2, 3]).unwrap();
  f.project.flush().unwrap();

  let reopened = DirectoryRoot::open("again", f.root.base(), ContentRegistry::new()).unwrap();
  assert!(reopened.get(&id("bin/extra"), &f.bin).is_none(), "unregistered suffixes are ignored");
  assert_eq!(fs::read(f.root.base().join("bin/extra.bin")).unwrap(), vec![1, 2, 3]);

  f.root.refresh().unwrap();
  assert_eq!(f.root.get(&id("bin/extra"), &f.bin).unwrap().read_bytes().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn copy_platform_builds_a_project() {
  let registries = Registries::new();
  let mut extensions = ExtensionRegistry::new();
  registries.install(&mut extensions).unwrap();
  let mut manager = ModuleManager::new(ActivatorCatalog::with_builtins());
  manager.add_module(core_descriptor()).unwrap();
  assert!(manager.start(&mut extensions).unwrap().is_success());

  let temp = TempDir::new().unwrap();
  write_file(temp.path(), "src/greeting.txt", "hi");
  write_file(temp.path(), "src/docs/readme.txt", "read me");
  write_file(temp.path(), "notes.txt", "not copied");
  let output = temp.path().join("target");

  let platform = registries.build.platform(COPY).unwrap();
  let mut project = BuildProject::from_platform(
    "copy-test",
    platform.as_ref(),
    &registries.build,
    temp.path(),
    &output,
    &registries.content,
  )
  .unwrap();
  project.refresh().unwrap();
  assert_eq!(project.tasks().len(), 2);

  let report = project.build(&ExecuteConfig::pooled(2)).unwrap().await.unwrap();
  assert!(report.is_success(), "{report:?}");
  project.flush().unwrap();

  assert_eq!(fs::read_to_string(output.join("greeting.txt")).unwrap(), "hi");
  assert_eq!(fs::read_to_string(output.join("docs/readme.txt")).unwrap(), "read me");
  assert!(!output.join("notes.txt").exists());
}
