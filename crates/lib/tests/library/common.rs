//! Shared helpers for library integration tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use kiln_lib::consts::MODULE_MANIFEST_PATH;
use zip::write::SimpleFileOptions;

/// Write a module archive holding only a manifest.
pub fn write_module(dir: &Path, file: &str, manifest: &str) -> PathBuf {
  let path = dir.join(file);
  let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
  zip.start_file(MODULE_MANIFEST_PATH, SimpleFileOptions::default()).unwrap();
  zip.write_all(manifest.as_bytes()).unwrap();
  zip.finish().unwrap();
  path
}

pub fn manifest(id: &str, version: &str, activator: &str, requires: Option<&str>) -> String {
  let mut text = format!(
    "Manifest-Version: 1.0\nBundle-SymbolicName: {id}\nBundle-Version: {version}\nBundle-Activator: {activator}\n"
  );
  if let Some(requires) = requires {
    text.push_str(&format!("Require-Bundle: {requires}\n"));
  }
  text
}

/// Write `content` to `relative` under `base`, creating parent directories.
pub fn write_file(base: &Path, relative: &str, content: &str) -> PathBuf {
  let path = base.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

/// Set a file's modification time to `age` before now.
pub fn age_file(path: &Path, age: Duration) {
  let file = File::options().write(true).open(path).unwrap();
  file.set_modified(SystemTime::now() - age).unwrap();
}
