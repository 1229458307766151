//! Shared test helpers for CLI integration tests.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Isolated test environment.
///
/// Each test gets its own project, module and data directories.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Project directory handed to `kiln build`.
  pub fn project_path(&self) -> PathBuf {
    let p = self.temp.path().join("project");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Module search location.
  pub fn modules_path(&self) -> PathBuf {
    let p = self.temp.path().join("modules");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn data_path(&self) -> PathBuf {
    let p = self.temp.path().join("data");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Write a file relative to the project directory.
  pub fn write_source(&self, relative_path: &str, content: &str) {
    let path = self.project_path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn read_output(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.project_path().join("target").join(relative_path)).unwrap()
  }

  /// Write a module archive whose manifest names `activator`.
  pub fn write_module(&self, id: &str, version: &str, activator: &str, requires: Option<&str>) {
    let mut manifest = format!(
      "Manifest-Version: 1.0\nBundle-SymbolicName: {id}\nBundle-Version: {version}\nBundle-Activator: {activator}\n"
    );
    if let Some(requires) = requires {
      manifest.push_str(&format!("Require-Bundle: {requires}\n"));
    }

    let path = self.modules_path().join(format!("{id}.jar"));
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default()).unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    zip.finish().unwrap();
  }

  /// Get a pre-configured Command for the kiln binary.
  ///
  /// Points `KILN_MODULE_PATH` and the data directories into the test
  /// directory and clears the other `KILN_*` settings.
  pub fn kiln_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("kiln");
    cmd.env("KILN_MODULE_PATH", self.modules_path());
    cmd.env("XDG_DATA_HOME", self.data_path());
    cmd.env("APPDATA", self.data_path());
    cmd.env_remove("KILN_PLATFORM");
    cmd.env_remove("KILN_OUTPUT_DIR");
    cmd.env_remove("KILN_JOBS");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
