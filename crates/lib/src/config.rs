//! Environment-driven configuration.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `KILN_MODULE_PATH` | module search locations (platform path list) | `<data dir>/kiln/modules` |
//! | `KILN_PLATFORM` | default build platform | `copy` |
//! | `KILN_OUTPUT_DIR` | build output directory | `<project>/target` |
//! | `KILN_JOBS` | worker pool size | available parallelism |
//!
//! Command-line flags take precedence over all of these.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::builtin::COPY;
use crate::consts::{APP_NAME, JOBS_ENV, MODULE_PATH_ENV, OUTPUT_DIR_ENV, PLATFORM_ENV};
use crate::execute::num_cpus;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{var} must be a positive integer, got '{value}'")]
  InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KilnConfig {
  pub module_paths: Vec<PathBuf>,
  pub platform: String,
  /// Explicit output directory. `None` means `<project>/target`.
  pub output_dir: Option<PathBuf>,
  pub jobs: usize,
}

impl KilnConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let module_paths = match env::var_os(MODULE_PATH_ENV) {
      Some(value) if !value.is_empty() => env::split_paths(&value).collect(),
      _ => data_dir().map(|dir| vec![dir.join("modules")]).unwrap_or_default(),
    };

    let platform = env::var(PLATFORM_ENV)
      .ok()
      .filter(|value| !value.is_empty())
      .unwrap_or_else(|| COPY.to_string());

    let output_dir = env::var_os(OUTPUT_DIR_ENV)
      .filter(|value| !value.is_empty())
      .map(PathBuf::from);

    let jobs = match env::var(JOBS_ENV) {
      Ok(value) => match value.trim().parse::<usize>() {
        Ok(jobs) if jobs > 0 => jobs,
        _ => return Err(ConfigError::InvalidNumber { var: JOBS_ENV, value }),
      },
      Err(_) => num_cpus(),
    };

    Ok(Self {
      module_paths,
      platform,
      output_dir,
      jobs,
    })
  }

  /// Output directory for a project rooted at `project`.
  pub fn output_dir_for(&self, project: &Path) -> PathBuf {
    self.output_dir.clone().unwrap_or_else(|| project.join("target"))
  }
}

/// Per-user data directory of the application.
#[cfg(windows)]
pub fn data_dir() -> Option<PathBuf> {
  env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join(APP_NAME))
}

/// Per-user data directory of the application.
#[cfg(not(windows))]
pub fn data_dir() -> Option<PathBuf> {
  let data_home = env::var_os("XDG_DATA_HOME")
    .filter(|value| !value.is_empty())
    .map(PathBuf::from)
    .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))?;
  Some(data_home.join(APP_NAME))
}
