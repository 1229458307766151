//! Types for task execution.
//!
//! Configuration, the per-run report and the executor's error type.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::path::EntryKey;

/// Errors that stop a build before or while it runs.
///
/// Individual task failures are not errors at this level; they are recorded in
/// the [`BuildReport`].
#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error("cyclic task dependency: {cycle}")]
  CyclicDependency { cycle: String },

  #[error("{target} is produced by more than one task")]
  DuplicateTarget { target: String },

  #[error("no tokio runtime available to run the build")]
  NoRuntime,

  #[error("build coordinator failed: {0}")]
  Join(String),
}

/// How tasks are run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
  /// One task at a time in dependency order; the first failure aborts the rest.
  Sequential,
  /// Dependency waves on a bounded worker pool.
  #[default]
  Pooled,
}

impl fmt::Display for ExecutionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ExecutionMode::Sequential => write!(f, "sequential"),
      ExecutionMode::Pooled => write!(f, "pooled"),
    }
  }
}

impl FromStr for ExecutionMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "sequential" => Ok(ExecutionMode::Sequential),
      "pooled" => Ok(ExecutionMode::Pooled),
      other => Err(format!("unknown execution mode '{other}'")),
    }
  }
}

/// Configuration for build execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  pub mode: ExecutionMode,

  /// Maximum number of units running at once in pooled mode.
  pub parallelism: usize,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      mode: ExecutionMode::default(),
      parallelism: num_cpus(),
    }
  }
}

impl ExecuteConfig {
  pub fn sequential() -> Self {
    Self {
      mode: ExecutionMode::Sequential,
      ..Self::default()
    }
  }

  pub fn pooled(parallelism: usize) -> Self {
    Self {
      mode: ExecutionMode::Pooled,
      parallelism: parallelism.max(1),
    }
  }
}

/// Get the number of CPUs for default parallelism.
pub fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// A task that ran and failed.
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
  pub target: EntryKey,
  pub transform: String,
  pub error: String,
}

/// Outcome of one build run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
  /// Targets whose task ran successfully.
  pub built: Vec<EntryKey>,
  /// Targets newer than all of their sources.
  pub up_to_date: Vec<EntryKey>,
  pub failed: Vec<TaskFailure>,
  /// Targets never attempted because an earlier task failed.
  pub skipped: Vec<EntryKey>,
}

impl BuildReport {
  /// True when no task failed or was skipped.
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  /// Number of tasks accounted for.
  pub fn total(&self) -> usize {
    self.built.len() + self.up_to_date.len() + self.failed.len() + self.skipped.len()
  }
}
