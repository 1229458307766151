//! Build task execution.
//!
//! This module runs the tasks of a build project. It handles:
//! - ordering tasks so producers finish before their consumers start
//! - skipping tasks whose target is newer than all of their sources
//! - sequential or pooled execution of task units on the blocking pool
//! - recording derivation edges for successful tasks
//!
//! Task failures never abort the coordinator: they are collected in the
//! [`BuildReport`], and tasks not attempted afterwards are reported as skipped.

mod order;
mod types;

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::build::{BuildGraph, BuildTask, TaskError, Unit};
use crate::util::lock;

pub use order::{order_tasks, task_waves};
pub use types::{BuildReport, ExecuteConfig, ExecuteError, ExecutionMode, TaskFailure, num_cpus};

/// A running build.
///
/// Await it for the [`BuildReport`]. Dropping the handle does not stop work
/// that was already submitted.
pub struct BuildHandle {
  inner: JoinHandle<Result<BuildReport, ExecuteError>>,
}

impl BuildHandle {
  pub fn is_finished(&self) -> bool {
    self.inner.is_finished()
  }
}

impl Future for BuildHandle {
  type Output = Result<BuildReport, ExecuteError>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    Pin::new(&mut self.inner)
      .poll(cx)
      .map(|joined| joined.unwrap_or_else(|e| Err(ExecuteError::Join(e.to_string()))))
  }
}

/// Spawn the execution of `tasks` onto the current tokio runtime.
pub fn spawn_build(
  tasks: Vec<BuildTask>,
  graph: Arc<Mutex<BuildGraph>>,
  config: ExecuteConfig,
) -> Result<BuildHandle, ExecuteError> {
  let runtime = Handle::try_current().map_err(|_| ExecuteError::NoRuntime)?;
  let inner = runtime.spawn(execute_tasks(tasks, graph, config));
  Ok(BuildHandle { inner })
}

/// Execute `tasks` to completion.
///
/// Tasks are (re)ordered first, so a cyclic or conflicting task set fails
/// before anything runs.
pub async fn execute_tasks(
  tasks: Vec<BuildTask>,
  graph: Arc<Mutex<BuildGraph>>,
  config: ExecuteConfig,
) -> Result<BuildReport, ExecuteError> {
  let tasks = order_tasks(tasks)?;
  info!(task_count = tasks.len(), mode = %config.mode, "starting task execution");

  let report = match config.mode {
    ExecutionMode::Sequential => run_sequential(&tasks, &graph).await,
    ExecutionMode::Pooled => run_pooled(&tasks, &graph, config.parallelism).await?,
  };

  info!(
    built = report.built.len(),
    up_to_date = report.up_to_date.len(),
    failed = report.failed.len(),
    skipped = report.skipped.len(),
    "task execution complete"
  );

  Ok(report)
}

/// Run tasks one by one. The first failure aborts the remainder.
async fn run_sequential(tasks: &[BuildTask], graph: &Mutex<BuildGraph>) -> BuildReport {
  let mut report = BuildReport::default();
  let mut aborted = false;

  for task in tasks {
    if aborted {
      warn!(task = %task, "skipping task after earlier failure");
      report.skipped.push(task.target().key());
      continue;
    }
    if !lock(graph).needs_build(task) {
      debug!(task = %task, "task up to date");
      report.up_to_date.push(task.target().key());
      continue;
    }

    let outcome = match prepare(task).await {
      Ok(unit) => tokio::task::spawn_blocking(move || run_unit(unit))
        .await
        .unwrap_or_else(|e| Err(TaskError::Failed(e.to_string()))),
      Err(e) => Err(e),
    };
    aborted = !record(&mut report, graph, task, outcome);
  }

  report
}

/// Run tasks wave by wave on the blocking pool, at most `parallelism` at once.
///
/// The staleness check and initialisation happen when a task is submitted,
/// not when its wave starts. After the first failure nothing new is
/// submitted, while units already running are allowed to finish.
async fn run_pooled(
  tasks: &[BuildTask],
  graph: &Mutex<BuildGraph>,
  parallelism: usize,
) -> Result<BuildReport, ExecuteError> {
  let waves = task_waves(tasks)?;
  debug!(wave_count = waves.len(), parallelism, "computed execution waves");

  let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
  let failed = Arc::new(AtomicBool::new(false));
  let mut report = BuildReport::default();

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, tasks = wave.len(), "executing wave");
    let mut join_set: JoinSet<(usize, Result<(), TaskError>)> = JoinSet::new();

    for &idx in wave {
      let task = &tasks[idx];

      while let Some(joined) = join_set.try_join_next() {
        collect(&mut report, graph, tasks, joined)?;
      }
      if failed.load(Ordering::SeqCst) {
        warn!(task = %task, "skipping task after earlier failure");
        report.skipped.push(task.target().key());
        continue;
      }
      if !lock(graph).needs_build(task) {
        debug!(task = %task, "task up to date");
        report.up_to_date.push(task.target().key());
        continue;
      }

      let permit = semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ExecuteError::Join(e.to_string()))?;
      if failed.load(Ordering::SeqCst) {
        warn!(task = %task, "skipping task after earlier failure");
        report.skipped.push(task.target().key());
        continue;
      }

      let unit = match prepare(task).await {
        Ok(unit) => unit,
        Err(e) => {
          failed.store(true, Ordering::SeqCst);
          record(&mut report, graph, task, Err(e));
          continue;
        }
      };

      let failed = failed.clone();
      join_set.spawn_blocking(move || {
        let _permit = permit;
        let outcome = run_unit(unit);
        if outcome.is_err() {
          failed.store(true, Ordering::SeqCst);
        }
        (idx, outcome)
      });
    }

    while let Some(joined) = join_set.join_next().await {
      collect(&mut report, graph, tasks, joined)?;
    }
  }

  Ok(report)
}

fn collect(
  report: &mut BuildReport,
  graph: &Mutex<BuildGraph>,
  tasks: &[BuildTask],
  joined: Result<(usize, Result<(), TaskError>), JoinError>,
) -> Result<(), ExecuteError> {
  let (idx, outcome) = joined.map_err(|e| {
    error!(error = %e, "task worker was cancelled");
    ExecuteError::Join(e.to_string())
  })?;
  record(report, graph, &tasks[idx], outcome);
  Ok(())
}

/// Record a finished task. Returns whether it succeeded.
fn record(report: &mut BuildReport, graph: &Mutex<BuildGraph>, task: &BuildTask, outcome: Result<(), TaskError>) -> bool {
  match outcome {
    Ok(()) => {
      info!(task = %task, "task succeeded");
      lock(graph).record_task(task);
      report.built.push(task.target().key());
      true
    }
    Err(e) => {
      error!(task = %task, error = %e, "task failed");
      report.failed.push(TaskFailure {
        target: task.target().key(),
        transform: task.transform_id().to_string(),
        error: e.to_string(),
      });
      false
    }
  }
}

/// Initialise `task` on the blocking pool; transforms read their sources here.
async fn prepare(task: &BuildTask) -> Result<Unit, TaskError> {
  let task = task.clone();
  tokio::task::spawn_blocking(move || {
    catch_unwind(AssertUnwindSafe(|| task.initialise()))
      .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))))
  })
  .await
  .unwrap_or_else(|e| Err(TaskError::Failed(e.to_string())))
}

fn run_unit(unit: Unit) -> Result<(), TaskError> {
  match catch_unwind(AssertUnwindSafe(unit)) {
    Ok(Ok(true)) => Ok(()),
    Ok(Ok(false)) => Err(TaskError::Unsuccessful),
    Ok(Err(e)) => Err(e),
    Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
