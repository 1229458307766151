//! Implementation of the `kiln build` command.
//!
//! Starts the module set, assembles a project from the chosen build platform,
//! runs its stale tasks and writes the results back to the output directory.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use kiln_lib::build::BuildProject;
use kiln_lib::config::KilnConfig;
use kiln_lib::execute::{BuildReport, ExecuteConfig};
use serde::Serialize;
use tracing::{debug, info};

use super::start_host;
use crate::output::{
  OutputFormat, format_duration, plural, print_error, print_info, print_json, print_stat, print_success, symbols,
};

pub struct BuildArgs {
  pub dir: PathBuf,
  pub platform: Option<String>,
  pub output: Option<PathBuf>,
  pub sequential: bool,
  pub jobs: Option<usize>,
  pub module_paths: Vec<PathBuf>,
  pub format: OutputFormat,
  pub verbose: bool,
}

#[derive(Serialize)]
struct BuildOutcome<'a> {
  project: String,
  platform: &'a str,
  output: String,
  mode: String,
  report: &'a BuildReport,
}

/// Build the project at `args.dir`.
///
/// Fails when the project cannot be assembled or when any task failed or was
/// skipped; results of the tasks that did run are still written back.
pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let config = KilnConfig::from_env()?;
  let host = start_host(&args.module_paths, &config)?;

  let project_dir = dunce::canonicalize(&args.dir)
    .with_context(|| format!("Project directory not found: {}", args.dir.display()))?;
  let output_dir = args.output.clone().unwrap_or_else(|| config.output_dir_for(&project_dir));
  let platform_id = args.platform.clone().unwrap_or_else(|| config.platform.clone());

  let execute = if args.sequential {
    ExecuteConfig::sequential()
  } else {
    ExecuteConfig::pooled(args.jobs.unwrap_or(config.jobs))
  };

  let platform = host.registries.build.platform(&platform_id)?;
  let name = project_dir
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| "project".to_string());

  let mut project = BuildProject::from_platform(
    name.clone(),
    platform.as_ref(),
    &host.registries.build,
    &project_dir,
    &output_dir,
    &host.registries.content,
  )
  .with_context(|| format!("Failed to set up project '{name}'"))?;
  project.refresh().context("Failed to collect build tasks")?;
  debug!(tasks = project.tasks().len(), "project refreshed");

  let start = Instant::now();
  let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = runtime
    .block_on(async {
      let handle = project.build(&execute)?;
      Ok::<_, anyhow::Error>(handle.await?)
    })
    .context("Build failed")?;
  project.flush().context("Failed to write build outputs")?;
  let elapsed = start.elapsed();
  info!(built = report.built.len(), elapsed = %format_duration(elapsed), "build finished");

  if args.format.is_json() {
    print_json(&BuildOutcome {
      project: project_dir.display().to_string(),
      platform: &platform_id,
      output: output_dir.display().to_string(),
      mode: execute.mode.to_string(),
      report: &report,
    })?;
  } else {
    print_report(&report, &output_dir, args.verbose);
    println!();
    print_stat("Time", &format_duration(elapsed));
  }

  if !report.is_success() {
    bail!(
      "{} failed, {} skipped",
      plural(report.failed.len(), "task"),
      plural(report.skipped.len(), "task")
    );
  }
  Ok(())
}

fn print_report(report: &BuildReport, output_dir: &std::path::Path, verbose: bool) {
  if verbose {
    for target in &report.built {
      println!("  {} {}", symbols::SUCCESS, target);
    }
    for target in &report.up_to_date {
      println!("  {} {} (up to date)", symbols::INFO, target);
    }
  }
  for failure in &report.failed {
    print_error(&format!("{} {} {}", failure.target, symbols::ARROW, failure.error));
  }
  for target in &report.skipped {
    println!("  - {} (skipped)", target);
  }

  if report.built.is_empty() && report.failed.is_empty() {
    print_info("Nothing to build");
  } else if report.is_success() {
    print_success(&format!("Built {}", plural(report.built.len(), "target")));
  }

  print_stat("Output", &output_dir.display().to_string());
  print_stat("Built", &report.built.len().to_string());
  print_stat("Up to date", &report.up_to_date.len().to_string());
  if !report.is_success() {
    print_stat("Failed", &report.failed.len().to_string());
    print_stat("Skipped", &report.skipped.len().to_string());
  }
}
