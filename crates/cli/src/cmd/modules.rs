//! Implementation of the `kiln modules` command.

use std::path::PathBuf;

use anyhow::Result;
use kiln_lib::config::KilnConfig;
use kiln_lib::module::ModuleState;
use owo_colors::{OwoColorize, Stream};

use super::start_host;
use crate::output::{self, OutputFormat, plural, print_json, print_success, print_warning};

/// Start every discoverable module and list the outcome.
///
/// Activation failures are listed but do not fail the command.
pub fn cmd_modules(module_paths: &[PathBuf], format: OutputFormat) -> Result<()> {
  let config = KilnConfig::from_env()?;
  let host = start_host(module_paths, &config)?;
  let modules = host.manager.modules();

  if format.is_json() {
    return print_json(&modules);
  }

  for module in &modules {
    let symbol = match module.state {
      ModuleState::Activated => output::symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
      ModuleState::Failed => output::symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
      _ => output::symbols::INFO.to_string(),
    };
    println!(
      "{} {} {} {}",
      symbol,
      module.id,
      module.version,
      format!("({})", module.name).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    for dependency in &module.dependencies {
      println!("    {} {}", output::symbols::ARROW, dependency);
    }
    if let Some(error) = &module.error {
      println!("    {}", error.if_supports_color(Stream::Stdout, |s| s.red()));
    }
  }

  println!();
  let activated = host.report.succeeded.len();
  print_success(&format!("{} activated", plural(activated, "module")));
  if !host.report.failed.is_empty() {
    print_warning(&format!("{} failed to activate", plural(host.report.failed.len(), "module")));
  }
  Ok(())
}
