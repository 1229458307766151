mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, cmd_build, cmd_modules};
use output::{OutputFormat, print_error};

/// kiln - module-driven incremental builds
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Additional module search location (repeatable, searched before KILN_MODULE_PATH)
  #[arg(short = 'm', long = "module-path", global = true)]
  module_paths: Vec<PathBuf>,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Discover and activate modules, then list them
  Modules,

  /// Build a project directory with a build platform
  Build {
    /// Project directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Build platform id (default: KILN_PLATFORM, then "copy")
    #[arg(short, long)]
    platform: Option<String>,

    /// Output directory (default: KILN_OUTPUT_DIR, then <dir>/target)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run tasks one at a time, stopping at the first failure
    #[arg(long)]
    sequential: bool,

    /// Worker pool size (default: KILN_JOBS, then available parallelism)
    #[arg(short, long)]
    jobs: Option<usize>,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .with_target(cli.verbose)
    .init();

  let result = match cli.command {
    Commands::Modules => cmd_modules(&cli.module_paths, cli.format),
    Commands::Build {
      dir,
      platform,
      output,
      sequential,
      jobs,
    } => cmd_build(BuildArgs {
      dir,
      platform,
      output,
      sequential,
      jobs,
      module_paths: cli.module_paths,
      format: cli.format,
      verbose: cli.verbose,
    }),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
