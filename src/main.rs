//! Strata
//!
//! Builds container images from layered configuration by dispatching the
//! registered command tree.

use anyhow::{Context, Result};
use clap::FromArgMatches;
use std::fs::OpenOptions;
use strata::cli::{self, Cli, Invocation};
use strata::commands::{Orchestrator, Outcome, Registry, dump};
use strata::config::ConfigPaths;
use strata::error::CommandResult;
use strata::tools::Toolbox;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let registry = Registry::with_builtins().context("invalid built-in command table")?;
    let matches = cli::build_command(&registry)?.get_matches();
    let args = Cli::from_arg_matches(&matches)?;

    init_logging(args.verbose, &args.log)?;

    let toolbox = Toolbox::system();
    let result = cli::parse_invocation(&registry, &matches)
        .and_then(|invocation| execute(&registry, &toolbox, &invocation));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
    Ok(())
}

/// Initialize logging based on `--verbose` and `--log`.
///
/// `RUST_LOG` takes precedence over the level selected by `--verbose`.
fn init_logging(verbose: bool, log: &str) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
    };

    match log {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("cannot open log file '{}'", filename))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn execute(registry: &Registry, toolbox: &Toolbox, invocation: &Invocation) -> CommandResult<()> {
    debug!(command = %invocation.command, mode = ?invocation.mode, "Invoking");

    let paths = ConfigPaths::discover(&invocation.config_file)?;
    let mut orchestrator = Orchestrator::new(registry, toolbox, &invocation.command)?;
    orchestrator.setup(paths)?;

    match orchestrator.execute(invocation.mode)? {
        Outcome::Artifact(path) => println!("Result: {}", path.display()),
        Outcome::Image(alias) => println!("Result: image {}", alias),
        Outcome::Report(report) => print!("{}", dump(&report)?),
        Outcome::Removed(removed) if removed.is_empty() => println!("Nothing to clean."),
        Outcome::Removed(removed) => {
            for item in removed {
                println!("Removed {}.", item);
            }
        }
    }
    Ok(())
}
