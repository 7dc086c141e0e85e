//! CLI entry point
//!
//! `run()` parses arguments, loads configuration, builds the descriptor and
//! either prints it or launches it. It handles all output, including errors.

use clap::Parser;
use tracing::{debug, warn};

use procspec_config::{Config, parse_signal};
use procspec_runner::{Ambient, CommandSpec, Launcher, NativeLauncher, SystemAmbient, UnpipedStdio};

use super::args::Cli;
use super::report::LaunchReport;
use crate::error::ProcspecError;
use crate::exit_codes::ExitCode;
use crate::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after printing the error; main.rs only maps the
/// code to the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    execute(&cli).map_err(|err| {
        eprintln!("error: {err}");
        err.to_exit_code()
    })
}

fn execute(cli: &Cli) -> Result<(), ProcspecError> {
    let base = Config::launcher_defaults(SystemAmbient.effective_uid());
    let mut config = match &cli.config {
        Some(path) => Config::load_over(path, base)?,
        None => Config::discover_over(base)?,
    };
    apply_overrides(&mut config, cli)?;
    debug!(source = ?config.source, "Effective configuration resolved");

    let mut spec = build_spec(&config, &cli.command, unpiped_stdio(cli));
    if spec.dir_source.is_fallback() {
        warn!("Launching in '.' because the working directory could not be read");
    }

    if !cli.dry_run {
        NativeLauncher.launch(&mut spec)?;
    }

    let report = LaunchReport::new(&spec, config.source.clone(), cli.dry_run);
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn build_spec(config: &Config, command: &[String], unpiped: UnpipedStdio) -> CommandSpec {
    // clap guarantees at least one element
    let (program, args) = command.split_first().map_or(("", &[][..]), |(p, a)| (p.as_str(), a));
    config
        .build_command(&SystemAmbient, program, args.iter().cloned())
        .unpiped(unpiped)
}

/// stdout carries the JSON report, so the child only shares it on request.
const fn unpiped_stdio(cli: &Cli) -> UnpipedStdio {
    if cli.inherit_stdio {
        UnpipedStdio::Inherit
    } else {
        UnpipedStdio::Null
    }
}

/// Apply CLI flags on top of file and default configuration.
pub fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), ProcspecError> {
    if let Some(dir) = &cli.dir {
        config.dir = Some(dir.clone());
    }
    if cli.clear_env {
        config.clear_env = true;
    }
    for (key, value) in &cli.env {
        config.env.insert(key.clone(), value.clone());
    }
    if let Some(mode) = cli.credential {
        config.credential = mode;
    }
    if cli.no_session {
        config.new_session = false;
    }
    if cli.allow_ctty {
        config.no_ctty = false;
    }
    if let Some(signal) = &cli.death_signal {
        config.parent_death_signal = parse_signal(signal)?;
    }
    Ok(())
}
