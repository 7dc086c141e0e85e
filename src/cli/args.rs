//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use procspec_config::CredentialMode;

/// procspec - build and launch detached POSIX processes
#[derive(Parser, Debug)]
#[command(name = "procspec")]
#[command(about = "Build a process launch descriptor and start it detached")]
#[command(long_about = r#"
procspec builds a launch descriptor for PROGRAM (working directory, environment,
session, credential, parent-death signal, controlling terminal) and either
prints it as JSON or starts the process and prints its pid. It never waits for
the child.

procspec exits right after the launch, so by default the child gets no
parent-death signal and keeps running. Unless procspec runs as root, the child
also keeps the caller's identity. The child's standard streams are connected
to /dev/null so stdout carries only the report; --inherit-stdio shares them
instead.

EXAMPLES:
  # Show what would be launched
  procspec --dry-run -- echo hi

  # Launch a long-running job in its own session
  procspec -- ./worker --queue jobs

  # Kill the job if procspec dies before the launch completes
  procspec --death-signal TERM -- ./worker

CONFIGURATION:
  Precedence: CLI flags > config file > defaults
  The config file is discovered by searching upward from CWD for
  .procspec/config.toml, or named by PROCSPEC_CONFIG or --config.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Working directory for the child
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Set an environment variable for the child (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Start the child with an empty environment
    #[arg(long)]
    pub clear_env: bool,

    /// Credential mode: inherited, corrected, or none
    #[arg(long, value_name = "MODE")]
    pub credential: Option<CredentialMode>,

    /// Keep the child in the caller's session
    #[arg(long)]
    pub no_session: bool,

    /// Leave the child's controlling terminal alone
    #[arg(long)]
    pub allow_ctty: bool,

    /// Signal sent to the child when procspec exits (name, number, or "none")
    #[arg(long, value_name = "SIGNAL")]
    pub death_signal: Option<String>,

    /// Share procspec's stdin, stdout and stderr with the child
    #[arg(long)]
    pub inherit_stdio: bool,

    /// Print the descriptor without launching
    #[arg(long)]
    pub dry_run: bool,

    /// Program and arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "PROGRAM"
    )]
    pub command: Vec<String>,
}

fn parse_env_pair(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}
