//! procspec - launch descriptors for detached POSIX child processes
//!
//! procspec builds a description of a child process (program, arguments,
//! working directory, environment, pipe-backed standard streams) together with
//! the OS-level attributes it is started with: a new session, a credential,
//! a parent-death signal and no controlling terminal.
//!
//! It can be used in two ways:
//! - **CLI**: `procspec [OPTIONS] -- PROGRAM [ARGS]...` prints the descriptor
//!   as JSON (`--dry-run`) or launches it and prints the pid
//! - **Library**: build a [`CommandSpec`] and hand it to a [`Launcher`]
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use procspec::{CommandSpec, Launcher, NativeLauncher};
//!
//! let mut cmd = CommandSpec::new("my-daemon", ["--foreground"]);
//! cmd.new_stdout().expect("stdout pipe");
//!
//! let pid = NativeLauncher.launch(&mut cmd).expect("launch");
//! println!("started {pid}");
//! ```

pub mod cli;
pub mod error;
pub mod exit_codes;
pub mod logging;

pub use error::ProcspecError;
pub use exit_codes::ExitCode;

pub use procspec_config::{Config, ConfigError, ConfigSource, CredentialMode};
pub use procspec_runner::{
    Ambient, CommandError, CommandSpec, Credential, CredentialPolicy, DirSource, LaunchError,
    Launcher, NativeLauncher, PipePair, ProcessAttributes, Signal, StaticAmbient, Stream,
    SystemAmbient, UnpipedStdio, default_process_attributes, default_process_attributes_with,
};
