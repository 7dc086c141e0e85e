//! Launch descriptors for POSIX child processes
//!
//! A [`CommandSpec`] collects everything needed to start a child: program,
//! arguments, working directory, environment, pipe-backed standard streams and
//! the [`ProcessAttributes`] the child is started with (new session,
//! credential, parent-death signal, no controlling terminal).
//!
//! Building a descriptor never starts a process. A [`Launcher`] does that, and
//! [`CommandSpec::to_command`] is the single point where attributes become
//! system calls.
//!
//! # Security Model
//!
//! Arguments are passed argv-style as discrete elements. No shell string
//! evaluation happens anywhere in this crate.

#[cfg(not(unix))]
compile_error!("procspec-runner only supports POSIX targets");

pub mod ambient;
pub mod attributes;
pub mod command_spec;
pub mod credential;
pub mod error;
pub mod launch;
pub mod pipe;
pub mod process;
pub mod types;

pub use ambient::{Ambient, FALLBACK_DIR, StaticAmbient, SystemAmbient, WorkingDir};
pub use attributes::{
    DEFAULT_PARENT_DEATH_SIGNAL, ProcessAttributes, default_process_attributes,
    default_process_attributes_with,
};
pub use command_spec::CommandSpec;
pub use credential::{Credential, CredentialPolicy, GroupFill, UidSource};
pub use error::{CommandError, LaunchError};
pub use pipe::PipePair;
pub use process::{Launcher, NativeLauncher};
pub use types::{DirSource, Stream, UnpipedStdio};

pub use nix::sys::signal::Signal;
