//! Top-level error type for the procspec CLI

use procspec_config::ConfigError;
use procspec_runner::{CommandError, LaunchError};
use thiserror::Error;

use crate::exit_codes::ExitCode;

#[derive(Error, Debug)]
pub enum ProcspecError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

impl ProcspecError {
    /// Exit code for this error.
    #[must_use]
    pub const fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Command(_) | Self::Launch(_) => ExitCode::LAUNCH_FAILURE,
            Self::Report(_) => ExitCode::INTERNAL,
        }
    }
}
