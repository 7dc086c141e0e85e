//! Error types for runner module

use crate::types::Stream;
use thiserror::Error;

/// Errors raised while wiring a command descriptor
#[derive(Error, Debug)]
pub enum CommandError {
    /// The targeted pipe pair already has a read or write end.
    /// Callers can treat this as "stream already configured".
    #[error("{stream} pipe already allocated")]
    AlreadyAllocated { stream: Stream },

    /// The OS refused to create the pipe. Nothing on the descriptor changed.
    #[error("failed to create {stream} pipe: {source}")]
    PipeCreationFailed {
        stream: Stream,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    /// The stream the failed operation targeted.
    #[must_use]
    pub const fn stream(&self) -> Stream {
        match self {
            Self::AlreadyAllocated { stream } | Self::PipeCreationFailed { stream, .. } => *stream,
        }
    }
}

/// Errors raised when a descriptor is turned into a running process
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("process already started (pid {pid})")]
    AlreadyStarted { pid: u32 },

    #[error("failed to duplicate {stream} pipe handle: {source}")]
    HandleDuplication {
        stream: Stream,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
