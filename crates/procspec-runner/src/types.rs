//! Types shared across the runner modules

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three standard streams of a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdin,
    Stdout,
    Stderr,
}

impl Stream {
    /// All streams in descriptor order.
    pub const ALL: [Self; 3] = [Self::Stdin, Self::Stdout, Self::Stderr];

    /// Convert stream to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    /// Whether the child reads from this stream (as opposed to writing to it).
    #[must_use]
    pub const fn is_child_input(&self) -> bool {
        matches!(self, Self::Stdin)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a descriptor's working directory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirSource {
    /// The current-directory lookup succeeded
    Lookup,
    /// The lookup failed and `"."` was used instead
    Fallback,
    /// The caller set the directory explicitly
    Explicit,
}

impl DirSource {
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// What a child gets on a standard stream that has no allocated pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnpipedStdio {
    /// Share the parent's stream
    #[default]
    Inherit,
    /// Connect the stream to `/dev/null`
    Null,
}
