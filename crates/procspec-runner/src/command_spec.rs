use std::os::fd::{BorrowedFd, OwnedFd};
use std::path::PathBuf;
use std::process::Child;
use tracing::debug;

use crate::ambient::{Ambient, SystemAmbient, resolve_working_dir};
use crate::attributes::{ProcessAttributes, default_process_attributes_with};
use crate::credential::CredentialPolicy;
use crate::error::CommandError;
use crate::pipe::PipePair;
use crate::types::{DirSource, Stream, UnpipedStdio};

// ============================================================================
// CommandSpec - Process Launch Descriptor
// ============================================================================

/// Description of a child process to launch.
///
/// A `CommandSpec` is a passive value: building it and allocating its pipes
/// never starts anything. A [`Launcher`](crate::Launcher) consumes it and
/// fills in [`process`](Self::process).
///
/// Construction snapshots the working directory and environment of the
/// calling process. Later changes to either are not reflected.
///
/// # Example
///
/// ```rust
/// use procspec_runner::CommandSpec;
///
/// let cmd = CommandSpec::new("echo", ["hi"]);
///
/// assert_eq!(cmd.program, "echo");
/// assert_eq!(cmd.args, vec!["hi".to_string()]);
/// assert!(cmd.attributes.new_session);
/// ```
#[derive(Debug)]
pub struct CommandSpec {
    /// The program to execute
    pub program: String,
    /// Positional arguments, program name excluded
    pub args: Vec<String>,
    /// Working directory for the child
    pub dir: PathBuf,
    /// Whether `dir` came from the lookup, the fallback, or the caller
    pub dir_source: DirSource,
    /// Environment as `KEY=VALUE` entries
    pub env: Vec<String>,
    /// Launch-time process attributes
    pub attributes: ProcessAttributes,
    /// What the child gets on streams without an allocated pipe
    pub unpiped: UnpipedStdio,
    pub(crate) stdin: PipePair,
    pub(crate) stdout: PipePair,
    pub(crate) stderr: PipePair,
    /// Running process, once a launcher has started it
    pub process: Option<Child>,
}

impl CommandSpec {
    /// Create a descriptor from the live process context.
    ///
    /// The working directory falls back to `"."` when it cannot be read;
    /// see [`dir_source`](Self::dir_source).
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_ambient(&SystemAmbient, program, args)
    }

    /// Create a descriptor from an explicit context, using the inherited
    /// credential policy.
    pub fn with_ambient<I, S>(ambient: &dyn Ambient, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_policy(ambient, CredentialPolicy::INHERITED, program, args)
    }

    /// Create a descriptor from an explicit context and credential policy.
    pub fn with_policy<I, S>(
        ambient: &dyn Ambient,
        policy: CredentialPolicy,
        program: impl Into<String>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dir = resolve_working_dir(ambient);
        let env = ambient.environ();
        let program = program.into();
        debug!(
            program = %program,
            dir = %dir.path.display(),
            env_entries = env.len(),
            "Created command descriptor"
        );

        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            dir: dir.path,
            dir_source: dir.source,
            env,
            attributes: default_process_attributes_with(ambient, policy),
            unpiped: UnpipedStdio::default(),
            stdin: PipePair::new(),
            stdout: PipePair::new(),
            stderr: PipePair::new(),
            process: None,
        }
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self.dir_source = DirSource::Explicit;
        self
    }

    /// Set an environment variable, replacing any existing entry for `key`.
    #[must_use]
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.set_env(key.as_ref(), value.as_ref());
        self
    }

    /// Set multiple environment variables.
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in envs {
            self.set_env(key.as_ref(), value.as_ref());
        }
        self
    }

    /// Drop every environment entry.
    #[must_use]
    pub fn env_clear(mut self) -> Self {
        self.env.clear();
        self
    }

    /// Replace the process attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: ProcessAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Choose what the child gets on streams without a pipe.
    #[must_use]
    pub fn unpiped(mut self, unpiped: UnpipedStdio) -> Self {
        self.unpiped = unpiped;
        self
    }

    /// Look up the value of `key` in the environment snapshot.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find_map(|entry| entry.split_once('=').filter(|(k, _)| *k == key).map(|(_, v)| v))
    }

    fn set_env(&mut self, key: &str, value: &str) {
        self.env
            .retain(|entry| entry.split_once('=').is_none_or(|(k, _)| k != key));
        self.env.push(format!("{key}={value}"));
    }

    /// Pipe pair backing `stream`.
    #[must_use]
    pub fn pipe(&self, stream: Stream) -> &PipePair {
        match stream {
            Stream::Stdin => &self.stdin,
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }

    #[must_use]
    pub fn stdin(&self) -> &PipePair {
        &self.stdin
    }

    #[must_use]
    pub fn stdout(&self) -> &PipePair {
        &self.stdout
    }

    #[must_use]
    pub fn stderr(&self) -> &PipePair {
        &self.stderr
    }

    fn pipe_mut(&mut self, stream: Stream) -> &mut PipePair {
        match stream {
            Stream::Stdin => &mut self.stdin,
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }

    /// Take the read end of `stream`'s pipe. The pipe stays allocated.
    pub fn take_read(&mut self, stream: Stream) -> Option<OwnedFd> {
        self.pipe_mut(stream).take_read()
    }

    /// Take the write end of `stream`'s pipe. The pipe stays allocated.
    pub fn take_write(&mut self, stream: Stream) -> Option<OwnedFd> {
        self.pipe_mut(stream).take_write()
    }

    /// Close the parent's copy of every end handed to the child.
    pub(crate) fn release_child_ends(&mut self) {
        for stream in Stream::ALL {
            self.pipe_mut(stream).release_child_end(stream);
        }
    }

    /// Allocate the pipe for `stream` and return its write end.
    ///
    /// # Errors
    ///
    /// - [`CommandError::AlreadyAllocated`] if either end is already set; the
    ///   existing ends are left untouched.
    /// - [`CommandError::PipeCreationFailed`] if the OS pipe call fails.
    pub fn new_pipe(&mut self, stream: Stream) -> Result<BorrowedFd<'_>, CommandError> {
        self.pipe_mut(stream).allocate(stream)
    }

    /// Allocate the stdin pipe. See [`new_pipe`](Self::new_pipe).
    pub fn new_stdin(&mut self) -> Result<BorrowedFd<'_>, CommandError> {
        self.new_pipe(Stream::Stdin)
    }

    /// Allocate the stdout pipe. See [`new_pipe`](Self::new_pipe).
    pub fn new_stdout(&mut self) -> Result<BorrowedFd<'_>, CommandError> {
        self.new_pipe(Stream::Stdout)
    }

    /// Allocate the stderr pipe. See [`new_pipe`](Self::new_pipe).
    pub fn new_stderr(&mut self) -> Result<BorrowedFd<'_>, CommandError> {
        self.new_pipe(Stream::Stderr)
    }

    /// Pid of the started process, if any.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(Child::id)
    }
}

/// Build a [`CommandSpec`] from a program and a variadic argument list.
///
/// ```rust
/// let cmd = procspec_runner::command!("echo", "hi", "there");
/// assert_eq!(cmd.args, vec!["hi", "there"]);
/// ```
#[macro_export]
macro_rules! command {
    ($program:expr $(, $arg:expr )* $(,)?) => {{
        let args: ::std::vec::Vec<::std::string::String> =
            ::std::vec![$( ::std::string::String::from($arg) ),*];
        $crate::CommandSpec::new($program, args)
    }};
}
