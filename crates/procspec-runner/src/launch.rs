//! Translation of a [`CommandSpec`] into a native command
//!
//! This is the only place the platform-neutral [`ProcessAttributes`] turn into
//! system calls. They run in the forked child, before exec, in this order:
//!
//! 1. `setsid()` for a new session
//! 2. `setgroups`, `setgid`, `setuid` for the credential
//! 3. `prctl(PR_SET_PDEATHSIG)` on Linux (after the credential switch, which
//!    would otherwise clear it)
//! 4. `ioctl(0, TIOCNOTTY)` to drop the controlling terminal

use std::io;
use std::os::fd::BorrowedFd;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::attributes::ProcessAttributes;
use crate::command_spec::CommandSpec;
use crate::credential::Credential;
use crate::error::LaunchError;
use crate::types::{Stream, UnpipedStdio};

impl CommandSpec {
    /// Convert this descriptor into a `std::process::Command`.
    ///
    /// The child gets exactly the `env` entries of the descriptor. Allocated
    /// pipes are wired child-side (read end on stdin, write end on stdout and
    /// stderr) through duplicates; the descriptor keeps its own ends. Streams
    /// without a pipe follow [`CommandSpec::unpiped`].
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::HandleDuplication`] if a pipe end cannot be
    /// duplicated for the child.
    pub fn to_command(&self) -> Result<Command, LaunchError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.dir).env_clear();

        for entry in &self.env {
            match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    cmd.env(key, value);
                }
                _ => debug!(entry = %entry, "Skipping malformed environment entry"),
            }
        }

        for stream in Stream::ALL {
            let stdio = match (self.child_end(stream), self.unpiped) {
                (Some(fd), _) => fd
                    .try_clone_to_owned()
                    .map(Stdio::from)
                    .map_err(|source| LaunchError::HandleDuplication { stream, source })?,
                (None, UnpipedStdio::Inherit) => continue,
                (None, UnpipedStdio::Null) => Stdio::null(),
            };
            match stream {
                Stream::Stdin => cmd.stdin(stdio),
                Stream::Stdout => cmd.stdout(stdio),
                Stream::Stderr => cmd.stderr(stdio),
            };
        }

        apply_attributes(&mut cmd, &self.attributes);
        Ok(cmd)
    }

    /// Convert this descriptor into a `tokio::process::Command`.
    ///
    /// # Errors
    ///
    /// Same as [`to_command`](Self::to_command).
    pub fn to_tokio_command(&self) -> Result<TokioCommand, LaunchError> {
        Ok(TokioCommand::from(self.to_command()?))
    }

    /// The end of `stream`'s pipe that belongs to the child.
    fn child_end(&self, stream: Stream) -> Option<BorrowedFd<'_>> {
        let pair = self.pipe(stream);
        if stream.is_child_input() {
            pair.read()
        } else {
            pair.write()
        }
    }
}

/// Everything the child does between fork and exec. Built in the parent so
/// the hook itself never allocates.
#[derive(Debug, Clone)]
struct ChildSetup {
    new_session: bool,
    credential: Option<Credential>,
    parent_death_signal: Option<libc::c_int>,
    parent_pid: u32,
    no_ctty: bool,
}

impl ChildSetup {
    fn from_attributes(attributes: &ProcessAttributes) -> Self {
        Self {
            new_session: attributes.new_session,
            credential: attributes.credential.clone(),
            parent_death_signal: attributes.parent_death_signal.map(|signal| signal as libc::c_int),
            parent_pid: std::process::id(),
            no_ctty: attributes.no_ctty,
        }
    }

    fn is_noop(&self) -> bool {
        !self.new_session
            && self.credential.is_none()
            && self.parent_death_signal.is_none()
            && !self.no_ctty
    }

    /// Runs in the child. Only async-signal-safe calls are allowed here.
    fn run(&self) -> io::Result<()> {
        if self.new_session {
            check(unsafe { libc::setsid() })?;
        }

        if let Some(cred) = &self.credential {
            check(unsafe { libc::setgroups(cred.groups.len() as _, cred.groups.as_ptr()) })?;
            check(unsafe { libc::setgid(cred.gid) })?;
            check(unsafe { libc::setuid(cred.uid) })?;
        }

        #[cfg(any(target_os = "linux", target_os = "android"))]
        if let Some(signal) = self.parent_death_signal {
            check(unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, signal as libc::c_ulong) })?;
            // The parent may have exited before prctl took effect
            if unsafe { libc::getppid() } as u32 != self.parent_pid {
                unsafe { libc::kill(libc::getpid(), signal) };
            }
        }

        if self.no_ctty && unsafe { libc::ioctl(0, libc::TIOCNOTTY as _) } == -1 {
            let err = io::Error::last_os_error();
            // fd 0 is not our controlling terminal: nothing to detach
            if err.raw_os_error() != Some(libc::ENOTTY) {
                return Err(err);
            }
        }

        Ok(())
    }
}

fn check(ret: libc::c_int) -> io::Result<()> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// `setgroups` needs CAP_SETGID even for an empty list, so any credential
/// switch by a non-root caller is expected to fail.
fn credential_needs_privileges(euid: u32) -> bool {
    euid != 0
}

fn apply_attributes(cmd: &mut Command, attributes: &ProcessAttributes) {
    let setup = ChildSetup::from_attributes(attributes);
    if setup.is_noop() {
        return;
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    if let Some(signal) = attributes.parent_death_signal {
        warn!(?signal, "Parent-death signal is not supported on this platform; ignoring");
    }

    if let Some(cred) = &setup.credential {
        let euid = nix::unistd::geteuid().as_raw();
        if credential_needs_privileges(euid) {
            warn!(
                euid,
                uid = cred.uid,
                gid = cred.gid,
                groups = ?cred.groups,
                "Child will switch credentials; setgroups needs privileges the caller lacks"
            );
        }
    }

    // SAFETY: `ChildSetup::run` only issues raw syscalls on data owned by the
    // closure and does not allocate.
    unsafe {
        cmd.pre_exec(move || setup.run());
    }
}
