//! Pipe endpoint pairs backing a descriptor's standard streams

use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use tracing::debug;

use crate::error::CommandError;
use crate::types::Stream;

/// Read and write ends of one anonymous pipe.
///
/// A pair starts empty and is allocated at most once; there is no way back to
/// empty. Handing an end out with [`take_read`](Self::take_read) or
/// [`take_write`](Self::take_write) leaves the pair allocated. The pair owns
/// the ends it still holds and closes them when dropped.
#[derive(Debug)]
pub struct PipePair {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
    allocated: bool,
}

impl PipePair {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            read: None,
            write: None,
            allocated: false,
        }
    }

    /// Read end, if allocated and still held.
    #[must_use]
    pub fn read(&self) -> Option<BorrowedFd<'_>> {
        self.read.as_ref().map(AsFd::as_fd)
    }

    /// Write end, if allocated and still held.
    #[must_use]
    pub fn write(&self) -> Option<BorrowedFd<'_>> {
        self.write.as_ref().map(AsFd::as_fd)
    }

    /// True until the pipe has been allocated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.allocated
    }

    /// Take ownership of the read end. The pair stays allocated.
    pub fn take_read(&mut self) -> Option<OwnedFd> {
        self.read.take()
    }

    /// Take ownership of the write end. The pair stays allocated.
    pub fn take_write(&mut self) -> Option<OwnedFd> {
        self.write.take()
    }

    /// Create the pipe for `stream` and return its write end.
    pub(crate) fn allocate(&mut self, stream: Stream) -> Result<BorrowedFd<'_>, CommandError> {
        if self.allocated {
            return Err(CommandError::AlreadyAllocated { stream });
        }

        let (read, write) =
            open_pipe().map_err(|source| CommandError::PipeCreationFailed { stream, source })?;
        debug!(%stream, read = ?read, write = ?write, "Allocated pipe");

        self.allocated = true;
        self.read = Some(read);
        let write: &OwnedFd = self.write.insert(write);
        Ok(write.as_fd())
    }

    /// Close the end that was handed to the child of `stream`.
    ///
    /// Called once the child holds its own duplicate, so the parent's reader
    /// sees EOF when the child exits.
    pub(crate) fn release_child_end(&mut self, stream: Stream) {
        let end = if stream.is_child_input() {
            self.read.take()
        } else {
            self.write.take()
        };
        if end.is_some() {
            debug!(%stream, "Closed child end of pipe in parent");
        }
    }
}

/// Open a close-on-exec pipe, returning `(read, write)`.
#[cfg(not(target_vendor = "apple"))]
fn open_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::OFlag;

    Ok(nix::unistd::pipe2(OFlag::O_CLOEXEC)?)
}

#[cfg(target_vendor = "apple")]
fn open_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use std::os::fd::AsRawFd;

    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok((read, write))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{Read, Write};
    use std::os::fd::AsRawFd;

    #[test]
    fn test_new_pair_is_empty() {
        let pair = PipePair::new();
        assert!(pair.is_empty());
        assert!(pair.read().is_none());
        assert!(pair.write().is_none());
    }

    #[test]
    fn test_allocate_fills_both_ends() {
        let mut pair = PipePair::new();
        let write_fd = pair.allocate(Stream::Stdout).unwrap().as_raw_fd();

        let read = pair.read().unwrap().as_raw_fd();
        let write = pair.write().unwrap().as_raw_fd();
        assert_eq!(write, write_fd);
        assert_ne!(read, write);
    }

    #[test]
    fn test_second_allocation_rejected() {
        let mut pair = PipePair::new();
        pair.allocate(Stream::Stdin).unwrap();
        let before = (pair.read().unwrap().as_raw_fd(), pair.write().unwrap().as_raw_fd());

        let err = pair.allocate(Stream::Stdin).unwrap_err();
        assert!(matches!(err, CommandError::AlreadyAllocated { stream: Stream::Stdin }));

        let after = (pair.read().unwrap().as_raw_fd(), pair.write().unwrap().as_raw_fd());
        assert_eq!(before, after);
    }

    #[test]
    fn test_pipe_carries_data() {
        let mut pair = PipePair::new();
        pair.allocate(Stream::Stdout).unwrap();
        let read = pair.take_read();
        let write = pair.take_write();

        let mut writer = File::from(write.unwrap());
        writer.write_all(b"ping").unwrap();
        drop(writer);

        let mut buf = String::new();
        File::from(read.unwrap()).read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "ping");
    }

    #[test]
    fn test_taking_ends_keeps_pair_allocated() {
        let mut pair = PipePair::new();
        pair.allocate(Stream::Stdout).unwrap();
        drop(pair.take_read());
        drop(pair.take_write());

        assert!(!pair.is_empty());
        assert!(pair.read().is_none());
        assert!(pair.write().is_none());
        let err = pair.allocate(Stream::Stdout).unwrap_err();
        assert!(matches!(err, CommandError::AlreadyAllocated { stream: Stream::Stdout }));
    }

    #[test]
    fn test_release_child_end() {
        let mut stdin = PipePair::new();
        stdin.allocate(Stream::Stdin).unwrap();
        stdin.release_child_end(Stream::Stdin);
        assert!(stdin.read().is_none());
        assert!(stdin.write().is_some());

        let mut stdout = PipePair::new();
        stdout.allocate(Stream::Stdout).unwrap();
        stdout.release_child_end(Stream::Stdout);
        assert!(stdout.read().is_some());
        assert!(stdout.write().is_none());
        assert!(!stdout.is_empty());
    }

    #[test]
    fn test_pipe_is_close_on_exec() {
        let mut pair = PipePair::new();
        pair.allocate(Stream::Stderr).unwrap();
        for fd in [pair.read().unwrap(), pair.write().unwrap()] {
            let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFD) };
            assert!(flags & libc::FD_CLOEXEC != 0);
        }
    }
}
