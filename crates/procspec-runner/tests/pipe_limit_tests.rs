//! Pipe creation under an exhausted descriptor table
//!
//! Lowering RLIMIT_NOFILE is process-wide, so this file holds a single test
//! and runs as its own binary.

use nix::sys::resource::{Resource, getrlimit, setrlimit};
use procspec_runner::{CommandError, CommandSpec, StaticAmbient, Stream};

#[test]
fn test_pipe_creation_failure_leaves_pair_empty() {
    let mut cmd = CommandSpec::with_ambient(&StaticAmbient::default(), "cat", Vec::<String>::new());
    let (soft, hard) = getrlimit(Resource::RLIMIT_NOFILE).unwrap();

    // No descriptor number is free below 0, so every new fd fails with EMFILE
    setrlimit(Resource::RLIMIT_NOFILE, 0, hard).unwrap();
    let result = cmd.new_stdout().map(|_| ());
    setrlimit(Resource::RLIMIT_NOFILE, soft, hard).unwrap();

    match result {
        Err(CommandError::PipeCreationFailed { stream, source }) => {
            assert_eq!(stream, Stream::Stdout);
            assert_eq!(source.raw_os_error(), Some(libc::EMFILE));
        }
        other => panic!("Expected PipeCreationFailed, got {other:?}"),
    }

    assert!(cmd.stdout().is_empty());
    assert!(cmd.stdout().read().is_none());
    assert!(cmd.stdout().write().is_none());

    // Nothing was recorded, so a later allocation still succeeds
    assert!(cmd.new_stdout().is_ok());
}
