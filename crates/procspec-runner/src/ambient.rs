//! Ambient process context read when a descriptor is built
//!
//! Everything a descriptor snapshots from the calling process (working
//! directory, environment, identity, supplementary groups) goes through the
//! [`Ambient`] trait. [`SystemAmbient`] reads the real process state;
//! [`StaticAmbient`] is a plain value for deterministic construction.

use std::ffi::OsStr;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::types::DirSource;

/// Directory used when the current directory cannot be determined.
pub const FALLBACK_DIR: &str = ".";

/// Source of the calling process's context.
///
/// Each method is called at most once per snapshot; results are never re-read.
pub trait Ambient {
    /// Current working directory.
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Environment as `KEY=VALUE` entries, in process order.
    fn environ(&self) -> Vec<String>;

    /// Effective user id.
    fn effective_uid(&self) -> u32;

    /// Effective group id.
    fn effective_gid(&self) -> u32;

    /// Supplementary group list.
    fn supplementary_groups(&self) -> io::Result<Vec<u32>>;
}

/// Reads the live state of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAmbient;

impl Ambient for SystemAmbient {
    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn environ(&self) -> Vec<String> {
        std::env::vars_os()
            .map(|(key, value)| env_entry(&key, &value))
            .collect()
    }

    fn effective_uid(&self) -> u32 {
        nix::unistd::geteuid().as_raw()
    }

    fn effective_gid(&self) -> u32 {
        nix::unistd::getegid().as_raw()
    }

    #[cfg(not(target_vendor = "apple"))]
    fn supplementary_groups(&self) -> io::Result<Vec<u32>> {
        let groups = nix::unistd::getgroups()?;
        Ok(groups.into_iter().map(nix::unistd::Gid::as_raw).collect())
    }

    #[cfg(target_vendor = "apple")]
    fn supplementary_groups(&self) -> io::Result<Vec<u32>> {
        // nix does not expose getgroups on Apple targets
        let count = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
        if count < 0 {
            return Err(io::Error::last_os_error());
        }
        let mut groups: Vec<libc::gid_t> = vec![0; count as usize];
        let filled = unsafe { libc::getgroups(count, groups.as_mut_ptr()) };
        if filled < 0 {
            return Err(io::Error::last_os_error());
        }
        groups.truncate(filled as usize);
        Ok(groups)
    }
}

/// Format one environment variable as `KEY=VALUE`.
///
/// Non-UTF-8 bytes are replaced with U+FFFD; the replacement is logged.
fn env_entry(key: &OsStr, value: &OsStr) -> String {
    if key.to_str().is_none() || value.to_str().is_none() {
        debug!(
            key = %key.to_string_lossy(),
            "Environment entry is not valid UTF-8; snapshot keeps a lossy copy"
        );
    }
    format!("{}={}", key.to_string_lossy(), value.to_string_lossy())
}

/// Fixed context, for building descriptors without touching process state.
///
/// `None` for `cwd` or `groups` makes the corresponding lookup fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAmbient {
    pub cwd: Option<PathBuf>,
    pub env: Vec<String>,
    pub uid: u32,
    pub gid: u32,
    pub groups: Option<Vec<u32>>,
}

impl StaticAmbient {
    /// Capture the current process state once.
    #[must_use]
    pub fn capture() -> Self {
        let system = SystemAmbient;
        Self {
            cwd: system.current_dir().ok(),
            env: system.environ(),
            uid: system.effective_uid(),
            gid: system.effective_gid(),
            groups: system.supplementary_groups().ok(),
        }
    }
}

impl Ambient for StaticAmbient {
    fn current_dir(&self) -> io::Result<PathBuf> {
        self.cwd
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no working directory"))
    }

    fn environ(&self) -> Vec<String> {
        self.env.clone()
    }

    fn effective_uid(&self) -> u32 {
        self.uid
    }

    fn effective_gid(&self) -> u32 {
        self.gid
    }

    fn supplementary_groups(&self) -> io::Result<Vec<u32>> {
        self.groups
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "group lookup refused"))
    }
}

/// Working directory resolved for a new descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDir {
    pub path: PathBuf,
    pub source: DirSource,
}

/// Resolve the working directory, degrading to [`FALLBACK_DIR`] on failure.
///
/// The lookup error is logged and otherwise dropped; `source` tells the two
/// outcomes apart.
pub fn resolve_working_dir(ambient: &dyn Ambient) -> WorkingDir {
    match ambient.current_dir() {
        Ok(path) => WorkingDir {
            path,
            source: DirSource::Lookup,
        },
        Err(e) => {
            warn!(error = %e, fallback = FALLBACK_DIR, "Working directory lookup failed");
            WorkingDir {
                path: PathBuf::from(FALLBACK_DIR),
                source: DirSource::Fallback,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_working_dir_lookup() {
        let ambient = StaticAmbient {
            cwd: Some(PathBuf::from("/srv/app")),
            ..StaticAmbient::default()
        };
        let dir = resolve_working_dir(&ambient);
        assert_eq!(dir.path, PathBuf::from("/srv/app"));
        assert_eq!(dir.source, DirSource::Lookup);
    }

    #[test]
    fn test_resolve_working_dir_fallback() {
        let dir = resolve_working_dir(&StaticAmbient::default());
        assert_eq!(dir.path, PathBuf::from("."));
        assert!(dir.source.is_fallback());
    }

    #[test]
    fn test_static_ambient_group_lookup_failure() {
        let ambient = StaticAmbient::default();
        assert!(ambient.supplementary_groups().is_err());
    }

    #[test]
    fn test_system_ambient_environ_is_key_value() {
        for entry in SystemAmbient.environ() {
            assert!(entry.contains('='), "entry without separator: {entry}");
        }
    }

    #[test]
    fn test_env_entry_utf8_is_exact() {
        assert_eq!(env_entry(OsStr::new("LANG"), OsStr::new("C.UTF-8")), "LANG=C.UTF-8");
    }

    #[test]
    fn test_env_entry_non_utf8_is_replaced() {
        use std::os::unix::ffi::OsStrExt;

        let value = OsStr::from_bytes(b"caf\xe9");
        assert_eq!(env_entry(OsStr::new("NAME"), value), "NAME=caf\u{FFFD}");
    }

    #[test]
    fn test_system_ambient_matches_nix_identity() {
        assert_eq!(SystemAmbient.effective_gid(), nix::unistd::getegid().as_raw());
        assert_eq!(SystemAmbient.effective_uid(), nix::unistd::geteuid().as_raw());
    }

    #[test]
    fn test_capture_reads_current_dir() {
        let captured = StaticAmbient::capture();
        assert_eq!(captured.cwd, std::env::current_dir().ok());
    }
}
