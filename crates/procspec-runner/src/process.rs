use crate::command_spec::CommandSpec;
use crate::error::LaunchError;
use tracing::info;

// ============================================================================
// Launcher Trait - Process Start Interface
// ============================================================================

/// Trait for starting the process a [`CommandSpec`] describes.
///
/// A launcher owns the moment a descriptor becomes a running process. On
/// success it stores the child handle in [`CommandSpec::process`], closes the
/// parent's copy of every pipe end handed to the child, and returns its pid. It does not wait for the child, collect its output, or reap it;
/// all of that stays with the caller through the stored handle.
///
/// # Example
///
/// ```rust
/// use procspec_runner::{CommandSpec, LaunchError, Launcher};
///
/// struct DryRun;
///
/// impl Launcher for DryRun {
///     fn launch(&self, spec: &mut CommandSpec) -> Result<u32, LaunchError> {
///         // Translate only; never spawn
///         spec.to_command()?;
///         Ok(0)
///     }
/// }
///
/// let mut cmd = CommandSpec::new("echo", ["hi"]);
/// assert_eq!(DryRun.launch(&mut cmd).unwrap(), 0);
/// assert!(cmd.process.is_none());
/// ```
pub trait Launcher {
    /// Start the process described by `spec`.
    ///
    /// # Errors
    ///
    /// * `LaunchError::AlreadyStarted` - `spec.process` is already populated
    /// * `LaunchError::HandleDuplication` - a pipe end could not be handed to the child
    /// * `LaunchError::SpawnFailed` - the OS refused to start the process
    fn launch(&self, spec: &mut CommandSpec) -> Result<u32, LaunchError>;
}

/// Starts processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLauncher;

impl Launcher for NativeLauncher {
    fn launch(&self, spec: &mut CommandSpec) -> Result<u32, LaunchError> {
        if let Some(pid) = spec.pid() {
            return Err(LaunchError::AlreadyStarted { pid });
        }

        let child = spec
            .to_command()?
            .spawn()
            .map_err(|source| LaunchError::SpawnFailed {
                program: spec.program.clone(),
                source,
            })?;

        spec.release_child_ends();

        let pid = child.id();
        info!(
            pid,
            program = %spec.program,
            detached = spec.attributes.is_detached(),
            "Launched process"
        );
        spec.process = Some(child);
        Ok(pid)
    }
}
