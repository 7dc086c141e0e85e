//! Launch-time process attributes
//!
//! [`ProcessAttributes`] is the platform-neutral capability set a child is
//! started with. It is plain data; translation to native calls happens in
//! [`crate::launch`].

use nix::sys::signal::Signal;
use tracing::debug;

use crate::ambient::{Ambient, SystemAmbient};
use crate::credential::{Credential, CredentialPolicy};

/// Signal delivered to the child when its parent dies.
pub const DEFAULT_PARENT_DEATH_SIGNAL: Signal = Signal::SIGTERM;

/// Launch behavior applied to a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessAttributes {
    /// Identity to switch to before exec. `None` keeps the parent's identity.
    pub credential: Option<Credential>,
    /// Start the child in a new session, detached from the parent's terminal.
    pub new_session: bool,
    /// Signal sent to the child if the parent dies first (Linux only).
    pub parent_death_signal: Option<Signal>,
    /// Detach fd 0 from any controlling terminal.
    pub no_ctty: bool,
}

impl ProcessAttributes {
    /// Attributes that change nothing: the child inherits session, terminal
    /// and identity from the parent.
    #[must_use]
    pub const fn inherit() -> Self {
        Self {
            credential: None,
            new_session: false,
            parent_death_signal: None,
            no_ctty: false,
        }
    }

    /// Whether the child ends up detached from the parent's session.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.new_session
    }
}

/// Default attributes read from the live process, with the inherited
/// credential policy.
pub fn default_process_attributes() -> ProcessAttributes {
    default_process_attributes_with(&SystemAmbient, CredentialPolicy::INHERITED)
}

/// Default attributes: detached session, SIGTERM on parent death, no
/// controlling terminal, and a credential derived under `policy`.
pub fn default_process_attributes_with(
    ambient: &dyn Ambient,
    policy: CredentialPolicy,
) -> ProcessAttributes {
    let credential = Credential::from_ambient(ambient, policy);
    debug!(
        uid = credential.uid,
        gid = credential.gid,
        groups = credential.groups.len(),
        "Built default process attributes"
    );

    ProcessAttributes {
        credential: Some(credential),
        new_session: true,
        parent_death_signal: Some(DEFAULT_PARENT_DEATH_SIGNAL),
        no_ctty: true,
    }
}
