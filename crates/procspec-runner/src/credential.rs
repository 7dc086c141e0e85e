//! Credential block applied to a child before exec
//!
//! The inherited behavior has two quirks that are kept as explicit, named code
//! paths instead of being corrected in place:
//!
//! - the uid is sourced from the effective *group* id ([`UidSource::EffectiveGid`]);
//! - supplementary groups are only copied on the *error* branch of the group
//!   lookup, so a successful lookup yields a zero-filled list of the same
//!   length ([`GroupFill::OnLookupError`]).
//!
//! [`CredentialPolicy::INHERITED`] keeps both quirks and is the default.
//! [`CredentialPolicy::CORRECTED`] is the presumed intent.

use serde::{Deserialize, Serialize};
use std::io;
use tracing::debug;

use crate::ambient::Ambient;

/// Identity the child switches to before exec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub uid: u32,
    pub gid: u32,
    pub groups: Vec<u32>,
}

/// Which identity query feeds [`Credential::uid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UidSource {
    /// Use the effective group id (inherited behavior)
    #[default]
    EffectiveGid,
    /// Use the effective user id
    EffectiveUid,
}

/// When the supplementary group list is copied into [`Credential::groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupFill {
    /// Copy only when the lookup fails (inherited behavior)
    #[default]
    OnLookupError,
    /// Copy when the lookup succeeds
    OnLookupSuccess,
}

/// How a [`Credential`] is derived from the ambient identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CredentialPolicy {
    pub uid_source: UidSource,
    pub group_fill: GroupFill,
}

impl CredentialPolicy {
    pub const INHERITED: Self = Self {
        uid_source: UidSource::EffectiveGid,
        group_fill: GroupFill::OnLookupError,
    };

    pub const CORRECTED: Self = Self {
        uid_source: UidSource::EffectiveUid,
        group_fill: GroupFill::OnLookupSuccess,
    };
}

impl Credential {
    /// Build a credential from the ambient identity under `policy`.
    pub fn from_ambient(ambient: &dyn Ambient, policy: CredentialPolicy) -> Self {
        let groups = fill_groups(ambient.supplementary_groups(), policy.group_fill);
        let gid = ambient.effective_gid();
        let uid = match policy.uid_source {
            UidSource::EffectiveGid => gid,
            UidSource::EffectiveUid => ambient.effective_uid(),
        };

        Self { uid, gid, groups }
    }
}

fn fill_groups(lookup: io::Result<Vec<u32>>, fill: GroupFill) -> Vec<u32> {
    match (lookup, fill) {
        (Ok(groups), GroupFill::OnLookupSuccess) => groups,
        (Ok(groups), GroupFill::OnLookupError) => vec![0; groups.len()],
        // A failed lookup has nothing to copy on either branch
        (Err(e), _) => {
            debug!(error = %e, "Supplementary group lookup failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::StaticAmbient;

    fn ambient(groups: Option<Vec<u32>>) -> StaticAmbient {
        StaticAmbient {
            uid: 1000,
            gid: 100,
            groups,
            ..StaticAmbient::default()
        }
    }

    #[test]
    fn test_inherited_uid_comes_from_gid() {
        let cred = Credential::from_ambient(&ambient(Some(vec![4, 24])), CredentialPolicy::INHERITED);
        assert_eq!(cred.uid, 100);
        assert_eq!(cred.gid, 100);
    }

    #[test]
    fn test_inherited_groups_zero_filled_on_success() {
        let cred = Credential::from_ambient(&ambient(Some(vec![4, 24, 27])), CredentialPolicy::INHERITED);
        assert_eq!(cred.groups, vec![0, 0, 0]);
    }

    #[test]
    fn test_inherited_groups_empty_on_failure() {
        let cred = Credential::from_ambient(&ambient(None), CredentialPolicy::INHERITED);
        assert!(cred.groups.is_empty());
    }

    #[test]
    fn test_corrected_policy() {
        let cred = Credential::from_ambient(&ambient(Some(vec![4, 24])), CredentialPolicy::CORRECTED);
        assert_eq!(cred.uid, 1000);
        assert_eq!(cred.gid, 100);
        assert_eq!(cred.groups, vec![4, 24]);
    }

    #[test]
    fn test_corrected_groups_empty_on_failure() {
        let cred = Credential::from_ambient(&ambient(None), CredentialPolicy::CORRECTED);
        assert!(cred.groups.is_empty());
    }

    #[test]
    fn test_policies_mix_independently() {
        let policy = CredentialPolicy {
            uid_source: UidSource::EffectiveUid,
            group_fill: GroupFill::OnLookupError,
        };
        let cred = Credential::from_ambient(&ambient(Some(vec![4])), policy);
        assert_eq!(cred.uid, 1000);
        assert_eq!(cred.groups, vec![0]);
    }

    #[test]
    fn test_default_policy_is_inherited() {
        assert_eq!(CredentialPolicy::default(), CredentialPolicy::INHERITED);
    }
}
