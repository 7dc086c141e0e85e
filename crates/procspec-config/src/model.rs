use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use procspec_runner::{CredentialPolicy, Signal};

use crate::error::ConfigError;

/// How the child's credential is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// uid from the effective gid, groups copied only on lookup failure
    #[default]
    Inherited,
    /// uid from the effective uid, groups copied on lookup success
    Corrected,
    /// No credential switch; the child keeps the parent's identity
    None,
}

impl CredentialMode {
    /// Credential policy for this mode, or `None` when no credential is set.
    #[must_use]
    pub const fn policy(self) -> Option<CredentialPolicy> {
        match self {
            Self::Inherited => Some(CredentialPolicy::INHERITED),
            Self::Corrected => Some(CredentialPolicy::CORRECTED),
            Self::None => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inherited => "inherited",
            Self::Corrected => "corrected",
            Self::None => "none",
        }
    }
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inherited" => Ok(Self::Inherited),
            "corrected" => Ok(Self::Corrected),
            "none" => Ok(Self::None),
            other => Err(ConfigError::InvalidValue {
                key: "credential".to_string(),
                value: format!("Unknown credential mode: {other}"),
            }),
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Built-in defaults only
    Default,
    /// Loaded from a config file
    File(PathBuf),
}

/// On-disk layout of `.procspec/config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub attributes: AttributesSection,
    #[serde(default)]
    pub command: CommandSection,
}

/// `[attributes]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttributesSection {
    pub new_session: Option<bool>,
    pub no_ctty: Option<bool>,
    /// Signal name such as `"SIGTERM"`, or `"none"`
    pub parent_death_signal: Option<String>,
    pub credential: Option<CredentialMode>,
}

/// `[command]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSection {
    pub dir: Option<PathBuf>,
    pub clear_env: Option<bool>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Parse a parent-death signal setting.
///
/// Accepts `"none"`, signal names with or without the `SIG` prefix (any case),
/// and signal numbers.
pub fn parse_signal(value: &str) -> Result<Option<Signal>, ConfigError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let invalid = || ConfigError::InvalidValue {
        key: "parent_death_signal".to_string(),
        value: format!("Unknown signal: {value}"),
    };

    if let Ok(number) = trimmed.parse::<i32>() {
        return Signal::try_from(number).map(Some).map_err(|_| invalid());
    }

    let upper = trimmed.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    Signal::from_str(&name).map(Some).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_names() {
        assert_eq!(parse_signal("SIGTERM").unwrap(), Some(Signal::SIGTERM));
        assert_eq!(parse_signal("kill").unwrap(), Some(Signal::SIGKILL));
        assert_eq!(parse_signal(" SigHup ").unwrap(), Some(Signal::SIGHUP));
        assert_eq!(parse_signal("9").unwrap(), Some(Signal::SIGKILL));
    }

    #[test]
    fn test_parse_signal_none() {
        assert_eq!(parse_signal("none").unwrap(), None);
        assert_eq!(parse_signal("NONE").unwrap(), None);
    }

    #[test]
    fn test_parse_signal_rejects_unknown() {
        assert!(matches!(
            parse_signal("SIGNOPE"),
            Err(ConfigError::InvalidValue { key, .. }) if key == "parent_death_signal"
        ));
        assert!(parse_signal("0").is_err());
        assert!(parse_signal("").is_err());
    }

    #[test]
    fn test_credential_mode_from_str() {
        assert_eq!("inherited".parse::<CredentialMode>().unwrap(), CredentialMode::Inherited);
        assert_eq!("corrected".parse::<CredentialMode>().unwrap(), CredentialMode::Corrected);
        assert_eq!("none".parse::<CredentialMode>().unwrap(), CredentialMode::None);
        assert!("root".parse::<CredentialMode>().is_err());
    }

    #[test]
    fn test_credential_mode_policy() {
        assert_eq!(CredentialMode::Inherited.policy(), Some(CredentialPolicy::INHERITED));
        assert_eq!(CredentialMode::Corrected.policy(), Some(CredentialPolicy::CORRECTED));
        assert_eq!(CredentialMode::None.policy(), None);
    }

    #[test]
    fn test_toml_config_rejects_unknown_keys() {
        let err = toml::from_str::<TomlConfig>("[attributes]\nsetsid = true\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_toml_config_full() {
        let config: TomlConfig = toml::from_str(
            r#"
            [attributes]
            new_session = false
            no_ctty = true
            parent_death_signal = "SIGKILL"
            credential = "corrected"

            [command]
            dir = "/srv/app"
            clear_env = true
            env = { RUST_LOG = "debug" }
            "#,
        )
        .unwrap();

        assert_eq!(config.attributes.new_session, Some(false));
        assert_eq!(config.attributes.credential, Some(CredentialMode::Corrected));
        assert_eq!(config.command.dir, Some(PathBuf::from("/srv/app")));
        assert_eq!(config.command.env.get("RUST_LOG").map(String::as_str), Some("debug"));
    }
}
