//! Configuration management for procspec
//!
//! Configuration is layered with precedence CLI > file > defaults. The file is
//! TOML with `[attributes]` and `[command]` sections:
//!
//! ```toml
//! [attributes]
//! new_session = true
//! no_ctty = true
//! parent_death_signal = "SIGTERM"   # or "none"
//! credential = "inherited"          # inherited | corrected | none
//!
//! [command]
//! dir = "/srv/app"
//! clear_env = false
//! env = { RUST_LOG = "info" }
//! ```

mod discovery;
pub mod error;
pub mod model;

pub use discovery::{CONFIG_DIR, CONFIG_ENV_VAR, CONFIG_FILE};
pub use error::ConfigError;
pub use model::{ConfigSource, CredentialMode, TomlConfig, parse_signal};

use std::collections::BTreeMap;
use std::path::PathBuf;

use procspec_runner::{
    Ambient, CommandSpec, CredentialPolicy, DEFAULT_PARENT_DEATH_SIGNAL, ProcessAttributes,
    Signal, default_process_attributes_with,
};

/// Effective configuration after merging the config file over the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub new_session: bool,
    pub no_ctty: bool,
    pub parent_death_signal: Option<Signal>,
    pub credential: CredentialMode,
    /// Working directory override; `None` keeps the snapshot
    pub dir: Option<PathBuf>,
    /// Start the child with an empty environment before applying `env`
    pub clear_env: bool,
    pub env: BTreeMap<String, String>,
    pub source: ConfigSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            new_session: true,
            no_ctty: true,
            parent_death_signal: Some(DEFAULT_PARENT_DEATH_SIGNAL),
            credential: CredentialMode::default(),
            dir: None,
            clear_env: false,
            env: BTreeMap::new(),
            source: ConfigSource::Default,
        }
    }
}

impl Config {
    /// Defaults for launching from a short-lived caller such as the CLI.
    ///
    /// The caller exits right after the launch, so no parent-death signal is
    /// set. A credential switch needs root, so non-root callers get none.
    #[must_use]
    pub fn launcher_defaults(euid: u32) -> Self {
        Self {
            parent_death_signal: None,
            credential: if euid == 0 {
                CredentialMode::default()
            } else {
                CredentialMode::None
            },
            ..Self::default()
        }
    }

    /// Merge a parsed TOML file over the defaults.
    pub fn from_toml(toml: TomlConfig, source: ConfigSource) -> Result<Self, ConfigError> {
        Self::from_toml_over(Self::default(), toml, source)
    }

    /// Merge a parsed TOML file over `base`. Keys the file leaves out keep
    /// their `base` value; `env` entries are added to `base.env`.
    pub fn from_toml_over(
        base: Self,
        toml: TomlConfig,
        source: ConfigSource,
    ) -> Result<Self, ConfigError> {
        let attributes = toml.attributes;
        let parent_death_signal = match attributes.parent_death_signal.as_deref() {
            Some(value) => parse_signal(value)?,
            None => base.parent_death_signal,
        };
        let mut env = base.env;
        env.extend(toml.command.env);

        Ok(Self {
            new_session: attributes.new_session.unwrap_or(base.new_session),
            no_ctty: attributes.no_ctty.unwrap_or(base.no_ctty),
            parent_death_signal,
            credential: attributes.credential.unwrap_or(base.credential),
            dir: toml.command.dir.or(base.dir),
            clear_env: toml.command.clear_env.unwrap_or(base.clear_env),
            env,
            source,
        })
    }

    /// Process attributes described by this configuration.
    pub fn process_attributes(&self, ambient: &dyn Ambient) -> ProcessAttributes {
        let policy = self.credential.policy();
        let base = default_process_attributes_with(ambient, policy.unwrap_or(CredentialPolicy::INHERITED));

        ProcessAttributes {
            credential: policy.and(base.credential),
            new_session: self.new_session,
            parent_death_signal: self.parent_death_signal,
            no_ctty: self.no_ctty,
        }
    }

    /// Build a descriptor for `program` with this configuration applied.
    pub fn build_command<I, S>(&self, ambient: &dyn Ambient, program: impl Into<String>, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cmd = CommandSpec::with_ambient(ambient, program, args)
            .attributes(self.process_attributes(ambient));

        if let Some(dir) = &self.dir {
            cmd = cmd.cwd(dir);
        }
        if self.clear_env {
            cmd = cmd.env_clear();
        }
        cmd.envs(&self.env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procspec_runner::{DirSource, StaticAmbient};

    fn ambient() -> StaticAmbient {
        StaticAmbient {
            cwd: Some(PathBuf::from("/home/dev")),
            env: vec!["PATH=/usr/bin".to_string(), "TERM=xterm".to_string()],
            uid: 1000,
            gid: 100,
            groups: Some(vec![100, 27]),
        }
    }

    #[test]
    fn test_default_config_matches_default_attributes() {
        let ambient = ambient();
        let attrs = Config::default().process_attributes(&ambient);
        let expected = default_process_attributes_with(&ambient, CredentialPolicy::INHERITED);
        assert_eq!(attrs, expected);
    }

    #[test]
    fn test_from_toml_overrides() {
        let toml: TomlConfig = toml::from_str(
            r#"
            [attributes]
            new_session = false
            parent_death_signal = "none"
            credential = "none"
            "#,
        )
        .unwrap();
        let config = Config::from_toml(toml, ConfigSource::Default).unwrap();

        assert!(!config.new_session);
        assert!(config.no_ctty);
        assert_eq!(config.parent_death_signal, None);

        let attrs = config.process_attributes(&ambient());
        assert!(attrs.credential.is_none());
        assert!(!attrs.new_session);
    }

    #[test]
    fn test_from_toml_invalid_signal() {
        let toml: TomlConfig =
            toml::from_str("[attributes]\nparent_death_signal = \"SIGBOGUS\"\n").unwrap();
        assert!(matches!(
            Config::from_toml(toml, ConfigSource::Default),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_launcher_defaults() {
        let unprivileged = Config::launcher_defaults(1000);
        assert_eq!(unprivileged.parent_death_signal, None);
        assert_eq!(unprivileged.credential, CredentialMode::None);
        assert!(unprivileged.new_session);
        assert!(unprivileged.no_ctty);
        assert!(unprivileged.process_attributes(&ambient()).credential.is_none());

        let root = Config::launcher_defaults(0);
        assert_eq!(root.parent_death_signal, None);
        assert_eq!(root.credential, CredentialMode::Inherited);
    }

    #[test]
    fn test_from_toml_over_keeps_base_for_missing_keys() {
        let toml: TomlConfig = toml::from_str("[attributes]\nno_ctty = false\n").unwrap();
        let config =
            Config::from_toml_over(Config::launcher_defaults(1000), toml, ConfigSource::Default)
                .unwrap();
        assert!(!config.no_ctty);
        assert_eq!(config.parent_death_signal, None);
        assert_eq!(config.credential, CredentialMode::None);

        let toml: TomlConfig =
            toml::from_str("[attributes]\nparent_death_signal = \"SIGTERM\"\n").unwrap();
        let config =
            Config::from_toml_over(Config::launcher_defaults(1000), toml, ConfigSource::Default)
                .unwrap();
        assert_eq!(config.parent_death_signal, Some(Signal::SIGTERM));
    }

    #[test]
    fn test_corrected_credential_mode() {
        let config = Config {
            credential: CredentialMode::Corrected,
            ..Config::default()
        };
        let cred = config.process_attributes(&ambient()).credential.unwrap();
        assert_eq!(cred.uid, 1000);
        assert_eq!(cred.groups, vec![100, 27]);
    }

    #[test]
    fn test_build_command_applies_command_section() {
        let mut env = BTreeMap::new();
        env.insert("RUST_LOG".to_string(), "debug".to_string());
        let config = Config {
            dir: Some(PathBuf::from("/srv/app")),
            clear_env: true,
            env,
            ..Config::default()
        };

        let cmd = config.build_command(&ambient(), "server", ["--port", "8080"]);
        assert_eq!(cmd.args, vec!["--port", "8080"]);
        assert_eq!(cmd.dir, PathBuf::from("/srv/app"));
        assert_eq!(cmd.dir_source, DirSource::Explicit);
        assert_eq!(cmd.env, vec!["RUST_LOG=debug"]);
    }

    #[test]
    fn test_build_command_keeps_snapshot_by_default() {
        let cmd = Config::default().build_command(&ambient(), "ls", Vec::<String>::new());
        assert_eq!(cmd.dir, PathBuf::from("/home/dev"));
        assert_eq!(cmd.env, vec!["PATH=/usr/bin", "TERM=xterm"]);
    }
}
