//! JSON report printed on stdout

use serde::Serialize;

use procspec_config::ConfigSource;
use procspec_runner::{CommandSpec, Credential, DirSource, ProcessAttributes, UnpipedStdio};

/// Description of a descriptor, and of the process if it was launched.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub program: String,
    pub args: Vec<String>,
    pub dir: String,
    pub dir_source: DirSource,
    pub env_count: usize,
    pub attributes: AttributesReport,
    /// What the child gets on its standard streams
    pub stdio: UnpipedStdio,
    pub config_source: ConfigSource,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributesReport {
    pub new_session: bool,
    pub no_ctty: bool,
    pub parent_death_signal: Option<&'static str>,
    pub credential: Option<Credential>,
}

impl From<&ProcessAttributes> for AttributesReport {
    fn from(attributes: &ProcessAttributes) -> Self {
        Self {
            new_session: attributes.new_session,
            no_ctty: attributes.no_ctty,
            parent_death_signal: attributes.parent_death_signal.map(|signal| signal.as_str()),
            credential: attributes.credential.clone(),
        }
    }
}

impl LaunchReport {
    #[must_use]
    pub fn new(spec: &CommandSpec, config_source: ConfigSource, dry_run: bool) -> Self {
        Self {
            program: spec.program.clone(),
            args: spec.args.clone(),
            dir: spec.dir.display().to_string(),
            dir_source: spec.dir_source,
            env_count: spec.env.len(),
            attributes: AttributesReport::from(&spec.attributes),
            stdio: spec.unpiped,
            config_source,
            dry_run,
            pid: spec.pid(),
        }
    }
}
