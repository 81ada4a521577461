//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid YAML: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Valid YAML that does not fit [`crate::HubConfig`]
    #[error("{} does not match the configuration schema: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A custom tag with an argument it cannot use
    #[error("bad !{tag} in {}: {reason}", path.display())]
    BadTag {
        path: PathBuf,
        tag: &'static str,
        reason: String,
    },

    /// A file includes itself, directly or through others
    #[error("include cycle: {chain}")]
    IncludeCycle { chain: String },

    #[error("environment variable {name} used in {} is not set", path.display())]
    MissingEnvVar { name: String, path: PathBuf },

    #[error("duplicate automation id '{id}'")]
    DuplicateAutomation { id: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}
