use std::{io, path::PathBuf};

use nmm::SchemeError;

/// Everything that can stop the tool before or after the walk. The walk itself can't fail.
#[derive(Debug, thiserror::Error)]
pub enum MmError {
    /// The `--arch` name isn't registered.
    #[error(transparent)]
    Scheme(#[from] SchemeError),
    /// The scheme walks from a root register but none was given.
    #[error("--arch {0} needs --cr3 as well")]
    MissingTableBase(String),
    /// A root register value was given to a scheme that has none.
    #[error("--cr3 is not used by --arch {0}")]
    UnusedTableBase(String),
    /// The configuration file exists but couldn't be read.
    #[error("Unable to read {}: {source}", path.display())]
    ConfigRead {
        /// The configuration file.
        path: PathBuf,
        /// Why reading failed.
        source: io::Error,
    },
    /// The configuration file isn't valid TOML.
    #[error("Unable to parse {}: {source}", path.display())]
    ConfigParse {
        /// The configuration file.
        path: PathBuf,
        /// The TOML error.
        source: toml::de::Error,
    },
    /// A configuration key has a value of the wrong shape.
    #[error("Invalid value for {key} in {}: {reason}", path.display())]
    ConfigValue {
        /// The configuration file.
        path: PathBuf,
        /// Dotted path of the offending key.
        key: String,
        /// What is wrong with the value.
        reason: String,
    },
    /// An override variable isn't a number: the variable name, then the reason.
    #[error("Invalid value for environment variable {0}: {1}")]
    EnvValue(&'static str, String),
    /// The JSON report couldn't be assembled.
    #[error("Unable to build JSON report: {0}")]
    Json(#[from] jzon::Error),
}

/// A command line or configuration value that isn't a 64-bit unsigned integer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid number {value:?}: {reason}")]
pub struct InvalidNumber {
    /// The text as given.
    pub value: String,
    /// Why it was rejected.
    pub reason: &'static str,
}
