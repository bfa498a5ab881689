use std::path::PathBuf;

use thiserror::Error;

/// Broad category of a configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// File could not be read or the document could not be parsed
    Unreadable,
    /// A required key is absent
    Missing,
    /// A key is present but holds the wrong type
    WrongType,
    /// The document is well-formed but violates a logical constraint
    Invalid,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse configuration document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required parameter [{path}]")]
    Missing { path: String },

    #[error("parameter [{path}] must be {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("parameter [{path}] is invalid: {reason}")]
    Invalid { path: String, reason: String },
}

impl ConfigError {
    pub fn missing(path: impl Into<String>) -> Self {
        ConfigError::Missing { path: path.into() }
    }

    pub fn wrong_type(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        ConfigError::WrongType {
            path: path.into(),
            expected,
            found,
        }
    }

    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::Io { .. } | ConfigError::Parse(_) => ConfigErrorKind::Unreadable,
            ConfigError::Missing { .. } => ConfigErrorKind::Missing,
            ConfigError::WrongType { .. } => ConfigErrorKind::WrongType,
            ConfigError::Invalid { .. } => ConfigErrorKind::Invalid,
        }
    }

    /// Dotted path of the offending element, if the error has one
    pub fn path(&self) -> Option<&str> {
        match self {
            ConfigError::Missing { path }
            | ConfigError::WrongType { path, .. }
            | ConfigError::Invalid { path, .. } => Some(path),
            ConfigError::Io { .. } | ConfigError::Parse(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
