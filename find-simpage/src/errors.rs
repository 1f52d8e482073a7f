//! Error definitions.
use std::error::Error;
use std::{fmt, result};

/// A specialized Result type for this library.
pub type Result<T, E = FindSimpageError> = result::Result<T, E>;

/// Errors in this library.
#[derive(Debug)]
pub enum FindSimpageError {
    /// Contains [`InputError`].
    Input(InputError),
    /// Contains [`ConfigError`].
    Config(ConfigError),
}

impl fmt::Display for FindSimpageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Input(e) => e.fmt(f),
            Self::Config(e) => e.fmt(f),
        }
    }
}

impl Error for FindSimpageError {}

impl FindSimpageError {
    pub(crate) fn input<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Input(InputError { msg: msg.into() })
    }

    pub(crate) fn config(kind: &'static str, name: &str) -> Self {
        Self::Config(ConfigError {
            kind,
            name: name.to_string(),
        })
    }
}

/// Error used when the input data is invalid.
#[derive(Debug)]
pub struct InputError {
    msg: String,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InputError: {}", self.msg)
    }
}

/// Error used when a method name in a configuration is unknown.
#[derive(Debug)]
pub struct ConfigError {
    kind: &'static str,
    name: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConfigError: unknown {}: {:?}", self.kind, self.name)
    }
}
