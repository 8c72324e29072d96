//! Error types for hpclaunch
//!
//! Missing variables, absent host files and failed introspection commands
//! all degrade to defaults. The variants below cover the few conditions
//! that abort a resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for launch resolution
#[derive(Error, Debug)]
pub enum LaunchError {
    /// I/O error while reading an overlay or writing a host file
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Overlay file could not be parsed
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Unknown name for the reserved `mpmd` overlay key
    #[error("Invalid MPMD mode '{0}' (expected one of: none, mpiexec, configfile, script)")]
    InvalidMpmdMode(String),

    /// An MPI family refuses to run under the detected resource manager
    #[error("Resource manager type {manager} options not handled yet for {family}")]
    UnsupportedManager { family: String, manager: String },
}

impl LaunchError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an unsupported family/manager pairing error
    pub fn unsupported_manager(family: impl Into<String>, manager: impl Into<String>) -> Self {
        Self::UnsupportedManager {
            family: family.into(),
            manager: manager.into(),
        }
    }

    /// Check if this error is fatal for the whole resolution
    ///
    /// Only the pairing error is a statement about the environment itself;
    /// the others point at a bad input that the caller may correct.
    pub fn is_environment_error(&self) -> bool {
        matches!(self, Self::UnsupportedManager { .. })
    }
}

/// Result type alias for launch resolution
pub type Result<T> = std::result::Result<T, LaunchError>;
