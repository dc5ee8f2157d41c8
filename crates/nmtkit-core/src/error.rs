//! Error types for nmtkit-core.

use std::path::{Path, PathBuf};

/// Result type alias for nmtkit-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration or setting up services.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error without path context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific file.
    #[error("I/O error at {}: {source}", path.display())]
    IoWithPath {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// YAML parse or deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration is present but not usable.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it occurred on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
