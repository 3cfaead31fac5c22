//! Error types for infracli

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type for infracli operations
pub type Result<T> = std::result::Result<T, InfraError>;

/// Setup errors abort the current command.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("could not determine the home directory")]
    HomeDirUnavailable,

    #[error("could not read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not write config file {}: {source}", path.display())]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not serialize config: {0}")]
    ConfigSerialize(#[from] serde_json::Error),

    #[error("services directory not found: {}", .0.display())]
    ServicesDirNotFound(PathBuf),

    #[error("could not read services directory {}: {source}", path.display())]
    ServicesDirRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not read {}: {source}", path.display())]
    ComposeFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("compose command is empty")]
    EmptyComposeCommand,
}

/// Failure of a single compose invocation. Reported per service; a batch
/// keeps going after one of these.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Failed {
        program: String,
        status: ExitStatus,
        /// Combined stdout and stderr; empty when output was streamed.
        output: String,
    },
}

impl ComposeError {
    pub fn output(&self) -> Option<&str> {
        match self {
            ComposeError::Failed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}
