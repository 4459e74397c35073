//! Error types for rust-sprocscan

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting procedures from a dump
#[derive(Error, Debug)]
pub enum SprocScanError {
    #[error("Failed to read input dump: {path}")]
    InputReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode input dump {path} as {encoding}")]
    InputDecodeError { path: PathBuf, encoding: String },

    #[error("Unknown input encoding: {label}")]
    UnknownEncoding { label: String },

    #[error("Failed to read collaborator file: {path}")]
    CollaboratorReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse collaborator file {path}: {message}")]
    CollaboratorParseError { path: PathBuf, message: String },

    #[error("Failed to read module rules file: {path}")]
    RulesReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse module rules file: {path}")]
    RulesParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write output to {path}")]
    OutputWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {message}")]
    SerializeError { message: String },

    #[error("Failed to build worker pool: {message}")]
    WorkerPoolError { message: String },
}

impl From<serde_json::Error> for SprocScanError {
    fn from(err: serde_json::Error) -> Self {
        SprocScanError::SerializeError {
            message: err.to_string(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for SprocScanError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SprocScanError::WorkerPoolError {
            message: err.to_string(),
        }
    }
}
