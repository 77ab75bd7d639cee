//! Error types for Cueflow.
//!
//! All errors in Cueflow are represented by the `CueflowError` enum.
//! Configuration problems found while initializing a node tree are *not*
//! errors: they are recorded on the node's health record instead. Only
//! programmer-invariant violations escape `init()`.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Cueflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum CueflowError {
    /// Engine-level errors (startup, shutdown, missing collaborators).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Screen capture and image errors.
    #[error("{0}")]
    Vision(String),

    /// Pattern matching errors (matcher crash, interrupted task).
    #[error("{0}")]
    Matcher(String),

    /// Broken programmer invariants. These are never turned into node health.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

impl From<CueflowError> for String {
    fn from(val: CueflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for CueflowError {
    fn from(error: std::io::Error) -> Self {
        CueflowError::IoError(error.to_string())
    }
}

impl From<CueflowError> for std::io::Error {
    fn from(val: CueflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for CueflowError {
    fn from(error: serde_json::Error) -> Self {
        CueflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for CueflowError {
    fn from(error: toml::de::Error) -> Self {
        CueflowError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for CueflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        CueflowError::Convert(error.to_string())
    }
}
