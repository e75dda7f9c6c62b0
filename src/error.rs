//! Domain-specific error types for prompt-library

use thiserror::Error;

/// Main error type for the prompt library
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Cannot write empty {kind} list (the schema header would be lost)")]
    EmptyWrite { kind: &'static str },

    #[error(
        "No eligible parent prompts for '{group_key}'. Rate more prompts in this time block, or broaden the quality tiers"
    )]
    NoEligibleParent { group_key: String },

    #[error("Duplicate {kind} identifier: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl LibraryError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        LibraryError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LibraryError {
    fn from(err: toml::de::Error) -> Self {
        LibraryError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for prompt library operations
pub type Result<T> = std::result::Result<T, LibraryError>;
