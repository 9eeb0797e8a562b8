use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for cyport operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while converting and validating tests.
#[derive(Debug, Error)]
pub enum Error {
    /// A filesystem operation on `path` failed.
    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        /// What was being done (`read`, `write`, `delete`, ...).
        action: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more required configuration keys are missing.
    #[error(
        "Missing required environment variables: {}\nPlease check your .env file and ensure all required variables are set.",
        .0.join(", ")
    )]
    MissingConfig(Vec<String>),

    /// A model provider encountered an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// Model provider returned an invalid response.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// Two source tests map to the same converted file.
    #[error("Destination {} is already produced by {}", .path.display(), .owner.display())]
    DestinationConflict {
        /// Converted file both sources would write.
        path: PathBuf,
        /// Source test that claimed it first.
        owner: PathBuf,
    },

    /// The test command could not be run to completion.
    #[error("Test runner error: {0}")]
    Runner(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps an I/O error with the path and action it belongs to.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
