//! Error types for record storage.

use std::io;
use std::path::PathBuf;

/// A submission was rejected before anything was written.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// `participant_id`, `data_type` or `data` is absent or empty.
    #[error("Missing fields")]
    MissingFields,

    /// Request body is not valid JSON.
    #[error("Malformed JSON body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// Participant id cannot be used in a file name.
    #[error("Invalid participant_id")]
    InvalidParticipantId,

    #[error("Invalid data_type")]
    InvalidDataType,

    /// `data` is present but is not a field mapping.
    #[error("Invalid data: expected an object")]
    InvalidData,
}

/// Error type for record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Requested file does not exist in the storage directory.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Requested file name is not a plain name inside the storage directory.
    #[error("Invalid file name: {0}")]
    PathTraversal(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize completion payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
