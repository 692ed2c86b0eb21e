//! Typed error taxonomy.
//!
//! Three families, all terminal to the failing operation and never fatal to
//! the session: `Validation` (surfaced inline per field), `LimitExceeded`
//! (blocking banner, rejected submit), `Store` (corrupt or unreadable
//! persisted document, recovered by falling back to empty collections).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored document {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage i/o failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("plan limit of {limit} leads reached")]
    LimitExceeded { limit: usize },

    #[error("unknown stage '{id}'")]
    UnknownStage { id: String },

    #[error("unknown lead {id}")]
    UnknownLead { id: i64 },

    #[error("unknown task {id}")]
    UnknownTask { id: i64 },

    #[error("cannot remove the last remaining stage")]
    LastStage,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }
}
