//! Journal and snapshot errors

use thiserror::Error;

use crate::hash::ChainError;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to persist file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Journal chain broken: {0}")]
    ChainBroken(#[from] ChainError),

    #[error("Invalid journal file: {0}")]
    InvalidFile(String),
}
