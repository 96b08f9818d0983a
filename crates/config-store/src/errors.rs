use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error while accessing config store: {0}")]
    Io(#[from] io::Error),

    #[error("config serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no config stored under id {0:?}")]
    NotFound(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
