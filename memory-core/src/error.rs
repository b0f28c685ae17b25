use thiserror::Error;
use serde_json::Error as JsonError;
use std::io::Error as IoError;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Semantic index error: {0}")]
    SemanticIndex(String),

    #[error("Circuit breaker open: {0}")]
    CircuitOpen(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<toml::de::Error> for MemoryError {
    fn from(err: toml::de::Error) -> Self {
        MemoryError::Config(err.to_string())
    }
}

impl From<tempfile::PersistError> for MemoryError {
    fn from(err: tempfile::PersistError) -> Self {
        MemoryError::Io(err.error)
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
