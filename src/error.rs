use std::io;

use thiserror::Error;

/// Failure to bring the input device into raw mode.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("raw mode unavailable: {0}")]
    RawMode(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("target text must contain at least one word")]
    EmptyTarget,
}

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("word list {0} not found")]
    Missing(String),
    #[error("unable to deserialize word list: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("could not create history directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}
