use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuddyError {
    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BuddyError>;
