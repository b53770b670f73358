use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid contact list: {0}")]
    InvalidContacts(String),

    #[error("Invalid timestamp value: {0}")]
    InvalidTimestamp(String),

    #[error("Zooming is not enabled")]
    ZoomingDisabled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
