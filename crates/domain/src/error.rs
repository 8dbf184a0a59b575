/// Shared error type used across all runner crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config invalid: {0}")]
    Config(String),

    #[error("store transient error: {0}")]
    StoreTransient(String),

    #[error("store permanent error: {0}")]
    StorePermanent(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
