//! Error types for domus-mailer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown task status: {0}")]
    UnknownStatus(String),
}

pub type Result<T> = std::result::Result<T, Error>;
