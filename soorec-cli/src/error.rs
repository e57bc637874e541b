//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The external recorder binary is not installed. The only fatal error
    /// the polling loop can surface: no amount of retrying installs it.
    #[error("recorder binary not found: {0}")]
    RecorderMissing(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("api error: {0}")]
    Api(#[from] soop_api::ApiError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::RecorderMissing(_))
    }
}
